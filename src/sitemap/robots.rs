use std::sync::OnceLock;

use regex::Regex;

fn sitemap_directive() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*sitemap\s*:\s*(\S+)").ok())
        .as_ref()
}

/// Collects the `Sitemap:` locations declared in a robots.txt body, in the
/// order they are listed.
pub fn sitemap_locations(robots_txt: &str) -> Vec<String> {
    let Some(directive) = sitemap_directive() else {
        return Vec::new();
    };

    robots_txt
        .lines()
        .filter_map(|line| directive.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
