use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::SitemapError;

/// What a fetched sitemap body turned out to be.
///
/// Every variant holds a sequence, so a document with a single `<url>` or
/// `<sitemap>` entry looks exactly like one with many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// One URL per line.
    PlainText(Vec<String>),
    /// `<urlset>`: page locations.
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: locations of further sitemaps.
    Index(Vec<String>),
    /// Well-formed XML with some other root.
    Unrecognized,
}

impl SitemapDocument {
    pub fn parse(url: &str, body: &str) -> Result<Self, SitemapError> {
        let text = body.trim_start_matches('\u{feff}').trim();
        if !text.starts_with('<') {
            return Ok(Self::PlainText(plain_text_locations(text)));
        }
        parse_xml(text).map_err(|reason| SitemapError::Parse {
            url: url.to_string(),
            reason,
        })
    }

    pub fn location_count(&self) -> usize {
        match self {
            Self::PlainText(locs) | Self::UrlSet(locs) | Self::Index(locs) => locs.len(),
            Self::Unrecognized => 0,
        }
    }
}

fn plain_text_locations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http"))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    UrlSet,
    Index,
    Other,
}

impl Root {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"urlset" => Self::UrlSet,
            b"sitemapindex" => Self::Index,
            _ => Self::Other,
        }
    }

    fn entry_name(self) -> Option<&'static [u8]> {
        match self {
            Self::UrlSet => Some(b"url"),
            Self::Index => Some(b"sitemap"),
            Self::Other => None,
        }
    }
}

// Elements are matched by local name so prefixed namespaces
// (`<sm:urlset>`) read the same as the default one.
fn parse_xml(text: &str) -> Result<SitemapDocument, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut root: Option<Root> = None;
    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match depth {
                    1 => root = Some(Root::from_name(name.as_ref())),
                    2 => {
                        in_entry = root
                            .and_then(Root::entry_name)
                            .is_some_and(|entry| entry == name.as_ref());
                    }
                    3 if in_entry && name.as_ref() == b"loc" => {
                        in_loc = true;
                        current.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    root = Some(Root::from_name(e.local_name().as_ref()));
                }
            }
            Ok(Event::End(_)) => {
                match depth {
                    3 if in_loc => {
                        in_loc = false;
                        locs.push(current.trim().to_string());
                    }
                    2 => in_entry = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) if in_loc => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => {
                if depth != 0 {
                    return Err("unexpected end of document".to_string());
                }
                break;
            }
            Err(e) => {
                return Err(format!("{} at byte {}", e, reader.error_position()));
            }
            _ => {}
        }
    }

    Ok(match root {
        Some(Root::UrlSet) => SitemapDocument::UrlSet(locs),
        Some(Root::Index) => SitemapDocument::Index(locs),
        Some(Root::Other) | None => SitemapDocument::Unrecognized,
    })
}
