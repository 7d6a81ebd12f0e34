use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

const DELIMITER: char = ',';

/// A set of absolute page URLs taken from one or more sitemaps.
///
/// Entries that are empty or not absolute http(s) URLs never make it in.
/// The comma-joined form only exists at the storage boundary, see
/// [`UrlCollection::encode`] and [`UrlCollection::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlCollection(BTreeSet<String>);

impl UrlCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a location after trimming it. Returns false when the entry
    /// was rejected or already present.
    pub fn insert(&mut self, location: &str) -> bool {
        let location = location.trim();
        if !is_absolute_http(location) {
            return false;
        }
        self.0.insert(location.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, url) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            out.push_str(url);
        }
        out
    }

    pub fn decode(stored: &str) -> Self {
        stored.split(DELIMITER).collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for UrlCollection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl<S: AsRef<str>> Extend<S> for UrlCollection {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for location in iter {
            self.insert(location.as_ref());
        }
    }
}

impl<'a> IntoIterator for &'a UrlCollection {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn is_absolute_http(location: &str) -> bool {
    if location.is_empty() {
        return false;
    }
    match Url::parse(location) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
