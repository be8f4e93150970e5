//! Unsubscribe link types.
//!
//! A [`Link`] is whatever text the extraction pattern matched. It is not
//! validated as a URL; the HTTP layer reports malformed ones as errors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A candidate unsubscribe URL pulled out of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link(pub String);

impl Link {
    /// Returns the link text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the host portion, if the link parses as a URL.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.0)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Link {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Link {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Links gathered across a scan, in the order they were found.
///
/// Duplicates are kept; the same newsletter footer in ten messages yields
/// ten entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCollection {
    links: Vec<Link>,
}

impl LinkCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a link.
    pub fn push(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Appends links, preserving their order.
    pub fn extend(&mut self, links: impl IntoIterator<Item = Link>) {
        self.links.extend(links);
    }

    /// Number of links collected.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterates links in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }

    /// Returns the links as a slice.
    pub fn as_slice(&self) -> &[Link] {
        &self.links
    }

    /// Drops repeated links, keeping the first occurrence of each.
    pub fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        self.links.retain(|link| seen.insert(link.clone()));
    }
}

impl IntoIterator for LinkCollection {
    type Item = Link;
    type IntoIter = std::vec::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkCollection {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl FromIterator<Link> for LinkCollection {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}
