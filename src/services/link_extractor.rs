//! Pattern-based link extraction from message bodies.

use regex::{Regex, RegexBuilder};

use crate::config::DEFAULT_LINK_PATTERN;
use crate::domain::{Link, LinkCollection};

/// Finds candidate unsubscribe links in a body of text.
///
/// Matching is case-insensitive and unanchored. Every non-overlapping match is
/// returned in the order it appears, with its original casing. No URL
/// validation happens here; whatever the pattern matches is a link.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    /// Compiles `pattern` as a case-insensitive regular expression.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns every match in `body`, left to right.
    pub fn extract(&self, body: &str) -> Vec<Link> {
        self.pattern
            .find_iter(body)
            .map(|m| Link::from(m.as_str()))
            .collect()
    }

    /// Appends every match in `body` to `links`.
    pub fn extract_into(&self, body: &str, links: &mut LinkCollection) {
        links.extend(self.pattern.find_iter(body).map(|m| Link::from(m.as_str())));
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self {
            pattern: RegexBuilder::new(DEFAULT_LINK_PATTERN)
                .case_insensitive(true)
                .build()
                .expect("default link pattern compiles"),
        }
    }
}
