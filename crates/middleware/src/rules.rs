//! Deciding which `.pdf` requests get rendered.
//!
//! A [`Rule`] is either a literal path prefix or a regular expression, and the
//! two are kept apart: prefixes compare bytes from the start of
//! the path, patterns search anywhere in it. A [`Conditions`] set applies
//! rules as an allow-list ([`Only`](Conditions::Only)) or a deny-list
//! ([`Except`](Conditions::Except)).

use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use std::str::FromStr;

/// Requests must end with this (case-sensitive) to be considered at all.
pub const PDF_SUFFIX: &str = ".pdf";

/// Marks a pattern rule when rules are written as strings (configuration).
pub const PATTERN_PREFIX: &str = "regex:";

/// A single render condition, tested against the request path (`.pdf`
/// included). Strings parse into rules via [`FromStr`].
#[derive(Debug, Clone)]
pub enum Rule {
    /// Matches paths starting with this exact string.
    Prefix(String),
    /// Matches paths containing a match for this pattern. Anchor it yourself
    /// (`^/public`) if that is what you mean.
    Pattern(Regex),
}

impl Rule {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidRule(pattern.to_string()))?;
        Ok(Self::Pattern(regex))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Pattern(regex) => regex.is_match(path),
        }
    }
}

/// `regex:^/invoices/\d+` is a pattern; anything else is a prefix.
impl FromStr for Rule {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.strip_prefix(PATTERN_PREFIX) {
            Some(pattern) => Self::pattern(pattern),
            None => Ok(Self::prefix(s)),
        }
    }
}

impl From<Regex> for Rule {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}
impl From<&str> for Rule {
    fn from(prefix: &str) -> Self {
        Self::prefix(prefix)
    }
}
impl From<String> for Rule {
    fn from(prefix: String) -> Self {
        Self::Prefix(prefix)
    }
}

/// Which `.pdf` paths are rendered.
#[derive(Debug, Clone, Default)]
pub enum Conditions {
    /// Every `.pdf` path.
    #[default]
    Always,
    /// Only `.pdf` paths matching at least one rule.
    Only(Vec<Rule>),
    /// Every `.pdf` path matching none of the rules.
    Except(Vec<Rule>),
}

impl Conditions {
    /// Builds conditions from optional allow and deny lists. An empty list
    /// counts as "not configured", and `only` wins when both are given.
    pub fn from_lists(only: Vec<Rule>, except: Vec<Rule>) -> Self {
        match (only.is_empty(), except.is_empty()) {
            (false, _) => Self::Only(only),
            (true, false) => Self::Except(except),
            (true, true) => Self::Always,
        }
    }

    /// Parses string rules (see [`Rule::from_str`]) into conditions.
    pub fn parse<S: AsRef<str>>(only: &[S], except: &[S]) -> Result<Self> {
        let parse = |rules: &[S]| rules.iter().map(|r| r.as_ref().parse()).collect::<Result<Vec<Rule>>>();
        Ok(Self::from_lists(parse(only)?, parse(except)?))
    }

    /// Whether a request for `path` should be rendered as a PDF.
    pub fn should_render(&self, path: &str) -> bool {
        if !path.ends_with(PDF_SUFFIX) {
            return false;
        }
        match self {
            Self::Always => true,
            Self::Only(rules) => rules.iter().any(|rule| rule.matches(path)),
            Self::Except(rules) => !rules.iter().any(|rule| rule.matches(path)),
        }
    }
}
