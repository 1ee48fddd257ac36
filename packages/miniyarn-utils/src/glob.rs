use thiserror::Error;

use crate::{impl_serialization_traits, FromFileString, ToFileString, ToHumanString};

#[derive(Error, Clone, Debug)]
#[error("Invalid glob pattern {pattern}: {message}")]
pub struct GlobError {
    pub pattern: String,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct Glob {
    raw: String,
    matcher: globset::GlobMatcher,
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Glob {}

impl Glob {
    pub fn parse(raw: impl Into<String>) -> Result<Self, GlobError> {
        let raw = raw.into();

        let matcher = globset::GlobBuilder::new(&raw)
            .literal_separator(true)
            .build()
            .map_err(|err| GlobError {pattern: raw.clone(), message: err.kind().to_string()})?
            .compile_matcher();

        Ok(Glob {raw, matcher})
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }

    /// Patterns without a slash are matched against the last segment of the
    /// candidate, mirroring how `.gitignore`-style lists behave.
    pub fn is_match_base(&self, candidate: &str) -> bool {
        if self.raw.contains('/') {
            return self.is_match(candidate.trim_start_matches('/'));
        }

        let basename = candidate
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(candidate);

        self.is_match(basename)
    }
}

impl FromFileString for Glob {
    type Error = GlobError;

    fn from_file_string(raw: &str) -> Result<Self, Self::Error> {
        Glob::parse(raw)
    }
}

impl ToFileString for Glob {
    fn to_file_string(&self) -> String {
        self.raw.clone()
    }
}

impl ToHumanString for Glob {
    fn to_print_string(&self) -> String {
        self.to_file_string()
    }
}

impl_serialization_traits!(Glob);

/// An ordered list of patterns where a `!` prefix negates. The last pattern
/// matching a candidate decides; a list whose patterns are all negations
/// accepts anything they don't exclude.
#[derive(Clone, Debug, Default)]
pub struct GlobList {
    entries: Vec<(bool, Glob)>,
}

impl GlobList {
    pub fn parse<I, S>(patterns: I) -> Result<Self, GlobError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries
            = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();

            match pattern.strip_prefix('!') {
                Some(negated) => entries.push((false, Glob::parse(negated)?)),
                None => entries.push((true, Glob::parse(pattern)?)),
            }
        }

        Ok(GlobList {entries})
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        let default
            = self.entries.iter().all(|(positive, _)| !positive);

        self.entries.iter()
            .rev()
            .find(|(_, glob)| glob.is_match_base(candidate))
            .map(|(positive, _)| *positive)
            .unwrap_or(default)
    }
}
