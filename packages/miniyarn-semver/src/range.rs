use miniyarn_utils::{impl_serialization_traits, DataType, FromFileString, ToFileString, ToHumanString};

use crate::{extract::{extract_partial_version, PartialVersion}, Error, Version};

#[cfg(test)]
#[path = "./range.test.rs"]
mod range_tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub operator: Operator,
    pub version: Version,
}

impl Comparator {
    fn new(operator: Operator, version: Version) -> Comparator {
        Comparator {operator, version}
    }

    pub fn check(&self, version: &Version) -> bool {
        match self.operator {
            Operator::Eq => version == &self.version,
            Operator::Gt => version > &self.version,
            Operator::Gte => version >= &self.version,
            Operator::Lt => version < &self.version,
            Operator::Lte => version <= &self.version,
        }
    }
}

/// A union of comparator sets (`a b || c`). A version matches when every
/// comparator of at least one set accepts it.
#[derive(Clone, Debug)]
pub struct Range {
    source: String,
    sets: Vec<Vec<Comparator>>,
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Range {}

impl std::hash::Hash for Range {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

fn nothing() -> Vec<Comparator> {
    vec![Comparator::new(Operator::Lt, Version::new_from_components(0, 0, 0, Some(vec![crate::VersionRc::Number(0)])))]
}

fn anything() -> Vec<Comparator> {
    vec![Comparator::new(Operator::Gte, Version::new())]
}

fn between(low: Version, high: Version) -> Vec<Comparator> {
    vec![Comparator::new(Operator::Gte, low), Comparator::new(Operator::Lt, high)]
}

/// Upper bound (exclusive) of the versions a partial version stands for
/// (`1.2` means anything below `1.3.0`).
fn partial_ceiling(partial: &PartialVersion) -> Option<Version> {
    match (partial.major, partial.minor, partial.patch) {
        (None, _, _) => None,
        (Some(major), None, _) => Some(Version::new_from_components(major + 1, 0, 0, None)),
        (Some(major), Some(minor), None) => Some(Version::new_from_components(major, minor + 1, 0, None)),
        (Some(_), Some(_), Some(_)) => None,
    }
}

fn desugar_caret(partial: &PartialVersion) -> Vec<Comparator> {
    let floor = partial.floor();

    let ceiling = match (partial.major, partial.minor, partial.patch) {
        (None, _, _) => return anything(),
        (Some(0), None, _) => Version::new_from_components(1, 0, 0, None),
        (Some(0), Some(0), None) => Version::new_from_components(0, 1, 0, None),
        (Some(0), Some(0), Some(patch)) => Version::new_from_components(0, 0, patch + 1, None),
        (Some(0), Some(minor), _) => Version::new_from_components(0, minor + 1, 0, None),
        (Some(major), _, _) => Version::new_from_components(major + 1, 0, 0, None),
    };

    between(floor, ceiling)
}

fn desugar_tilde(partial: &PartialVersion) -> Vec<Comparator> {
    let floor = partial.floor();

    let ceiling = match (partial.major, partial.minor) {
        (None, _) => return anything(),
        (Some(major), None) => Version::new_from_components(major + 1, 0, 0, None),
        (Some(major), Some(minor)) => Version::new_from_components(major, minor + 1, 0, None),
    };

    between(floor, ceiling)
}

fn desugar_primitive(operator: &str, partial: &PartialVersion) -> Vec<Comparator> {
    match operator {
        "" | "=" => match (partial.is_full(), partial_ceiling(partial)) {
            (true, _) => vec![Comparator::new(Operator::Eq, partial.floor())],
            (false, Some(ceiling)) => between(partial.floor(), ceiling),
            (false, None) => anything(),
        },

        ">" => match (partial.is_full(), partial_ceiling(partial)) {
            (true, _) => vec![Comparator::new(Operator::Gt, partial.floor())],
            (false, Some(ceiling)) => vec![Comparator::new(Operator::Gte, ceiling)],
            (false, None) => nothing(),
        },

        ">=" => match partial.major {
            Some(_) => vec![Comparator::new(Operator::Gte, partial.floor())],
            None => anything(),
        },

        "<" => match partial.major {
            Some(_) => vec![Comparator::new(Operator::Lt, partial.floor())],
            None => nothing(),
        },

        "<=" => match (partial.is_full(), partial_ceiling(partial)) {
            (true, _) => vec![Comparator::new(Operator::Lte, partial.floor())],
            (false, Some(ceiling)) => vec![Comparator::new(Operator::Lt, ceiling)],
            (false, None) => anything(),
        },

        "^" => desugar_caret(partial),
        "~" | "~>" => desugar_tilde(partial),

        _ => nothing(),
    }
}

fn parse_partial(source: &str, token: &str) -> Result<PartialVersion, Error> {
    let mut iter = token.chars().peekable();

    let partial = extract_partial_version(&mut iter)
        .ok_or_else(|| Error::InvalidRange(source.to_string()))?;

    if iter.peek().is_some() {
        return Err(Error::InvalidRange(source.to_string()));
    }

    Ok(partial)
}

fn split_operator(token: &str) -> (&str, &str) {
    for operator in [">=", "<=", "~>", ">", "<", "=", "^", "~"] {
        if let Some(rest) = token.strip_prefix(operator) {
            return (operator, rest);
        }
    }

    ("", token)
}

fn parse_hyphen(source: &str, set: &str) -> Result<Option<Vec<Comparator>>, Error> {
    let Some((low, high)) = set.split_once(" - ") else {
        return Ok(None);
    };

    let low = parse_partial(source, low.trim())?;
    let high = parse_partial(source, high.trim())?;

    let mut comparators
        = vec![Comparator::new(Operator::Gte, low.floor())];

    match (high.is_full(), partial_ceiling(&high)) {
        (true, _) => comparators.push(Comparator::new(Operator::Lte, high.floor())),
        (false, Some(ceiling)) => comparators.push(Comparator::new(Operator::Lt, ceiling)),
        (false, None) => {},
    }

    Ok(Some(comparators))
}

fn parse_set(source: &str, set: &str) -> Result<Vec<Comparator>, Error> {
    let set = set.trim();

    if let Some(comparators) = parse_hyphen(source, set)? {
        return Ok(comparators);
    }

    let mut tokens: Vec<String>
        = Vec::new();

    // Operators may be separated from their version by whitespace (`>= 1.2.3`)
    let mut pending_operator
        = None;

    for word in set.split_whitespace() {
        match split_operator(word) {
            (operator, "") if !operator.is_empty() => {
                pending_operator = Some(operator);
            },

            _ => {
                tokens.push(format!("{}{}", pending_operator.take().unwrap_or(""), word));
            },
        }
    }

    if pending_operator.is_some() {
        return Err(Error::InvalidRange(source.to_string()));
    }

    if tokens.is_empty() {
        return Ok(anything());
    }

    let mut comparators
        = Vec::new();

    for token in tokens {
        let (operator, version) = split_operator(&token);
        let partial = parse_partial(source, version)?;

        comparators.extend(desugar_primitive(operator, &partial));
    }

    Ok(comparators)
}

impl Range {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn comparator_sets(&self) -> &[Vec<Comparator>] {
        &self.sets
    }

    /// Returns the version when the range can only ever match a single one.
    pub fn exact_version(&self) -> Option<Version> {
        match self.sets.as_slice() {
            [set] => match set.as_slice() {
                [Comparator {operator: Operator::Eq, version}] => Some(version.clone()),
                _ => None,
            },

            _ => None,
        }
    }

    pub fn check(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| {
            let matches_all
                = set.iter().all(|comparator| comparator.check(version));

            // Prereleases only match when a comparator opts into the same release line
            let prerelease_allowed = !version.is_prerelease() || set.iter().any(|comparator| {
                comparator.version.is_prerelease() && comparator.version.same_release(version)
            });

            matches_all && prerelease_allowed
        })
    }

    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter()
            .filter(|version| self.check(version))
            .max()
    }
}

impl FromFileString for Range {
    type Error = Error;

    fn from_file_string(src: &str) -> Result<Self, Error> {
        let sets = src.split("||")
            .map(|set| parse_set(src, set))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Range {source: src.to_string(), sets})
    }
}

impl ToFileString for Range {
    fn to_file_string(&self) -> String {
        self.source.clone()
    }
}

impl ToHumanString for Range {
    fn to_print_string(&self) -> String {
        DataType::Reference.colorize(&self.to_file_string())
    }
}

impl_serialization_traits!(Range);
