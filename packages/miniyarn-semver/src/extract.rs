use crate::{version::VersionRc, Version, MAX_SAFE_COMPONENT_LENGTH};

pub type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// A version where trailing components may be missing or wildcards, as found
/// in ranges (`1`, `1.2`, `1.x`, `*`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u32>,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
    pub rc: Option<Vec<VersionRc>>,
}

impl PartialVersion {
    pub fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    pub fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            rc: self.rc.clone(),
        }
    }
}

pub fn extract_number(str: &mut Chars) -> Option<u32> {
    let mut num: u64 = 0;
    let mut digits = 0usize;

    while let Some(&c) = str.peek() {
        if !c.is_ascii_digit() {
            break;
        }

        digits += 1;
        if digits > MAX_SAFE_COMPONENT_LENGTH {
            return None;
        }

        num = num.checked_mul(10)?.checked_add(c.to_digit(10)? as u64)?;
        str.next();
    }

    match digits {
        0 => None,
        _ => u32::try_from(num).ok(),
    }
}

fn extract_identifier(str: &mut Chars) -> Option<String> {
    let mut res = String::new();

    while let Some(&c) = str.peek() {
        if c.is_ascii_alphanumeric() || c == '-' {
            res.push(c);
            str.next();
        } else {
            break;
        }
    }

    match res.is_empty() {
        true => None,
        false => Some(res),
    }
}

fn extract_rc_segment(str: &mut Chars) -> Option<VersionRc> {
    let segment
        = extract_identifier(str)?;

    match segment.chars().all(|c| c.is_ascii_digit()) {
        true => segment.parse().ok().map(VersionRc::Number),
        false => Some(VersionRc::String(segment)),
    }
}

fn extract_rc(str: &mut Chars) -> Option<Vec<VersionRc>> {
    let mut segments
        = vec![extract_rc_segment(str)?];

    while str.peek() == Some(&'.') {
        str.next();
        segments.push(extract_rc_segment(str)?);
    }

    Some(segments)
}

fn skip_build(str: &mut Chars) -> Option<()> {
    if str.peek() == Some(&'+') {
        str.next();
        extract_rc(str)?;
    }

    Some(())
}

pub fn extract_version(str: &mut Chars) -> Option<Version> {
    let major = extract_number(str)?;

    if str.next() != Some('.') {
        return None;
    }

    let minor = extract_number(str)?;

    if str.next() != Some('.') {
        return None;
    }

    let patch = extract_number(str)?;

    let rc = match str.peek() {
        Some('-') => {
            str.next();
            Some(extract_rc(str)?)
        },

        _ => None,
    };

    skip_build(str)?;

    Some(Version {major, minor, patch, rc})
}

fn extract_partial_component(str: &mut Chars) -> Option<Option<u32>> {
    match str.peek() {
        Some('x' | 'X' | '*') => {
            str.next();
            Some(None)
        },

        _ => extract_number(str).map(Some),
    }
}

pub fn extract_partial_version(str: &mut Chars) -> Option<PartialVersion> {
    if matches!(str.peek(), Some('v' | 'V')) {
        str.next();
    }

    let mut partial = PartialVersion {
        major: extract_partial_component(str)?,
        ..PartialVersion::default()
    };

    if partial.major.is_none() || str.peek() != Some(&'.') {
        return Some(partial);
    }

    str.next();
    partial.minor = extract_partial_component(str)?;

    if partial.minor.is_none() || str.peek() != Some(&'.') {
        return Some(partial);
    }

    str.next();
    partial.patch = extract_partial_component(str)?;

    if partial.patch.is_some() && str.peek() == Some(&'-') {
        str.next();
        partial.rc = Some(extract_rc(str)?);
    }

    skip_build(str)?;

    Some(partial)
}
