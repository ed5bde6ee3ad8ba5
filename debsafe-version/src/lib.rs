//! Debian package version ordering.
//!
//! Versions have the shape `[epoch:]upstream[-revision]`. Comparison follows
//! dpkg: the epoch is compared numerically, then upstream and revision are
//! compared with alternating non-digit and digit runs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

mod relation;

pub use relation::{Op, Relation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({input})")]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    epoch: u64,
    upstream: String,
    revision: String,
}

impl Version {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let s = original.trim();

        if s.is_empty() {
            return Err(Error::new(original, "empty version string"));
        }

        if s.chars().any(char::is_whitespace) {
            return Err(Error::new(original, "version contains whitespace"));
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((epoch, rest)) => {
                let parsed = epoch
                    .parse::<u64>()
                    .map_err(|_| Error::new(original, "epoch is not a number"))?;
                (parsed, rest)
            }
            None => (0, s),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        if upstream.is_empty() {
            return Err(Error::new(original, "empty upstream version"));
        }

        Ok(Version {
            original: s.to_string(),
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_fragment(&self.upstream, &other.upstream))
            .then_with(|| compare_fragment(&self.revision, &other.revision))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compares two version strings.
///
/// Unparseable versions sort before every parseable one and compare to each
/// other by their raw text, so the ordering stays total.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

// `~` sorts before the end of the string, which sorts before letters, which
// sort before every other character.
fn weight(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn compare_fragment(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let left = weight(a.get(i).copied());
            let right = weight(b.get(j).copied());

            if left != right {
                return left.cmp(&right);
            }

            i += 1;
            j += 1;
        }

        while i < a.len() && a[i] == b'0' {
            i += 1;
        }
        while j < b.len() && b[j] == b'0' {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;

        while i < a.len() && j < b.len() && a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if i < a.len() && a[i].is_ascii_digit() {
            return Ordering::Greater;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_dominates() {
        assert_eq!(compare("1:2.0-1", "2.0-1"), Ordering::Greater);
        assert_eq!(compare("1:0.1", "9.9"), Ordering::Greater);
    }

    #[test]
    fn tilde_sorts_before_release() {
        assert_eq!(compare("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(compare("1.0~rc1", "1.0~rc2"), Ordering::Less);
    }

    #[test]
    fn numeric_runs_compare_numerically() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.010", "1.10"), Ordering::Equal);
        assert_eq!(compare("2.0-10", "2.0-9"), Ordering::Greater);
    }

    #[test]
    fn letters_sort_before_punctuation() {
        assert_eq!(compare("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(compare("1.0", "1.0a"), Ordering::Less);
        assert_eq!(compare("1.0+dfsg", "1.0"), Ordering::Greater);
    }

    #[test]
    fn missing_epoch_is_zero() {
        assert_eq!(compare("0:1.2-3", "1.2-3"), Ordering::Equal);
        let parsed = Version::parse("3:4.5.6-7ubuntu1").unwrap();
        assert_eq!(parsed.epoch(), 3);
        assert_eq!(parsed.upstream(), "4.5.6");
        assert_eq!(parsed.revision(), "7ubuntu1");
    }

    #[test]
    fn revision_splits_on_last_hyphen() {
        let parsed = Version::parse("1.2-beta-4").unwrap();
        assert_eq!(parsed.upstream(), "1.2-beta");
        assert_eq!(parsed.revision(), "4");
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("x:1.0").is_err());
        assert!(Version::parse(":1.0").is_err());
        assert!(Version::parse("1.0 2").is_err());
    }

    #[test]
    fn ordering_is_total_over_a_sorted_sample() {
        let sample = [
            "1.0~alpha",
            "1.0~rc1",
            "1.0",
            "1.0-1",
            "1.0-1ubuntu1",
            "1.0+b1",
            "1.0.1",
            "1.2",
            "1.10",
            "1:0.5",
        ];

        for (i, a) in sample.iter().enumerate() {
            for (j, b) in sample.iter().enumerate() {
                assert_eq!(compare(a, b), i.cmp(&j), "{a} vs {b}");
            }
        }
    }
}
