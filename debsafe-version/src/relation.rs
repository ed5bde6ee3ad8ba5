use std::cmp::Ordering;
use std::fmt;

use crate::{Error, Version};

/// Relation operators allowed in `Depends` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Op {
    /// Parses an operator token. The obsolete `<` and `>` forms mean `<=` and `>=`.
    pub fn parse(token: &str) -> Option<Op> {
        match token {
            "=" => Some(Op::Eq),
            ">=" | ">" => Some(Op::Ge),
            "<=" | "<" => Some(Op::Le),
            ">>" => Some(Op::Gt),
            "<<" => Some(Op::Lt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">>",
            Op::Lt => "<<",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ge => ordering != Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Lt => ordering == Ordering::Less,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub op: Op,
    pub version: Version,
}

impl Relation {
    pub fn new(op: Op, version: &str) -> Result<Self, Error> {
        Ok(Relation {
            op,
            version: Version::parse(version)?,
        })
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        self.op.accepts(candidate.cmp(&self.version))
    }

    /// Same as [`Relation::matches`] for a raw version string. Unparseable
    /// candidates never match.
    pub fn matches_str(&self, candidate: &str) -> bool {
        match Version::parse(candidate) {
            Ok(version) => self.matches(&version),
            Err(_) => false,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(op: &str, version: &str) -> Relation {
        Relation::new(Op::parse(op).unwrap(), version).unwrap()
    }

    #[test]
    fn strict_and_inclusive_bounds() {
        let v = Version::parse("2.0-1").unwrap();

        assert!(rel(">=", "2.0").matches(&v));
        assert!(rel(">>", "2.0").matches(&v));
        assert!(!rel("<<", "2.0-1").matches(&v));
        assert!(rel("<=", "2.0-1").matches(&v));
        assert!(rel("=", "0:2.0-1").matches(&v));
        assert!(!rel("=", "2.0").matches(&v));
    }

    #[test]
    fn legacy_single_char_operators() {
        assert_eq!(Op::parse("<"), Some(Op::Le));
        assert_eq!(Op::parse(">"), Some(Op::Ge));
        assert_eq!(Op::parse("=>"), None);
    }

    #[test]
    fn unparseable_candidate_never_matches() {
        assert!(!rel(">=", "1.0").matches_str("not a version"));
        assert!(rel(">=", "1.0").matches_str("1.0+b2"));
    }
}
