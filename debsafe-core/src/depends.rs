use debsafe_version::{Op, Relation};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub architecture: Option<String>,
    pub relation: Option<Relation>,
}

impl Constraint {
    pub fn any(name: &str) -> Self {
        Constraint {
            name: name.to_string(),
            architecture: None,
            relation: None,
        }
    }

    pub fn allows_version(&self, version: &str) -> bool {
        match &self.relation {
            Some(relation) => relation.matches_str(version),
            None => true,
        }
    }

    pub fn allows_architecture(&self, architecture: &str) -> bool {
        match &self.architecture {
            Some(wanted) => architecture == wanted || architecture == "all",
            None => true,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(arch) = &self.architecture {
            write!(f, ":{arch}")?;
        }
        if let Some(relation) = &self.relation {
            write!(f, " ({relation})")?;
        }
        Ok(())
    }
}

/// Parses a `Depends`/`Pre-Depends` value.
///
/// Only the first `|` alternative of each group is kept. Malformed groups are
/// dropped with a warning.
pub fn parse_depends(raw: &str) -> Vec<Constraint> {
    raw.split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .filter_map(|group| {
            let first = group.split('|').next().unwrap_or(group).trim();
            match parse_constraint(first) {
                Some(constraint) => Some(constraint),
                None => {
                    warn!("dropping malformed dependency '{group}'");
                    None
                }
            }
        })
        .collect()
}

pub fn parse_constraint(text: &str) -> Option<Constraint> {
    let (head, tail) = match text.find('(') {
        Some(open) => (&text[..open], Some(&text[open + 1..])),
        None => (text, None),
    };

    let head = head.trim();
    let (name, architecture) = match head.split_once(':') {
        Some((name, arch)) => (name.trim(), Some(arch.trim())),
        None => (head, None),
    };

    if !is_valid_name(name) {
        return None;
    }

    let architecture = match architecture {
        Some("") => return None,
        Some("any") | Some("native") | None => None,
        Some(arch) => Some(arch.to_string()),
    };

    let relation = match tail {
        Some(tail) => Some(parse_relation(tail)?),
        None => None,
    };

    Some(Constraint {
        name: name.to_string(),
        architecture,
        relation,
    })
}

fn parse_relation(tail: &str) -> Option<Relation> {
    let inner = tail.trim().strip_suffix(')')?.trim();
    let split = inner
        .find(|c: char| !matches!(c, '<' | '>' | '='))
        .unwrap_or(inner.len());
    let (op, version) = inner.split_at(split);

    let op = Op::parse(op)?;
    let version = version.trim();

    if version.is_empty() {
        return None;
    }

    Relation::new(op, version).ok()
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
