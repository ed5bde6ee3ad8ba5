pub mod types;

pub use types::{
    InstallPlan, ProtectedSkip, SatisfiedDependency, Unresolved, UnresolvedReason,
};

use crate::depends::{Constraint, parse_depends};
use crate::index::{Catalog, PackageRecord};
use crate::installed::InstalledSnapshot;
use crate::protected::ProtectedSet;
use crate::{DebsafeError, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const TRANSITION_SUFFIX: &str = "t64";

enum Selection<'c> {
    Found(&'c PackageRecord),
    Missing,
    NoMatch(Vec<String>),
}

struct Frame<'c> {
    record: &'c PackageRecord,
    constraints: Vec<Constraint>,
    next: usize,
}

impl<'c> Frame<'c> {
    fn new(record: &'c PackageRecord) -> Self {
        // Pre-Depends must be unpacked first, so they are walked first.
        let mut constraints = parse_depends(&record.pre_depends);
        constraints.extend(parse_depends(&record.depends));

        Frame {
            record,
            constraints,
            next: 0,
        }
    }
}

#[derive(Default)]
struct Walk<'c> {
    // Entered packages, both on the stack and already placed.
    visited: HashMap<&'c str, &'c PackageRecord>,
    // Transition key -> name that claimed it.
    families: HashMap<String, &'c str>,
    entries: Vec<PackageRecord>,
    unresolved: Vec<Unresolved>,
    protected_skipped: Vec<ProtectedSkip>,
    protected_seen: BTreeSet<String>,
    already_satisfied: Vec<SatisfiedDependency>,
    satisfied_seen: BTreeSet<String>,
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    protected: &'a ProtectedSet,
    architecture: String,
    installed: Option<&'a InstalledSnapshot>,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, protected: &'a ProtectedSet, architecture: &str) -> Self {
        Resolver {
            catalog,
            protected,
            architecture: architecture.to_string(),
            installed: None,
        }
    }

    pub fn with_installed(mut self, installed: &'a InstalledSnapshot) -> Self {
        self.installed = Some(installed);
        self
    }

    /// Builds the install plan for `root`.
    ///
    /// The walk is depth-first over an explicit stack; a package is appended
    /// once all of its dependencies are, and is never visited twice.
    pub fn resolve(&self, root: &str) -> Result<InstallPlan> {
        if self.protected.contains(root) {
            return Err(DebsafeError::ProtectedPackage {
                name: root.to_string(),
            });
        }

        let root_record = match self.select(&Constraint::any(root))? {
            Selection::Found(record) => record,
            Selection::Missing | Selection::NoMatch(_) => {
                return Err(DebsafeError::PackageNotFound {
                    name: root.to_string(),
                });
            }
        };

        if self.protected.protects(root_record) {
            return Err(DebsafeError::ProtectedPackage {
                name: root.to_string(),
            });
        }

        let mut walk = Walk::default();
        self.enter(&mut walk, root_record)?;
        let mut stack = vec![Frame::new(root_record)];

        while let Some(frame) = stack.last_mut() {
            let Some(constraint) = frame.constraints.get(frame.next).cloned() else {
                let record = frame.record;
                stack.pop();
                debug!("planned {record}");
                walk.entries.push(record.clone());
                continue;
            };

            frame.next += 1;
            let current = frame.record;
            let dependent = current.name.as_str();

            if let Some(record) = self.visit(&mut walk, dependent, &constraint)? {
                self.enter(&mut walk, record)?;
                stack.push(Frame::new(record));
            }
        }

        Ok(InstallPlan::new(
            walk.entries,
            walk.unresolved,
            walk.protected_skipped,
            walk.already_satisfied,
        ))
    }

    /// Decides what to do with one dependency edge. Returns the record to
    /// walk into, if any.
    fn visit(
        &self,
        walk: &mut Walk<'a>,
        dependent: &str,
        constraint: &Constraint,
    ) -> Result<Option<&'a PackageRecord>> {
        let name = constraint.name.as_str();

        if self.protected.contains(name) {
            self.skip_protected(walk, dependent, name);
            return Ok(None);
        }

        if let Some(&planned) = walk.visited.get(name) {
            if !constraint.allows_architecture(&planned.architecture) {
                return Err(DebsafeError::TransitionConflict {
                    first: format!("{}:{}", planned.name, planned.architecture),
                    second: constraint.to_string(),
                });
            }

            if !constraint.allows_version(&planned.version) {
                walk.unresolved.push(Unresolved {
                    dependent: dependent.to_string(),
                    constraint: constraint.clone(),
                    reason: UnresolvedReason::PlannedVersionMismatch {
                        planned: planned.to_string(),
                    },
                });
            }

            return Ok(None);
        }

        if let Some(installed) = self
            .installed
            .and_then(|snapshot| snapshot.satisfies(constraint))
        {
            if walk.satisfied_seen.insert(name.to_string()) {
                walk.already_satisfied.push(SatisfiedDependency {
                    name: name.to_string(),
                    installed_version: installed.version.clone(),
                });
            }
            return Ok(None);
        }

        match self.select(constraint)? {
            Selection::Found(record) if self.protected.protects(record) => {
                self.skip_protected(walk, dependent, name);
                Ok(None)
            }
            Selection::Found(record) => Ok(Some(record)),
            Selection::Missing => {
                walk.unresolved.push(Unresolved {
                    dependent: dependent.to_string(),
                    constraint: constraint.clone(),
                    reason: UnresolvedReason::Missing,
                });
                Ok(None)
            }
            Selection::NoMatch(available) => {
                walk.unresolved.push(Unresolved {
                    dependent: dependent.to_string(),
                    constraint: constraint.clone(),
                    reason: UnresolvedReason::NoMatchingVersion { available },
                });
                Ok(None)
            }
        }
    }

    fn skip_protected(&self, walk: &mut Walk<'a>, dependent: &str, name: &str) {
        if walk.protected_seen.insert(name.to_string()) {
            walk.protected_skipped.push(ProtectedSkip {
                dependent: dependent.to_string(),
                name: name.to_string(),
            });
        }
    }

    /// Marks `record` as part of the plan, rejecting a second variant of the
    /// same library.
    fn enter(&self, walk: &mut Walk<'a>, record: &'a PackageRecord) -> Result<()> {
        let key = transition_key(&record.name);

        if let Some(&existing) = walk.families.get(key)
            && existing != record.name
        {
            return Err(DebsafeError::TransitionConflict {
                first: existing.to_string(),
                second: record.name.clone(),
            });
        }

        if let Some(installed) = self.installed {
            for sibling in transition_siblings(&record.name) {
                if installed.contains(&sibling) {
                    return Err(DebsafeError::TransitionConflict {
                        first: format!("{sibling} (installed)"),
                        second: record.name.clone(),
                    });
                }
            }
        }

        walk.families.insert(key.to_string(), record.name.as_str());
        walk.visited.insert(record.name.as_str(), record);

        Ok(())
    }

    /// Picks the best candidate for `constraint`: target architecture first,
    /// then `all`, highest version within that architecture.
    fn select(&self, constraint: &Constraint) -> Result<Selection<'a>> {
        let variants = self.catalog.get(&constraint.name);

        if variants.is_empty() {
            return Ok(Selection::Missing);
        }

        let satisfying: Vec<&PackageRecord> = variants
            .iter()
            .filter(|record| {
                constraint.allows_version(&record.version)
                    && constraint.allows_architecture(&record.architecture)
            })
            .collect();

        if satisfying.is_empty() {
            let available: BTreeSet<String> =
                variants.iter().map(|record| record.version.clone()).collect();
            return Ok(Selection::NoMatch(available.into_iter().collect()));
        }

        let target = constraint
            .architecture
            .as_deref()
            .unwrap_or(&self.architecture);

        for arch in [target, "all"] {
            if let Some(best) = satisfying
                .iter()
                .copied()
                .filter(|record| record.architecture == arch)
                .max_by(|a, b| a.compare_version(b))
            {
                return Ok(Selection::Found(best));
            }
        }

        let architectures: BTreeSet<&str> = satisfying
            .iter()
            .map(|record| record.architecture.as_str())
            .collect();

        Err(DebsafeError::AmbiguousArchitecture {
            name: constraint.name.clone(),
            architectures: architectures.into_iter().collect::<Vec<_>>().join(", "),
        })
    }
}

/// Name shared by a library and its 64-bit `time_t` transitioned variant.
/// The transition either appended `t64` (`libssl3` to `libssl3t64`) or
/// replaced an ABI `a` suffix (`libqt5core5a` to `libqt5core5t64`).
pub fn transition_key(name: &str) -> &str {
    match name.strip_suffix(TRANSITION_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem,
        _ => abi_stem(name).unwrap_or(name),
    }
}

/// Names the other side of the transition may carry.
pub fn transition_siblings(name: &str) -> Vec<String> {
    match name.strip_suffix(TRANSITION_SUFFIX) {
        Some(stem) if !stem.is_empty() => {
            let mut siblings = vec![stem.to_string()];
            if stem.ends_with(|c: char| c.is_ascii_digit()) {
                siblings.push(format!("{stem}a"));
            }
            siblings
        }
        _ => {
            let mut siblings = vec![format!("{name}{TRANSITION_SUFFIX}")];
            if let Some(stem) = abi_stem(name) {
                siblings.push(format!("{stem}{TRANSITION_SUFFIX}"));
            }
            siblings
        }
    }
}

// `libqt5core5a` -> `libqt5core5`
fn abi_stem(name: &str) -> Option<&str> {
    name.strip_suffix('a')
        .filter(|stem| stem.starts_with("lib") && stem.ends_with(|c: char| c.is_ascii_digit()))
}
