use crate::depends::Constraint;
use crate::index::PackageRecord;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnresolvedReason {
    Missing,
    NoMatchingVersion { available: Vec<String> },
    PlannedVersionMismatch { planned: String },
}

/// A requirement the walk could not satisfy. Reported as a warning, the
/// plan continues without it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unresolved {
    pub dependent: String,
    pub constraint: Constraint,
    pub reason: UnresolvedReason,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnresolvedReason::Missing => {
                write!(f, "{} needs {}: not in the index", self.dependent, self.constraint)
            }
            UnresolvedReason::NoMatchingVersion { available } => write!(
                f,
                "{} needs {}: only {} available",
                self.dependent,
                self.constraint,
                available.join(", ")
            ),
            UnresolvedReason::PlannedVersionMismatch { planned } => write!(
                f,
                "{} needs {}: {} is already planned",
                self.dependent, self.constraint, planned
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedSkip {
    pub dependent: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SatisfiedDependency {
    pub name: String,
    pub installed_version: String,
}

/// Packages to install, dependencies strictly before their dependents.
#[derive(Clone, Debug, Default)]
pub struct InstallPlan {
    entries: Vec<PackageRecord>,
    unresolved: Vec<Unresolved>,
    protected_skipped: Vec<ProtectedSkip>,
    already_satisfied: Vec<SatisfiedDependency>,
}

impl InstallPlan {
    pub(crate) fn new(
        entries: Vec<PackageRecord>,
        unresolved: Vec<Unresolved>,
        protected_skipped: Vec<ProtectedSkip>,
        already_satisfied: Vec<SatisfiedDependency>,
    ) -> Self {
        InstallPlan {
            entries,
            unresolved,
            protected_skipped,
            already_satisfied,
        }
    }

    pub fn entries(&self) -> &[PackageRecord] {
        &self.entries
    }

    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    pub fn protected_skipped(&self) -> &[ProtectedSkip] {
        &self.protected_skipped
    }

    pub fn already_satisfied(&self) -> &[SatisfiedDependency] {
        &self.already_satisfied
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn download_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}
