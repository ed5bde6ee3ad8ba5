use crate::index::PackageRecord;
use std::collections::BTreeSet;

const SYSTEM_PACKAGES: &[&str] = &[
    "libc6",
    "libc-bin",
    "libgcc-s1",
    "libgcc1",
    "libstdc++6",
    "dpkg",
    "apt",
    "apt-utils",
    "bash",
    "dash",
    "coreutils",
    "util-linux",
    "systemd",
    "systemd-sysv",
    "init",
    "base-files",
    "base-passwd",
    "login",
    "passwd",
    "libpam0g",
    "libselinux1",
    "tar",
    "gzip",
    "zlib1g",
    "grep",
    "sed",
    "perl-base",
    "ubuntu-minimal",
];

const SYSTEM_PREFIXES: &[&str] = &["linux-image-", "linux-headers-", "linux-modules-"];

/// Packages that must never be installed or replaced, since doing so can
/// leave the host unbootable or without a working package manager.
#[derive(Debug, Clone)]
pub struct ProtectedSet {
    names: BTreeSet<String>,
    prefixes: Vec<String>,
    essential: bool,
}

impl ProtectedSet {
    pub fn new<N, P>(names: N, prefixes: P) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        ProtectedSet {
            names: names.into_iter().map(Into::into).collect(),
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            essential: false,
        }
    }

    /// The base-system packages of Debian and Ubuntu hosts.
    pub fn system() -> Self {
        ProtectedSet::new(SYSTEM_PACKAGES.iter().copied(), SYSTEM_PREFIXES.iter().copied())
    }

    /// Also protect records flagged `Essential: yes` or `Priority: required`.
    pub fn with_essential(mut self, enabled: bool) -> Self {
        self.essential = enabled;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
            || self.prefixes.iter().any(|prefix| name.starts_with(prefix))
            || is_gcc_base(name)
    }

    pub fn protects(&self, record: &PackageRecord) -> bool {
        self.contains(&record.name)
            || (self.essential && (record.essential || record.is_required()))
    }
}

// gcc-<N>-base
fn is_gcc_base(name: &str) -> bool {
    name.strip_prefix("gcc-")
        .and_then(|rest| rest.strip_suffix("-base"))
        .is_some_and(|major| !major.is_empty() && major.chars().all(|c| c.is_ascii_digit()))
}
