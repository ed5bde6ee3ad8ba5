use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub filename: String,
    pub depends: String,
    pub pre_depends: String,
    pub size: u64,
    pub sha256: Option<String>,
    pub essential: bool,
    pub priority: Option<String>,
    pub section: Option<String>,
    pub description: Option<String>,
}

impl PackageRecord {
    pub fn is_required(&self) -> bool {
        self.priority.as_deref() == Some("required")
    }

    pub fn compare_version(&self, other: &PackageRecord) -> Ordering {
        debsafe_version::compare(&self.version, &other.version)
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.name, self.version, self.architecture)
    }
}

/// Every known record, grouped by package name.
///
/// Built once per index fetch and never mutated afterwards; a refresh builds
/// a new catalog.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    packages: BTreeMap<String, Vec<PackageRecord>>,
}

impl Catalog {
    /// Groups records by name. Duplicate `(name, architecture, version)`
    /// triples keep the first record seen.
    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let mut packages: BTreeMap<String, Vec<PackageRecord>> = BTreeMap::new();

        for record in records {
            let variants = packages.entry(record.name.clone()).or_default();
            let duplicate = variants.iter().any(|existing| {
                existing.architecture == record.architecture && existing.version == record.version
            });

            if !duplicate {
                variants.push(record);
            }
        }

        Catalog { packages }
    }

    pub fn get(&self, name: &str) -> &[PackageRecord] {
        self.packages.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Number of distinct package names.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    /// Highest version of `name`, preferring `architecture` and then `all`.
    pub fn newest(&self, name: &str, architecture: &str) -> Option<&PackageRecord> {
        let variants = self.get(name);

        [architecture, "all"]
            .iter()
            .find_map(|arch| {
                variants
                    .iter()
                    .filter(|record| record.architecture == *arch)
                    .max_by(|a, b| a.compare_version(b))
            })
            .or_else(|| variants.iter().max_by(|a, b| a.compare_version(b)))
    }

    /// Case-insensitive substring search over names and descriptions.
    /// Returns at most `limit` packages, one record each.
    pub fn search(&self, query: &str, architecture: &str, limit: usize) -> Vec<&PackageRecord> {
        let needle = query.to_lowercase();

        self.packages
            .keys()
            .filter_map(|name| self.newest(name, architecture))
            .filter(|record| {
                record.name.to_lowercase().contains(&needle)
                    || record
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .take(limit)
            .collect()
    }
}
