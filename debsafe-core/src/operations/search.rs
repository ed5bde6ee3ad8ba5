use crate::index::{Catalog, PackageRecord};
use crate::installed::InstalledSnapshot;
use crate::protected::ProtectedSet;
use crate::{DebsafeConfig, DebsafeError, Result};

pub const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: PackageRecord,
    pub blocked: bool,
}

#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub record: PackageRecord,
    pub blocked: bool,
    pub installed_version: Option<String>,
    pub other_versions: Vec<String>,
}

pub async fn search(config: &DebsafeConfig, query: &str) -> Result<Vec<SearchHit>> {
    let catalog = super::load_catalog(config, false).await?;
    let protected = super::protected_set(config);

    Ok(search_catalog(
        &catalog,
        &protected,
        query,
        &config.architecture,
        SEARCH_LIMIT,
    ))
}

pub fn search_catalog(
    catalog: &Catalog,
    protected: &ProtectedSet,
    query: &str,
    architecture: &str,
    limit: usize,
) -> Vec<SearchHit> {
    catalog
        .search(query, architecture, limit)
        .into_iter()
        .map(|record| SearchHit {
            blocked: protected.protects(record),
            record: record.clone(),
        })
        .collect()
}

pub async fn info(config: &DebsafeConfig, name: &str) -> Result<PackageInfo> {
    let catalog = super::load_catalog(config, false).await?;
    let protected = super::protected_set(config);
    let installed = InstalledSnapshot::load().await;

    describe(&catalog, &protected, &installed, name, &config.architecture)
}

pub fn describe(
    catalog: &Catalog,
    protected: &ProtectedSet,
    installed: &InstalledSnapshot,
    name: &str,
    architecture: &str,
) -> Result<PackageInfo> {
    let record = catalog
        .newest(name, architecture)
        .ok_or_else(|| DebsafeError::PackageNotFound {
            name: name.to_string(),
        })?;

    let other_versions = catalog
        .get(name)
        .iter()
        .filter(|candidate| *candidate != record)
        .map(|candidate| format!("{} [{}]", candidate.version, candidate.architecture))
        .collect();

    Ok(PackageInfo {
        blocked: protected.protects(record),
        installed_version: installed.get(name).map(|p| p.version.clone()),
        record: record.clone(),
        other_versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installed::InstalledPackage;

    fn record(name: &str, version: &str, arch: &str) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            version: version.to_string(),
            architecture: arch.to_string(),
            filename: format!("{name}.deb"),
            depends: String::new(),
            pre_depends: String::new(),
            size: 0,
            sha256: None,
            essential: false,
            priority: None,
            section: None,
            description: None,
        }
    }

    #[test]
    fn search_flags_protected_packages() {
        let catalog = Catalog::from_records([
            record("bash", "5.2", "amd64"),
            record("bash-completion", "2.11", "all"),
        ]);
        let protected = ProtectedSet::new(["bash"], Vec::<String>::new());

        let hits = search_catalog(&catalog, &protected, "bash", "amd64", SEARCH_LIMIT);

        assert_eq!(hits.len(), 2);
        assert!(hits[0].blocked);
        assert!(!hits[1].blocked);
    }

    #[test]
    fn describe_reports_installed_and_alternatives() {
        let catalog = Catalog::from_records([
            record("git", "1:2.43.0-1", "amd64"),
            record("git", "1:2.39.2-1", "amd64"),
        ]);
        let protected = ProtectedSet::new(Vec::<String>::new(), Vec::<String>::new());
        let installed = InstalledSnapshot::from_packages([(
            "git".to_string(),
            InstalledPackage {
                version: "1:2.39.2-1".to_string(),
                architecture: "amd64".to_string(),
            },
        )]);

        let info = describe(&catalog, &protected, &installed, "git", "amd64").unwrap();

        assert_eq!(info.record.version, "1:2.43.0-1");
        assert_eq!(info.installed_version.as_deref(), Some("1:2.39.2-1"));
        assert_eq!(info.other_versions, vec!["1:2.39.2-1 [amd64]".to_string()]);
    }

    #[test]
    fn describe_unknown_package() {
        let protected = ProtectedSet::system();

        assert!(matches!(
            describe(
                &Catalog::default(),
                &protected,
                &InstalledSnapshot::default(),
                "nope",
                "amd64"
            ),
            Err(DebsafeError::PackageNotFound { .. })
        ));
    }
}
