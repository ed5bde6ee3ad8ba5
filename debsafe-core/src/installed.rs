use crate::depends::Constraint;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const QUERY_FORMAT: &str = "${Package}\t${Version}\t${Architecture}\t${db:Status-Abbrev}\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub version: String,
    pub architecture: String,
}

/// Packages currently installed on the host.
#[derive(Debug, Clone, Default)]
pub struct InstalledSnapshot {
    packages: BTreeMap<String, InstalledPackage>,
}

impl InstalledSnapshot {
    pub fn from_packages(
        packages: impl IntoIterator<Item = (String, InstalledPackage)>,
    ) -> Self {
        InstalledSnapshot {
            packages: packages.into_iter().collect(),
        }
    }

    /// Reads the host database with `dpkg-query`. Hosts without dpkg yield an
    /// empty snapshot.
    pub async fn load() -> Self {
        let output = Command::new("dpkg-query")
            .arg("-W")
            .arg(format!("-f={QUERY_FORMAT}"))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let snapshot = parse_dpkg_query(&String::from_utf8_lossy(&output.stdout));
                debug!("{} packages installed on host", snapshot.len());
                snapshot
            }
            Ok(output) => {
                debug!("dpkg-query exited with {}", output.status);
                InstalledSnapshot::default()
            }
            Err(e) => {
                debug!("dpkg-query unavailable: {e}");
                InstalledSnapshot::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn satisfies(&self, constraint: &Constraint) -> Option<&InstalledPackage> {
        self.packages.get(&constraint.name).filter(|installed| {
            constraint.allows_version(&installed.version)
                && constraint.allows_architecture(&installed.architecture)
        })
    }
}

pub fn parse_dpkg_query(output: &str) -> InstalledSnapshot {
    let packages = output.lines().filter_map(|line| {
        let mut fields = line.split('\t');
        let name = fields.next()?.trim();
        let version = fields.next()?.trim();
        let architecture = fields.next()?.trim();
        let status = fields.next().unwrap_or("ii").trim();

        if name.is_empty() || version.is_empty() || !status.starts_with("ii") {
            return None;
        }

        Some((
            name.to_string(),
            InstalledPackage {
                version: version.to_string(),
                architecture: architecture.to_string(),
            },
        ))
    });

    InstalledSnapshot::from_packages(packages)
}
