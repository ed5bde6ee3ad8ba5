use crate::platform::{self, Distro};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub mod rc;
pub use self::rc::*;

pub const DEFAULT_SINK_URL: &str = "http://localhost:8000";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 4;
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const SINK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DebsafeConfig {
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    pub distro: Distro,
    pub mirror: String,
    pub suite: String,
    pub components: Vec<String>,
    pub architecture: String,
    pub cache_ttl: Duration,
    pub download_workers: usize,
    pub sink_url: String,
    pub install_command: Vec<String>,
    pub protect_essential: bool,
    pub verbose: bool,
}

impl DebsafeConfig {
    pub fn from_env() -> Self {
        let dirs = ProjectDirs::from("io", "debsafe", "debsafe");

        let (cache_dir, data_dir) = if let Ok(home) = env::var("DEBSAFE_HOME") {
            let base = PathBuf::from(home);
            (base.join("cache"), base.join("data"))
        } else {
            match dirs {
                Some(dirs) => (
                    dirs.cache_dir().to_path_buf(),
                    dirs.data_local_dir().to_path_buf(),
                ),
                None => {
                    let fallback = PathBuf::from(".debsafe");
                    (fallback.join("cache"), fallback.join("data"))
                }
            }
        };

        let distro = platform::detect_distro();
        let rc = read_rc_settings();

        let architecture = env_string("DEBSAFE_ARCH")
            .or(rc.architecture)
            .unwrap_or_else(platform::host_architecture);

        let mirror = env_string("DEBSAFE_MIRROR")
            .map(|value| normalize_url(&value))
            .or(rc.mirror)
            .unwrap_or_else(|| distro.default_mirror(&architecture));

        let suite = env_string("DEBSAFE_SUITE")
            .or(rc.suite)
            .unwrap_or_else(|| distro.default_suite());

        let components = env_string("DEBSAFE_COMPONENTS")
            .map(|value| parse_list(&value))
            .filter(|list| !list.is_empty())
            .or(rc.components)
            .unwrap_or_else(|| distro.default_components());

        let mut cache_ttl = rc
            .cache_ttl_hours
            .map(|hours| Duration::from_secs(hours * 60 * 60))
            .unwrap_or(DEFAULT_CACHE_TTL);

        if let Some(value) = env_string("DEBSAFE_CACHE_TTL_HOURS")
            && let Ok(hours) = value.parse::<u64>()
        {
            cache_ttl = Duration::from_secs(hours * 60 * 60);
        }

        let mut download_workers = rc.download_workers.unwrap_or(DEFAULT_DOWNLOAD_WORKERS);

        if let Some(value) = env_string("DEBSAFE_DOWNLOAD_WORKERS")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed > 0
        {
            download_workers = parsed;
        }

        let sink_url = env_string("DEBSAFE_SINK_URL")
            .map(|value| normalize_url(&value))
            .or(rc.sink_url)
            .unwrap_or_else(|| DEFAULT_SINK_URL.to_string());

        let install_command = env_string("DEBSAFE_INSTALL_COMMAND")
            .map(|value| value.split_whitespace().map(String::from).collect())
            .or(rc.install_command)
            .unwrap_or_else(default_install_command);

        let protect_essential = env_string("DEBSAFE_PROTECT_ESSENTIAL")
            .and_then(|value| parse_bool(&value))
            .or(rc.protect_essential)
            .unwrap_or(true);

        let verbose = env_string("DEBSAFE_VERBOSE")
            .and_then(|value| parse_bool(&value))
            .unwrap_or(false);

        DebsafeConfig {
            cache_dir,
            data_dir,
            distro,
            mirror,
            suite,
            components,
            architecture,
            cache_ttl,
            download_workers,
            sink_url,
            install_command,
            protect_essential,
            verbose,
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join("downloads")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    /// Snapshot file for the current repository. The name carries a digest
    /// of the index URLs, so changing the mirror or components never reuses
    /// another repository's catalog.
    pub fn index_cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!(
            "index-{}-{}-{}-{}.bin",
            self.distro.id,
            self.suite,
            self.architecture,
            self.repository_digest()
        ))
    }

    fn repository_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (_, url) in self.index_urls() {
            hasher.update(url.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(&hasher.finalize()[..6])
    }

    /// `(component, url)` pairs of the compressed index documents.
    pub fn index_urls(&self) -> Vec<(String, String)> {
        self.components
            .iter()
            .map(|component| {
                let url = format!(
                    "{}/dists/{}/{}/binary-{}/Packages.gz",
                    self.mirror, self.suite, component, self.architecture
                );
                (component.clone(), url)
            })
            .collect()
    }
}

pub fn default_install_command() -> Vec<String> {
    ["sudo", "dpkg", "-i", "--force-confold", "--force-confdef"]
        .iter()
        .map(|part| part.to_string())
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixture() -> DebsafeConfig {
        DebsafeConfig {
            cache_dir: PathBuf::from("/tmp/debsafe/cache"),
            data_dir: PathBuf::from("/tmp/debsafe/data"),
            distro: platform::parse_os_release("ID=debian\nVERSION_CODENAME=bookworm\n"),
            mirror: "http://deb.debian.org/debian".to_string(),
            suite: "bookworm".to_string(),
            components: vec!["main".to_string(), "contrib".to_string()],
            architecture: "amd64".to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            download_workers: DEFAULT_DOWNLOAD_WORKERS,
            sink_url: DEFAULT_SINK_URL.to_string(),
            install_command: default_install_command(),
            protect_essential: true,
            verbose: false,
        }
    }

    #[test]
    fn builds_component_index_urls() {
        let urls = fixture().index_urls();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].0, "main");
        assert_eq!(
            urls[1].1,
            "http://deb.debian.org/debian/dists/bookworm/contrib/binary-amd64/Packages.gz"
        );
    }

    #[test]
    fn derives_local_paths() {
        let config = fixture();

        let cache_path = config.index_cache_path();
        assert_eq!(cache_path.parent(), Some(Path::new("/tmp/debsafe/cache")));
        let file_name = cache_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("index-debian-bookworm-amd64-"));
        assert!(file_name.ends_with(".bin"));
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/tmp/debsafe/data/credentials.json")
        );
    }

    #[test]
    fn cache_path_follows_repository() {
        let base = fixture();

        let mut other_mirror = fixture();
        other_mirror.mirror = "http://mirror.example/debian".to_string();

        let mut more_components = fixture();
        more_components.components.push("non-free".to_string());

        assert_eq!(base.index_cache_path(), fixture().index_cache_path());
        assert_ne!(base.index_cache_path(), other_mirror.index_cache_path());
        assert_ne!(base.index_cache_path(), more_components.index_cache_path());
    }

    #[test]
    fn default_installer_forces_config_handling() {
        let command = default_install_command();
        assert_eq!(command[0], "sudo");
        assert!(command.contains(&"--force-confold".to_string()));
    }
}
