use std::env;
use std::fs;
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distro {
    pub id: String,
    pub codename: String,
    pub version: String,
}

impl Distro {
    pub fn unknown() -> Self {
        Distro {
            id: "unknown".to_string(),
            codename: "stable".to_string(),
            version: "unknown".to_string(),
        }
    }

    pub fn is_ubuntu(&self) -> bool {
        self.id == "ubuntu"
    }

    pub fn is_debian(&self) -> bool {
        self.id == "debian"
    }

    /// Suite used when no override is configured. Unknown distributions fall
    /// back to Debian stable.
    pub fn default_suite(&self) -> String {
        if self.is_ubuntu() || self.is_debian() {
            self.codename.clone()
        } else {
            "stable".to_string()
        }
    }

    pub fn default_components(&self) -> Vec<String> {
        let components: &[&str] = if self.is_ubuntu() {
            &["main", "universe", "multiverse", "restricted"]
        } else if self.is_debian() {
            &["main", "contrib", "non-free"]
        } else {
            &["main"]
        };

        components.iter().map(|c| c.to_string()).collect()
    }

    pub fn default_mirror(&self, architecture: &str) -> String {
        if self.is_ubuntu() {
            if matches!(architecture, "amd64" | "i386") {
                "http://archive.ubuntu.com/ubuntu".to_string()
            } else {
                "http://ports.ubuntu.com/ubuntu-ports".to_string()
            }
        } else {
            "http://deb.debian.org/debian".to_string()
        }
    }
}

impl std::fmt::Display for Distro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.id, self.codename, self.version)
    }
}

pub fn detect_distro() -> Distro {
    read_os_release(Path::new(OS_RELEASE)).unwrap_or_else(Distro::unknown)
}

pub fn read_os_release(path: &Path) -> Option<Distro> {
    let data = fs::read_to_string(path).ok()?;
    Some(parse_os_release(&data))
}

pub fn parse_os_release(data: &str) -> Distro {
    let mut distro = Distro::unknown();
    let mut ubuntu_codename = None;
    let mut codename = None;

    for line in data.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');

        match key.trim() {
            "ID" => distro.id = value.to_ascii_lowercase(),
            "VERSION_ID" => distro.version = value.to_string(),
            "VERSION_CODENAME" if !value.is_empty() => codename = Some(value.to_string()),
            "UBUNTU_CODENAME" if !value.is_empty() => ubuntu_codename = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(codename) = codename.or(ubuntu_codename) {
        distro.codename = codename;
    }

    distro
}

/// Maps a Rust target architecture onto the Debian architecture name.
pub fn debian_arch(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        "riscv64" => "riscv64",
        "s390x" => "s390x",
        "loongarch64" => "loong64",
        other => other,
    }
}

pub fn host_architecture() -> String {
    debian_arch(env::consts::ARCH).to_string()
}
