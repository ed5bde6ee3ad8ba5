use directories::BaseDirs;
use std::path::PathBuf;
use std::{env, fs, path::Path};

const RC_FILE: &str = ".debsaferc";

/// Values read from `.debsaferc` files. Unset keys stay `None` so the
/// environment and built-in defaults can fill them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcSettings {
    pub mirror: Option<String>,
    pub suite: Option<String>,
    pub components: Option<Vec<String>>,
    pub architecture: Option<String>,
    pub cache_ttl_hours: Option<u64>,
    pub download_workers: Option<usize>,
    pub sink_url: Option<String>,
    pub install_command: Option<Vec<String>>,
    pub protect_essential: Option<bool>,
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let mut name = String::new();

        if chars.peek() == Some(&'{') {
            chars.next();
            for next in chars.by_ref() {
                if next == '}' {
                    break;
                }
                name.push(next);
            }
        } else {
            while let Some(&next) = chars.peek() {
                if next == '_' || next.is_ascii_alphanumeric() {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
        }

        if name.is_empty() {
            out.push('$');
        } else {
            out.push_str(&env::var(&name).unwrap_or_default());
        }
    }

    out
}

pub fn normalize_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Where an rc file was found. A project file lives in whatever directory
/// debsafe runs from, so it may only tune download behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcScope {
    User,
    Project,
}

impl RcScope {
    fn allows(self, key: &str) -> bool {
        match self {
            RcScope::User => true,
            RcScope::Project => matches!(key, "cache-ttl-hours" | "download-workers"),
        }
    }
}

/// Reads `~/.debsaferc` and then `./.debsaferc`; later files win.
pub fn read_rc_settings() -> RcSettings {
    let home = BaseDirs::new().map(|base| base.home_dir().to_path_buf());
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    read_rc_files(home.as_deref(), &cwd)
}

pub fn read_rc_files(home: Option<&Path>, cwd: &Path) -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(home) = home {
        apply_rc_file(&home.join(RC_FILE), RcScope::User, &mut settings);
    }

    if home != Some(cwd) {
        apply_rc_file(&cwd.join(RC_FILE), RcScope::Project, &mut settings);
    }

    settings
}

pub fn apply_rc_file(path: &Path, scope: RcScope, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    let Ok(data) = fs::read_to_string(path) else {
        return;
    };

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim().to_ascii_lowercase().replace(['_', '.'], "-");
        if !scope.allows(&key) {
            tracing::warn!(
                "ignoring `{key}` in {}: only ~/{RC_FILE} may set it",
                path.display()
            );
            continue;
        }

        let value = expand_env_vars(value.trim());
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "mirror" => settings.mirror = Some(normalize_url(&value)),
            "suite" | "codename" => settings.suite = Some(value),
            "components" => settings.components = Some(parse_list(&value)),
            "arch" | "architecture" => settings.architecture = Some(value),
            "cache-ttl-hours" => {
                if let Ok(hours) = value.parse::<u64>() {
                    settings.cache_ttl_hours = Some(hours);
                }
            }
            "download-workers" => {
                if let Ok(workers) = value.parse::<usize>()
                    && workers > 0
                {
                    settings.download_workers = Some(workers);
                }
            }
            "sink-url" | "backend" => settings.sink_url = Some(normalize_url(&value)),
            "install-command" => {
                settings.install_command =
                    Some(value.split_whitespace().map(String::from).collect())
            }
            "protect-essential" => settings.protect_essential = parse_bool(&value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_known_keys_and_ignores_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RC_FILE);
        fs::write(
            &path,
            "# mirror settings\n\
             mirror = http://mirror.example/debian/\n\
             ; legacy comment\n\
             components = main, contrib\n\
             download_workers = 8\n\
             download-workers = 0\n\
             cache.ttl.hours = 2\n\
             install-command = doas dpkg -i\n\
             protect-essential = off\n\
             unknown = value\n",
        )
        .unwrap();

        let mut settings = RcSettings::default();
        apply_rc_file(&path, RcScope::User, &mut settings);

        assert_eq!(settings.mirror.as_deref(), Some("http://mirror.example/debian"));
        assert_eq!(
            settings.components,
            Some(vec!["main".to_string(), "contrib".to_string()])
        );
        assert_eq!(settings.download_workers, Some(8));
        assert_eq!(settings.cache_ttl_hours, Some(2));
        assert_eq!(
            settings.install_command,
            Some(vec!["doas".to_string(), "dpkg".to_string(), "-i".to_string()])
        );
        assert_eq!(settings.protect_essential, Some(false));
        assert_eq!(settings.suite, None);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::write(&first, "suite = bookworm\narch = arm64\n").unwrap();
        fs::write(&second, "suite = trixie\n").unwrap();

        let mut settings = RcSettings::default();
        apply_rc_file(&first, RcScope::User, &mut settings);
        apply_rc_file(&second, RcScope::User, &mut settings);

        assert_eq!(settings.suite.as_deref(), Some("trixie"));
        assert_eq!(settings.architecture.as_deref(), Some("arm64"));
    }

    #[test]
    fn project_file_cannot_change_privileged_settings() {
        let home = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join(RC_FILE),
            "mirror = http://deb.debian.org/debian\nsink-url = http://logs.internal\n",
        )
        .unwrap();
        fs::write(
            project.path().join(RC_FILE),
            "install-command = sh -c evil\n\
             protect-essential = off\n\
             mirror = http://attacker.example\n\
             sink-url = http://attacker.example\n\
             suite = sid\n\
             download-workers = 2\n\
             cache-ttl-hours = 1\n",
        )
        .unwrap();

        let settings = read_rc_files(Some(home.path()), project.path());

        assert_eq!(settings.install_command, None);
        assert_eq!(settings.protect_essential, None);
        assert_eq!(settings.suite, None);
        assert_eq!(settings.mirror.as_deref(), Some("http://deb.debian.org/debian"));
        assert_eq!(settings.sink_url.as_deref(), Some("http://logs.internal"));
        assert_eq!(settings.download_workers, Some(2));
        assert_eq!(settings.cache_ttl_hours, Some(1));
    }

    #[test]
    fn home_directory_file_is_trusted_when_run_from_home() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join(RC_FILE), "install-command = doas dpkg -i\n").unwrap();

        let settings = read_rc_files(Some(home.path()), home.path());

        assert_eq!(
            settings.install_command,
            Some(vec!["doas".to_string(), "dpkg".to_string(), "-i".to_string()])
        );
    }

    #[test]
    fn missing_file_is_ignored() {
        let mut settings = RcSettings::default();
        apply_rc_file(Path::new("/nonexistent/.debsaferc"), RcScope::User, &mut settings);
        assert_eq!(settings, RcSettings::default());
    }

    #[test]
    fn leaves_lone_dollar_untouched() {
        assert_eq!(expand_env_vars("cost $ 5"), "cost $ 5");
        assert_eq!(expand_env_vars("${DEBSAFE_SURELY_UNSET_VAR}/x"), "/x");
    }
}
