use crate::{DebsafeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

pub fn load_credentials(path: &Path) -> Result<Option<Credentials>> {
    if !path.is_file() {
        return Ok(None);
    }

    let data = fs::read_to_string(path).map_err(|source| DebsafeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let credentials = serde_json::from_str(&data).map_err(|source| DebsafeError::ParseJson {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(credentials))
}

/// Writes the credentials file readable by the owner only.
pub fn save_credentials(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| DebsafeError::WriteFile {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(credentials).map_err(|source| {
        DebsafeError::ParseJson {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_error = |source| DebsafeError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(json.as_bytes()).map_err(write_error)?;

    // An existing file keeps its old mode on open.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}

/// Removes stored credentials. Returns whether a file existed.
pub fn remove_credentials(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(DebsafeError::WriteFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}
