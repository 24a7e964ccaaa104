use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ClientResult;

/// Name of the single persisted credential.
pub const TOKEN_KEY: &str = "token";

/// Persists the one opaque session token. No expiry is tracked here; the
/// server is the only authority on whether a token is still valid.
pub trait CredentialStore: Send {
    fn get_token(&self) -> ClientResult<Option<String>>;
    fn set_token(&mut self, token: &str) -> ClientResult<()>;
    fn clear_token(&mut self) -> ClientResult<()>;
}

/// Keeps the token in `<dir>/token` so it survives restarts.
/// The file is read on every access and deleted on clear.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_token(&self) -> ClientResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_token(&mut self, token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = open_private(&self.path)?;
        file.write_all(token.as_bytes())?;
        Ok(())
    }

    fn clear_token(&mut self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Owner read/write only: the file holds a bearer credential.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten a file left by an older run.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    token: Option<String>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self) -> ClientResult<Option<String>> {
        Ok(self.token.clone())
    }

    fn set_token(&mut self, token: &str) -> ClientResult<()> {
        self.token = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&mut self) -> ClientResult<()> {
        self.token = None;
        Ok(())
    }
}
