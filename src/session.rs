// Token persistence: the last token obtained from `register` or `login` is
// kept in a file in the user's home directory so later commands can pass
// `-` instead of the full token.

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Token argument that means "use the saved token".
pub const SAVED_TOKEN: &str = "-";

const TOKEN_FILE_NAME: &str = ".todo_token";

/// Location of the session file: `TODO_TOKEN_FILE` when set, otherwise
/// `~/.todo_token`.
pub fn token_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TODO_TOKEN_FILE") {
        return PathBuf::from(path);
    }
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}

/// Handles reading and writing the saved token at a fixed path.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
}

impl Session {
    pub fn new(path: PathBuf) -> Self {
        Session { path }
    }

    pub fn from_env() -> Self {
        Self::new(token_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the token, readable by the owner only on Unix.
    pub fn persist(&self, token: &str) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to save token to {}", self.path.display()))?;
        // `mode` only applies on creation; tighten a file left by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }
        file.write_all(token.as_bytes())
            .with_context(|| format!("Failed to save token to {}", self.path.display()))?;
        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    pub fn load(&self) -> Result<String> {
        let data = std::fs::read_to_string(&self.path).with_context(|| {
            format!(
                "No saved token at {}; log in first",
                self.path.display()
            )
        })?;
        let token = data.trim();
        if token.is_empty() {
            bail!("Saved token at {} is empty; log in again", self.path.display());
        }
        Ok(token.to_string())
    }

    /// Remove the session file if it still holds `token`. A file holding a
    /// different token belongs to another login and is left alone.
    pub fn forget(&self, token: &str) -> Result<bool> {
        match std::fs::read_to_string(&self.path) {
            Ok(saved) if saved.trim() == token => {
                std::fs::remove_file(&self.path)
                    .with_context(|| format!("Failed to remove {}", self.path.display()))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Turn a command-line token argument into the token to send.
    pub fn resolve(&self, arg: &str) -> Result<String> {
        if arg == SAVED_TOKEN {
            return self.load();
        }
        Ok(arg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_in(dir: &tempfile::TempDir) -> Session {
        Session::new(dir.path().join("token"))
    }

    #[test]
    fn persisted_token_is_resolved_from_dash() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        session.persist("abc.def.ghi").unwrap();

        assert_eq!(session.resolve("-").unwrap(), "abc.def.ghi");
        assert_eq!(session.resolve("explicit").unwrap(), "explicit");
    }

    #[test]
    fn missing_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = session_in(&dir).resolve("-").unwrap_err();
        assert!(err.to_string().contains("No saved token"));
    }

    #[test]
    fn blank_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        std::fs::write(session.path(), "  \n").unwrap();
        assert!(session.load().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        session.persist("secret").unwrap();
        let mode = std::fs::metadata(session.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // A pre-existing, world-readable file is tightened and overwritten.
        std::fs::set_permissions(session.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        session.persist("newer").unwrap();
        let mode = std::fs::metadata(session.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(session.load().unwrap(), "newer");
    }

    #[test]
    fn forget_only_removes_matching_token() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        session.persist("current").unwrap();

        assert!(!session.forget("other").unwrap());
        assert!(session.path().exists());

        assert!(session.forget("current").unwrap());
        assert!(!session.path().exists());
        assert!(!session.forget("current").unwrap());
    }
}
