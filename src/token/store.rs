use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::core::error::Error;

/// Name of the single persisted slot holding the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Durable slot for one opaque bearer token.
///
/// There is a single writer per logical user action; implementations do not
/// coordinate concurrent `set`/`clear` calls, the last write wins.
///
/// An empty token is never handed back: `get` reports it as absent, the same
/// as after `clear`.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn set(&self, token: &str) -> impl Future<Output = Result<(), Error>> + Send;

    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Keeps the token in a file named [`TOKEN_KEY`] readable only by the owner.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<String>, Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(e)),
        }
    }

    async fn set(&self, token: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::Storage)?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(Error::Storage)?;
        // `mode` only applies when the file is created
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(Error::Storage)?;
        }
        file.write_all(token.as_bytes())
            .await
            .map_err(Error::Storage)?;
        file.flush().await.map_err(Error::Storage)?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e)),
        }
    }
}

/// In-process slot; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore(RwLock<Option<String>>);

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self(RwLock::new(Some(token.into())))
    }
}

impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<String>, Error> {
        Ok(self.0.read().await.clone().filter(|t| !t.is_empty()))
    }

    async fn set(&self, token: &str) -> Result<(), Error> {
        *self.0.write().await = Some(token.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        *self.0.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set("abc.def.ghi").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("abc.def.ghi"));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested"));

        assert_eq!(store.get().await.unwrap(), None);

        store.set("first").await.unwrap();
        store.set("second").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("second"));

        // a fresh handle on the same directory sees the persisted token
        let reopened = FileTokenStore::new(dir.path().join("nested"));
        assert_eq!(reopened.get().await.unwrap().as_deref(), Some("second"));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_empty_token_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileTokenStore::new(dir.path());
        let memory = MemoryTokenStore::new();

        file.set("").await.unwrap();
        memory.set("").await.unwrap();

        assert_eq!(file.get().await.unwrap(), None);
        assert_eq!(memory.get().await.unwrap(), None);
        assert_eq!(MemoryTokenStore::with_token("").get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_clear_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.set("secret").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), "old").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        store.set("new").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get().await.unwrap().as_deref(), Some("new"));
    }
}
