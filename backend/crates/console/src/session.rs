//! Persisted session: the bearer token and the signed-in user, stored as a
//! small JSON file. Changes are published on a watch channel so a long-lived
//! controller can react to sign-out from anywhere in the process; other
//! processes are picked up by [`SessionStore::reload_from_disk`].

use promeconfig_common::User;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct SessionStore {
    path: PathBuf,
    tx: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Opens the store and loads whatever is on disk. A missing or unreadable
    /// file means signed out.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let initial = read_session(&path).await?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Persists the session and publishes it. Last write wins.
    pub async fn save(&self, session: Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&session)?;
        tokio::fs::write(&self.path, body).await?;
        debug!(user_id = %session.user.id, "Session saved.");
        self.tx.send_replace(Some(session));
        Ok(())
    }

    /// Drops the in-memory session first, then the file. The in-memory state
    /// is gone even when the file cannot be removed.
    pub async fn clear(&self) -> Result<()> {
        self.tx.send_replace(None);
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-reads the file and publishes it if it differs from what is held in
    /// memory. Returns whether anything changed.
    pub async fn reload_from_disk(&self) -> Result<bool> {
        let on_disk = read_session(&self.path).await?;
        Ok(self.tx.send_if_modified(|current| {
            if *current == on_disk {
                false
            } else {
                *current = on_disk;
                true
            }
        }))
    }
}

async fn read_session(path: &Path) -> Result<Option<Session>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) if !session.token.is_empty() => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(path = ?path, error = %e, "Ignoring unreadable session file.");
                Ok(None)
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(token: &str) -> Session {
        Session {
            token: token.to_string(),
            user: User {
                id: "u-1".into(),
                email: "ops@example.com".into(),
                created_at: Utc::now(),
                updated_at: None,
            },
        }
    }

    #[tokio::test]
    async fn save_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        let store = SessionStore::open(&path).await.unwrap();
        assert!(!store.is_authenticated());
        store.save(session("tok-1")).await.unwrap();

        let reopened = SessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.token().as_deref(), Some("tok-1"));
        assert_eq!(reopened.current().unwrap().user.email, "ops@example.com");
    }

    #[tokio::test]
    async fn clear_notifies_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).await.unwrap();
        store.save(session("tok-1")).await.unwrap();

        let mut rx = store.subscribe();
        store.clear().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(!store.path().exists());

        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn reload_picks_up_external_sign_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::open(&path).await.unwrap();
        store.save(session("tok-1")).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(store.reload_from_disk().await.unwrap());
        assert!(!store.is_authenticated());
        assert!(!store.reload_from_disk().await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = SessionStore::open(&path).await.unwrap();
        assert!(store.current().is_none());
    }
}
