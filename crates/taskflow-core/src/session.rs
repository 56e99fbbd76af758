//! Explicit session context: the currently signed-in profile.
//!
//! The profile lives in `session.data` with a load/save/clear lifecycle
//! instead of an ambient per-process cache, so every consumer receives
//! the session as a value.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::datastore::FileStore;
use crate::task::User;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn load(store: &FileStore) -> anyhow::Result<Self> {
        let user = store.load_session_user()?;
        Ok(Self { user })
    }

    pub fn save(store: &FileStore, mut user: User, now: DateTime<Utc>) -> anyhow::Result<Self> {
        user.updated_at = now;
        store.save_session_user(&user)?;
        info!(email = %user.email, "session saved");
        Ok(Self { user: Some(user) })
    }

    pub fn clear(store: &FileStore) -> anyhow::Result<()> {
        store.clear_session()?;
        info!("session cleared");
        Ok(())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> anyhow::Result<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("not logged in; run `taskflow login <email> <name>`"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::Session;
    use crate::datastore::FileStore;
    use crate::task::{Profession, User};

    #[test]
    fn save_load_clear_roundtrip() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).expect("open store");
        let now = Utc::now();

        let session = Session::load(&store).expect("load empty session");
        assert!(session.current_user().is_none());
        assert!(session.require_user().is_err());

        let user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            Profession::Developer,
            now,
        );
        Session::save(&store, user.clone(), now).expect("save session");

        let session = Session::load(&store).expect("reload session");
        let current = session.require_user().expect("user present");
        assert_eq!(current.email, "ada@example.com");
        assert_eq!(current.profession, Profession::Developer);

        Session::clear(&store).expect("clear session");
        let session = Session::load(&store).expect("load cleared session");
        assert!(session.current_user().is_none());
    }
}
