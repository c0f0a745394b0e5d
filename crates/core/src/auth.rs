use crate::error::{AuthError, StorageError};
use crate::models::{CredentialRecord, Session};
use crate::storage::KeyValueStore;
use tracing::{debug, info};

pub const SESSION_KEY: &str = "user";
pub const USERS_KEY: &str = "users";

/// Demo credential and session store. Passwords are kept as plain text.
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        require_non_empty(username, password)?;

        let mut users = self.users()?;
        if users.iter().any(|record| record.username == username) {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }

        users.push(CredentialRecord {
            username: username.to_string(),
            password: password.to_string(),
        });
        let encoded = serde_json::to_string(&users).map_err(StorageError::from)?;
        self.storage.set(USERS_KEY, &encoded)?;

        info!(username, "account created");
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        // Blank fields never reach the lookup, even if such a record was stored by hand.
        require_non_empty(username, password)?;

        let matched = self
            .users()?
            .iter()
            .any(|record| record.username == username && record.password == password);

        if !matched {
            debug!(username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            username: username.to_string(),
        };
        let encoded = serde_json::to_string(&session).map_err(StorageError::from)?;
        self.storage.set(SESSION_KEY, &encoded)?;

        info!(username, "logged in");
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.storage.delete(SESSION_KEY)?;
        Ok(())
    }

    pub fn check_session(&self) -> Result<Option<Session>, AuthError> {
        match self.storage.get(SESSION_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).map_err(StorageError::from)?)),
            None => Ok(None),
        }
    }

    /// Like [`check_session`](Self::check_session) but fails when nobody is logged in.
    pub fn require_session(&self) -> Result<Session, AuthError> {
        self.check_session()?.ok_or(AuthError::NoSession)
    }

    pub fn users(&self) -> Result<Vec<CredentialRecord>, AuthError> {
        match self.storage.get(USERS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(StorageError::from)?),
            None => Ok(Vec::new()),
        }
    }
}

fn require_non_empty(username: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::EmptyField("username"));
    }
    if password.is_empty() {
        return Err(AuthError::EmptyField("password"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CredentialStore, SESSION_KEY, USERS_KEY};
    use crate::error::AuthError;
    use crate::storage::{KeyValueStore, MemoryStore};

    #[test]
    fn signup_then_login_establishes_session() -> Result<(), Box<dyn std::error::Error>> {
        let store = CredentialStore::new(MemoryStore::new());
        store.signup("ana", "secret")?;
        assert_eq!(store.check_session()?, None);

        let session = store.login("ana", "secret")?;
        assert_eq!(session.username, "ana");
        assert_eq!(store.check_session()?.map(|s| s.username), Some("ana".to_string()));
        Ok(())
    }

    #[test]
    fn duplicate_signup_keeps_one_record() -> Result<(), Box<dyn std::error::Error>> {
        let store = CredentialStore::new(MemoryStore::new());
        store.signup("ana", "secret")?;

        let second = store.signup("ana", "other");
        assert!(matches!(second, Err(AuthError::DuplicateUsername(name)) if name == "ana"));

        let users = store.users()?;
        assert_eq!(users.iter().filter(|record| record.username == "ana").count(), 1);
        assert_eq!(users[0].password, "secret");
        Ok(())
    }

    #[test]
    fn usernames_are_case_sensitive() -> Result<(), Box<dyn std::error::Error>> {
        let store = CredentialStore::new(MemoryStore::new());
        store.signup("ana", "secret")?;
        store.signup("Ana", "secret")?;
        assert_eq!(store.users()?.len(), 2);
        Ok(())
    }

    #[test]
    fn wrong_password_is_rejected_without_session() -> Result<(), Box<dyn std::error::Error>> {
        let store = CredentialStore::new(MemoryStore::new());
        store.signup("ana", "secret")?;

        assert!(matches!(store.login("ana", "nope"), Err(AuthError::InvalidCredentials)));
        assert!(matches!(store.login("bob", "secret"), Err(AuthError::InvalidCredentials)));
        assert_eq!(store.check_session()?, None);
        Ok(())
    }

    #[test]
    fn logout_clears_session() -> Result<(), Box<dyn std::error::Error>> {
        let store = CredentialStore::new(MemoryStore::new());
        store.signup("ana", "secret")?;
        store.login("ana", "secret")?;

        store.logout()?;
        assert_eq!(store.check_session()?, None);
        assert!(matches!(store.require_session(), Err(AuthError::NoSession)));
        Ok(())
    }

    #[test]
    fn empty_fields_are_rejected() {
        let store = CredentialStore::new(MemoryStore::new());
        assert!(matches!(store.signup("", "pw"), Err(AuthError::EmptyField("username"))));
        assert!(matches!(store.signup("ana", ""), Err(AuthError::EmptyField("password"))));
    }

    #[test]
    fn blank_login_is_rejected_even_for_stored_blank_record() -> Result<(), Box<dyn std::error::Error>> {
        let storage = MemoryStore::new();
        storage.set(USERS_KEY, r#"[{"username":"ana","password":""}]"#)?;
        let store = CredentialStore::new(&storage);

        assert!(matches!(store.login("ana", ""), Err(AuthError::EmptyField("password"))));
        assert_eq!(store.check_session()?, None);
        Ok(())
    }

    #[test]
    fn storage_layout_matches_expected_keys() -> Result<(), Box<dyn std::error::Error>> {
        let storage = MemoryStore::new();
        let store = CredentialStore::new(&storage);
        store.signup("ana", "secret")?;
        store.login("ana", "secret")?;

        let users: serde_json::Value =
            serde_json::from_str(&storage.get(USERS_KEY)?.unwrap_or_default())?;
        assert_eq!(users, serde_json::json!([{ "username": "ana", "password": "secret" }]));

        let session: serde_json::Value =
            serde_json::from_str(&storage.get(SESSION_KEY)?.unwrap_or_default())?;
        assert_eq!(session, serde_json::json!({ "username": "ana" }));
        Ok(())
    }
}
