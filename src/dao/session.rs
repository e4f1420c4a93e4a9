use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    dao::storage::{
        KEY_GUITAR_ID, KEY_PIANO_ID, KEY_REFRESH_TOKEN, KEY_TOKEN, KEY_USER, KEY_USER_ID,
        KeyValueStore, StorageResult, read_json, write_json,
    },
    state::game::Instrument,
};

/// Profile of the signed-in user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend identifier.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name, if the user picked one.
    #[serde(default)]
    pub username: Option<String>,
    /// Whether the user holds an active subscription.
    #[serde(default)]
    pub is_subscribed: bool,
}

/// Credentials persisted between launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    /// Bearer token.
    pub token: String,
    /// Token used to obtain a new bearer token.
    pub refresh_token: Option<String>,
    /// Signed-in user.
    pub user: UserProfile,
}

/// Access to the credential and instrument keys of the device store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wrap the device store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a freshly obtained session.
    pub async fn save(&self, session: &StoredSession) -> StorageResult<()> {
        self.store.set(KEY_TOKEN, session.token.clone()).await?;
        match &session.refresh_token {
            Some(refresh) => self.store.set(KEY_REFRESH_TOKEN, refresh.clone()).await?,
            None => self.store.remove(KEY_REFRESH_TOKEN).await?,
        }
        write_json(self.store.as_ref(), KEY_USER, &session.user).await?;
        self.store.set(KEY_USER_ID, session.user.id.clone()).await
    }

    /// Load the stored session; a token without a readable user counts as signed out.
    pub async fn load(&self) -> StorageResult<Option<StoredSession>> {
        let Some(token) = self.store.get(KEY_TOKEN).await? else {
            return Ok(None);
        };
        let Some(user) = read_json::<UserProfile>(self.store.as_ref(), KEY_USER).await? else {
            return Ok(None);
        };
        let refresh_token = self.store.get(KEY_REFRESH_TOKEN).await?;

        Ok(Some(StoredSession {
            token,
            refresh_token,
            user,
        }))
    }

    /// Remove credentials. Instrument choices and guest stats are kept.
    pub async fn clear(&self) -> StorageResult<()> {
        for key in [KEY_TOKEN, KEY_REFRESH_TOKEN, KEY_USER, KEY_USER_ID] {
            self.store.remove(key).await?;
        }
        Ok(())
    }

    /// Remember the backend id of the instrument the player uses.
    pub async fn set_instrument_id(&self, instrument: Instrument, id: &str) -> StorageResult<()> {
        self.store.set(instrument_key(instrument), id.to_string()).await
    }

    /// Backend id of the instrument, if one was stored.
    pub async fn instrument_id(&self, instrument: Instrument) -> StorageResult<Option<String>> {
        self.store.get(instrument_key(instrument)).await
    }
}

fn instrument_key(instrument: Instrument) -> &'static str {
    match instrument {
        Instrument::Guitar => KEY_GUITAR_ID,
        Instrument::Piano => KEY_PIANO_ID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory_store::MemoryStore;

    fn session() -> StoredSession {
        StoredSession {
            token: "jwt".into(),
            refresh_token: Some("refresh".into()),
            user: UserProfile {
                id: "u-7".into(),
                email: "ear@example.com".into(),
                username: None,
                is_subscribed: false,
            },
        }
    }

    #[tokio::test]
    async fn clear_keeps_instrument_choice() {
        let memory = MemoryStore::new();
        let sessions = SessionStore::new(Arc::new(memory.clone()));

        sessions.save(&session()).await.unwrap();
        sessions
            .set_instrument_id(Instrument::Piano, "piano-1")
            .await
            .unwrap();
        assert_eq!(sessions.load().await.unwrap(), Some(session()));
        assert_eq!(memory.get(KEY_USER_ID).await.unwrap().as_deref(), Some("u-7"));

        sessions.clear().await.unwrap();
        assert_eq!(sessions.load().await.unwrap(), None);
        assert_eq!(
            sessions.instrument_id(Instrument::Piano).await.unwrap().as_deref(),
            Some("piano-1")
        );
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn token_without_user_is_signed_out() {
        let memory = MemoryStore::new();
        memory.set(KEY_TOKEN, "orphan".into()).await.unwrap();
        let sessions = SessionStore::new(Arc::new(memory));
        assert_eq!(sessions.load().await.unwrap(), None);
    }
}
