use std::error::Error;

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Auth token of the signed-in user.
pub const KEY_TOKEN: &str = "token";
/// Refresh token of the signed-in user.
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
/// JSON profile of the signed-in user.
pub const KEY_USER: &str = "user";
/// Identifier of the signed-in user.
pub const KEY_USER_ID: &str = "userId";
/// Selected guitar instrument id.
pub const KEY_GUITAR_ID: &str = "guitarId";
/// Selected piano instrument id.
pub const KEY_PIANO_ID: &str = "pianoId";
/// Guest statistics, keyed by game mode.
pub const KEY_GUEST_GAME_STATS: &str = "guestGameStats";
/// Server stats mirrored per level for the signed-in user.
pub const KEY_USER_LEVEL_STATS: &str = "userLevelStats";

/// Error raised by storage backends regardless of where the bytes live.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A value could not be encoded.
    #[error("failed to encode value for `{key}`")]
    Encode {
        /// Key being written.
        key: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// On-device key-value storage holding string values.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
}

/// Read and decode a JSON value. Undecodable records are logged and treated as missing.
pub async fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(key, error = %err, "discarding undecodable stored value");
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
pub async fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> StorageResult<()>
where
    T: ?Sized + Serialize,
{
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, encoded).await
}
