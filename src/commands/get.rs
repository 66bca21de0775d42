use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue};

/// Handles the GET command.
///
/// Replies with the stored value as a bulk string, or the null bulk string
/// when the key was never set or has expired. Expired keys are deleted here.
pub async fn get(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: &[Bytes],
) -> Result<RespValue, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongNumberOfArguments);
    };

    let value = store.lock().await.get(key);

    Ok(match value {
        Some(data) => RespValue::BulkString(data),
        None => RespValue::NullBulkString,
    })
}
