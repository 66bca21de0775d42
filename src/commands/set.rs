use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue};

/// Represents the parsed arguments for the SET command
#[derive(Debug, PartialEq)]
pub struct SetArguments {
    /// The key to store the value under
    key: Bytes,
    /// The value to be stored
    value: Bytes,
    /// Time to live, from the `PX <milliseconds>` option
    ttl: Option<Duration>,
}

impl SetArguments {
    /// Parses `key value [PX milliseconds]`.
    ///
    /// The option name is matched case-insensitively. Any other trailing
    /// tokens are ignored, but a `PX` without a valid millisecond count is
    /// rejected so that nothing is stored with a bogus expiry.
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - If key or value is missing
    /// * `Err(CommandError::InvalidExpiration)` - If `PX` is not followed by an unsigned integer
    fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        let [key, value, options @ ..] = arguments else {
            return Err(CommandError::WrongNumberOfArguments);
        };

        let ttl = match options {
            [option, rest @ ..] if option.eq_ignore_ascii_case(b"px") => {
                let milliseconds = rest
                    .first()
                    .and_then(|raw| std::str::from_utf8(raw).ok())
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .ok_or(CommandError::InvalidExpiration)?;

                Some(Duration::from_millis(milliseconds))
            }
            _ => None,
        };

        Ok(Self {
            key: key.clone(),
            value: value.clone(),
            ttl,
        })
    }
}

/// Handles the SET command.
///
/// Stores the value, overwriting any previous entry and its expiry, and
/// replies `OK`.
pub async fn set(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: &[Bytes],
) -> Result<RespValue, CommandError> {
    let SetArguments { key, value, ttl } = SetArguments::parse(arguments)?;

    store.lock().await.set(key, value, ttl);

    Ok(RespValue::ok())
}
