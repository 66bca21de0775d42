use thiserror::Error;

use crate::resp::RespValue;

/// Per-command failures. Reported to the client, the connection keeps going.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("wrong number of arguments for command")]
    WrongNumberOfArguments,
    #[error("unknown command")]
    UnknownCommand(String),
    #[error("unknown section")]
    UnknownSection(String),
    #[error("value is not an integer or out of range")]
    InvalidExpiration,
}

impl CommandError {
    pub fn as_resp(&self) -> RespValue {
        RespValue::Error(format!("ERR {}", self))
    }
}
