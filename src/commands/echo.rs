use bytes::Bytes;

use crate::{commands::command_error::CommandError, resp::RespValue};

/// Handles the ECHO command.
///
/// Replies with the single argument as a simple string, or as a bulk string
/// when it contains CR or LF.
///
/// # Examples
///
/// ```ignore
/// let result = echo(&[Bytes::from("hello")]);
/// // Returns: Ok(RespValue::SimpleString("hello")), encoded as "+hello\r\n"
/// ```
pub fn echo(arguments: &[Bytes]) -> Result<RespValue, CommandError> {
    let [message] = arguments else {
        return Err(CommandError::WrongNumberOfArguments);
    };

    Ok(RespValue::echoed(message.clone()))
}
