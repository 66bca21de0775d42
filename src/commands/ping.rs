use bytes::Bytes;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

/// Handles the PING command.
///
/// Without arguments replies `PONG`, with one argument echoes it back (see
/// [`RespValue::echoed`]). With more than one argument the arity error is sent first
/// and the first argument is still echoed.
pub fn ping(arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let replies = match arguments {
        [] => vec![RespValue::SimpleString(Bytes::from_static(b"PONG"))],
        [message] => vec![RespValue::echoed(message.clone())],
        [message, ..] => vec![
            CommandError::WrongNumberOfArguments.as_resp(),
            RespValue::echoed(message.clone()),
        ],
    };

    Ok(CommandResult::Response(replies))
}
