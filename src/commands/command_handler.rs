use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::{
    commands::{
        command_error::CommandError, echo::echo, get::get, info::info, ping::ping, psync::psync,
        replconf::replconf, set::set,
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
};

/// The verbs this server understands.
#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Ping,
    Echo,
    Set,
    Get,
    Info,
    Replconf,
    Psync,
    Unknown(String),
}

impl Command {
    /// Matches a verb case-insensitively.
    pub fn from_verb(verb: &[u8]) -> Self {
        match verb.to_ascii_uppercase().as_slice() {
            b"PING" => Command::Ping,
            b"ECHO" => Command::Echo,
            b"SET" => Command::Set,
            b"GET" => Command::Get,
            b"INFO" => Command::Info,
            b"REPLCONF" => Command::Replconf,
            b"PSYNC" => Command::Psync,
            _ => Command::Unknown(String::from_utf8_lossy(verb).into_owned()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Replies to write back, in order.
    Response(Vec<RespValue>),
    /// Replies to write back, after which the connection turns into a replica stream.
    Sync(Vec<RespValue>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub command: Command,
    pub arguments: Vec<Bytes>,
}

impl CommandHandler {
    /// Splits a decoded frame into its verb and arguments. Arguments are kept verbatim.
    pub fn new(mut parts: Vec<Bytes>) -> Self {
        if parts.is_empty() {
            return Self {
                command: Command::Unknown(String::new()),
                arguments: Vec::new(),
            };
        }

        let verb = parts.remove(0);

        Self {
            command: Command::from_verb(&verb),
            arguments: parts,
        }
    }

    pub async fn handle_command(
        &self,
        server: Arc<RwLock<RedisServer>>,
        store: Arc<Mutex<KeyValueStore>>,
    ) -> Result<CommandResult, CommandError> {
        let reply = match &self.command {
            Command::Ping => return ping(&self.arguments),
            Command::Psync => return Ok(psync(server, &self.arguments).await),
            Command::Echo => echo(&self.arguments)?,
            Command::Set => set(store, &self.arguments).await?,
            Command::Get => get(store, &self.arguments).await?,
            Command::Info => info(server, &self.arguments).await?,
            Command::Replconf => replconf(&self.arguments),
            Command::Unknown(name) => {
                warn!(command = %name, "unknown command");
                return Err(CommandError::UnknownCommand(name.clone()));
            }
        };

        Ok(CommandResult::Response(vec![reply]))
    }
}
