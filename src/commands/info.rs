use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{commands::CommandError, resp::RespValue, server::RedisServer};

#[derive(Debug, PartialEq)]
enum InfoSection {
    Replication,
}

pub struct InfoArguments {
    sections: Vec<InfoSection>,
}

impl InfoArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::WrongNumberOfArguments);
        }

        let mut sections = Vec::new();

        for argument in arguments {
            let section = if argument.eq_ignore_ascii_case(b"replication") {
                InfoSection::Replication
            } else {
                return Err(CommandError::UnknownSection(
                    String::from_utf8_lossy(argument).into_owned(),
                ));
            };

            if !sections.contains(&section) {
                sections.push(section);
            }
        }

        Ok(InfoArguments { sections })
    }
}

/// Handles the INFO command.
///
/// The `replication` section is a newline separated list of `field:value`
/// lines: `role`, `master_replid` and `master_repl_offset`.
pub async fn info(
    server: Arc<RwLock<RedisServer>>,
    arguments: &[Bytes],
) -> Result<RespValue, CommandError> {
    let info_arguments = InfoArguments::parse(arguments)?;

    let server_guard = server.read().await;
    let mut lines = Vec::new();

    for section in info_arguments.sections {
        match section {
            InfoSection::Replication => {
                lines.push(format!("role:{}", server_guard.role.as_string()));
                lines.push(format!("master_replid:{}", server_guard.repl_id));
                lines.push(format!("master_repl_offset:{}", server_guard.repl_offset));
            }
        }
    }

    Ok(RespValue::BulkString(Bytes::from(lines.join("\n"))))
}
