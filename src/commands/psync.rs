//! PSYNC command implementation.
//!
//! Every PSYNC is answered with a full resynchronization: the master's
//! replication id and offset, followed by the static empty snapshot.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    commands::command_handler::CommandResult, rdb::EMPTY_RDB, resp::RespValue,
    server::RedisServer,
};

/// Handles the PSYNC command.
///
/// The requested replication id and offset are ignored since partial
/// resynchronization is not supported.
///
/// # Protocol Response
///
/// `+FULLRESYNC <repl_id> <offset>\r\n` then `$<len>\r\n<snapshot bytes>`
pub async fn psync(server: Arc<RwLock<RedisServer>>, arguments: &[Bytes]) -> CommandResult {
    let server_guard = server.read().await;

    info!(
        ?arguments,
        repl_id = %server_guard.repl_id,
        offset = server_guard.repl_offset,
        "starting full resynchronization"
    );

    CommandResult::Sync(vec![
        RespValue::SimpleString(Bytes::from(format!(
            "FULLRESYNC {} {}",
            server_guard.repl_id, server_guard.repl_offset
        ))),
        RespValue::RawBytes(Bytes::from_static(EMPTY_RDB)),
    ])
}
