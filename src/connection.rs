use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{Mutex, RwLock},
};
use tracing::{debug, error, info, warn};

use crate::{
    commands::{CommandHandler, CommandResult},
    key_value_store::KeyValueStore,
    resp::{decode_command, RespValue},
    server::RedisServer,
};

/// Serves one client until it disconnects.
///
/// Commands are executed strictly in arrival order. Bytes of an incomplete
/// frame stay buffered until the rest arrives, and a frame that is still
/// incomplete when the peer closes is dropped without being executed. A
/// malformed frame gets a protocol error reply and closes the connection.
pub async fn handle_client_connection<S>(
    mut stream: S,
    server: Arc<RwLock<RedisServer>>,
    client_address: String,
    store: Arc<Mutex<KeyValueStore>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(client = %client_address, "client connected");

    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        match decode_command(&buffer) {
            Ok(Some((parts, consumed))) => {
                buffer.advance(consumed);

                let command_handler = CommandHandler::new(parts);
                debug!(client = %client_address, command = ?command_handler.command, "executing command");

                let replies = match command_handler
                    .handle_command(Arc::clone(&server), Arc::clone(&store))
                    .await
                {
                    Ok(CommandResult::Response(replies)) => replies,
                    Ok(CommandResult::Sync(replies)) => {
                        if let Err(e) = write_to_stream(&mut stream, &replies).await {
                            error!(client = %client_address, "error writing to stream: {}", e);
                            break;
                        }

                        serve_replica_stream(&mut stream, &client_address).await;
                        break;
                    }
                    Err(e) => vec![e.as_resp()],
                };

                if let Err(e) = write_to_stream(&mut stream, &replies).await {
                    error!(client = %client_address, "error writing to stream: {}", e);
                    break;
                }

                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(client = %client_address, "closing connection on protocol error: {}", e);

                if let Err(e) = write_to_stream(&mut stream, &[e.as_resp()]).await {
                    error!(client = %client_address, "error writing to stream: {}", e);
                }
                break;
            }
        }

        match stream.read_buf(&mut buffer).await {
            Ok(0) => {
                if !buffer.is_empty() {
                    debug!(
                        client = %client_address,
                        pending = buffer.len(),
                        "dropping incomplete command"
                    );
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(client = %client_address, "error reading from stream: {}", e);
                break;
            }
        }
    }

    info!(client = %client_address, "client disconnected");
}

/// Keeps a connection that completed PSYNC open until the replica leaves.
///
/// Nothing is propagated to the replica and whatever it sends is discarded.
async fn serve_replica_stream<S>(stream: &mut S, client_address: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(replica = %client_address, "replica attached");

    match tokio::io::copy(stream, &mut tokio::io::sink()).await {
        Ok(discarded) => debug!(replica = %client_address, discarded, "replica stream closed"),
        Err(e) => error!(replica = %client_address, "error reading replica stream: {}", e),
    }
}

async fn write_to_stream<W>(writer: &mut W, replies: &[RespValue]) -> tokio::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = Vec::new();
    for reply in replies {
        out.extend_from_slice(&reply.encode());
    }

    writer.write_all(&out).await?;
    writer.flush().await?;

    Ok(())
}
