use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::{Buf, Bytes, BytesMut};
use redis_lite::{
    commands::{CommandError, CommandHandler, CommandResult},
    key_value_store::KeyValueStore,
    resp::{decode_reply, decode_snapshot, RespValue},
    server::{RedisRole, RedisServer},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{Mutex, RwLock},
    time::timeout,
};

pub const MASTER_REPL_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";
pub const REPLICA_REPL_ID: &str = "c673350b6868f3661bd1231ad1b5389310d0a201";

const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Test utilities for simplifying Redis command tests
pub struct TestUtils;

/// Test environment containing store and server identity
pub struct TestEnv {
    pub store: Arc<Mutex<KeyValueStore>>,
    pub server: Arc<RwLock<RedisServer>>,
}

impl TestEnv {
    /// Create a new test environment with a master server
    pub fn new_master_server() -> Self {
        Self::with_server(RedisServer {
            port: 6379,
            bind: [127, 0, 0, 1].into(),
            role: RedisRole::Master,
            repl_id: MASTER_REPL_ID.to_string(),
            repl_offset: 0,
            expiry_sweep_interval: None,
        })
    }

    /// Create a new test environment with a replica server
    pub fn new_replica_server(replica_port: u16) -> Self {
        Self::with_server(RedisServer {
            port: replica_port,
            bind: [127, 0, 0, 1].into(),
            role: RedisRole::Replica(("127.0.0.1".to_string(), 6379)),
            repl_id: REPLICA_REPL_ID.to_string(),
            repl_offset: 0,
            expiry_sweep_interval: None,
        })
    }

    fn with_server(server: RedisServer) -> Self {
        Self {
            store: Arc::new(Mutex::new(KeyValueStore::new())),
            server: Arc::new(RwLock::new(server)),
        }
    }

    /// Execute a command and return the result
    pub async fn exec_command(&self, command: &[&str]) -> Result<CommandResult, CommandError> {
        let command_handler = CommandHandler::new(TestUtils::command_parts(command));

        command_handler
            .handle_command(Arc::clone(&self.server), Arc::clone(&self.store))
            .await
    }

    /// Execute a command and assert it succeeds with the expected replies
    pub async fn exec_command_success_response(
        &self,
        command: &[&str],
        expected_response: Vec<RespValue>,
    ) {
        let result = self.exec_command(command).await;

        match result {
            Ok(CommandResult::Response(replies)) => assert_eq!(replies, expected_response),
            other => panic!("Expected response, got {:?}", other),
        }
    }

    /// Execute a command and assert it fails
    pub async fn exec_command_error_response(&self, command: &[&str], expected_error: CommandError) {
        let result = self.exec_command(command).await;
        assert_eq!(result, Err(expected_error));
    }

    /// Get a reference to the store for inspection
    pub async fn get_store(&self) -> tokio::sync::MutexGuard<'_, KeyValueStore> {
        self.store.lock().await
    }

    /// Serve every connection accepted on an ephemeral port with this environment
    pub async fn spawn_listener(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (store, server) = (Arc::clone(&self.store), Arc::clone(&self.server));

        tokio::spawn(async move {
            loop {
                let (stream, addr) = listener.accept().await.unwrap();
                tokio::spawn(redis_lite::connection::handle_client_connection(
                    stream,
                    Arc::clone(&server),
                    addr.to_string(),
                    Arc::clone(&store),
                ));
            }
        });

        address
    }
}

impl TestUtils {
    pub fn command_parts(tokens: &[&str]) -> Vec<Bytes> {
        tokens
            .iter()
            .map(|token| Bytes::copy_from_slice(token.as_bytes()))
            .collect()
    }

    pub fn simple_string(text: &str) -> RespValue {
        RespValue::SimpleString(Bytes::copy_from_slice(text.as_bytes()))
    }

    pub fn bulk_string(data: &str) -> RespValue {
        RespValue::BulkString(Bytes::copy_from_slice(data.as_bytes()))
    }

    /// Write a command to the stream as a RESP array of bulk strings
    pub async fn send_command(stream: &mut TcpStream, command: &[&str]) {
        stream
            .write_all(&RespValue::command(command).encode())
            .await
            .unwrap();
    }

    /// Read the next reply frame, failing the test if none arrives in time
    pub async fn read_reply(stream: &mut TcpStream, buffer: &mut BytesMut) -> RespValue {
        timeout(READ_TIMEOUT, async {
            loop {
                if let Some((reply, consumed)) = decode_reply(&buffer[..]).unwrap() {
                    buffer.advance(consumed);
                    return reply;
                }

                let read = stream.read_buf(&mut *buffer).await.unwrap();
                assert!(read > 0, "connection closed before a reply arrived");
            }
        })
        .await
        .expect("timed out waiting for reply")
    }

    /// Read a snapshot transfer (bulk header followed by raw bytes)
    pub async fn read_snapshot(stream: &mut TcpStream, buffer: &mut BytesMut) -> Bytes {
        timeout(READ_TIMEOUT, async {
            loop {
                if let Some((snapshot, consumed)) = decode_snapshot(&buffer[..]).unwrap() {
                    buffer.advance(consumed);
                    return snapshot;
                }

                let read = stream.read_buf(&mut *buffer).await.unwrap();
                assert!(read > 0, "connection closed before the snapshot arrived");
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    /// Send a command and assert the next reply
    pub async fn send_command_and_receive(
        stream: &mut TcpStream,
        buffer: &mut BytesMut,
        command: &[&str],
        expected: RespValue,
    ) {
        Self::send_command(stream, command).await;
        assert_eq!(Self::read_reply(stream, buffer).await, expected);
    }

    /// Assert the peer closes the connection without sending anything else
    pub async fn assert_closed(stream: &mut TcpStream) {
        let mut rest = Vec::new();
        let read = timeout(READ_TIMEOUT, stream.read_to_end(&mut rest))
            .await
            .expect("timed out waiting for close");

        match read {
            Ok(_) => assert!(rest.is_empty(), "unexpected bytes {:?}", rest),
            Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
        }
    }
}
