use std::{ffi::OsString, net::IpAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use rand::{distributions::Alphanumeric, Rng};
use tokio::{
    net::TcpListener,
    sync::{Mutex, RwLock},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info};

use crate::{
    config::{parse_replica_of, Cli, CliError},
    connection::handle_client_connection,
    handshake::replicate_from_master,
    key_value_store::KeyValueStore,
};

pub const REPL_ID_LENGTH: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub enum RedisRole {
    Master,
    Replica((String, u16)),
    Sentinel,
}

impl RedisRole {
    /// Role name as reported by `INFO replication`.
    pub fn as_string(&self) -> &'static str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica(_) => "slave",
            RedisRole::Sentinel => "sentinel",
        }
    }
}

/// Identity and settings of one server process.
#[derive(Debug)]
pub struct RedisServer {
    pub port: u16,
    pub bind: IpAddr,
    pub role: RedisRole,
    pub repl_id: String,
    pub repl_offset: u64,
    pub expiry_sweep_interval: Option<Duration>,
}

impl RedisServer {
    /// Builds a server from process arguments (the first item is the program name).
    pub fn new<I, T>(command_line_args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(command_line_args)
            .map_err(|e| CliError::InvalidArguments(e.to_string()))?;

        Self::from_cli(cli)
    }

    pub fn from_cli(cli: Cli) -> Result<Self, CliError> {
        let role = match (&cli.replicaof, cli.sentinel) {
            (Some(replica_of), _) => RedisRole::Replica(parse_replica_of(replica_of)?),
            (None, true) => RedisRole::Sentinel,
            (None, false) => RedisRole::Master,
        };

        Ok(RedisServer {
            port: cli.port,
            bind: cli.bind,
            role,
            repl_id: generate_repl_id(),
            repl_offset: 0,
            expiry_sweep_interval: (cli.expiry_sweep_ms > 0)
                .then(|| Duration::from_millis(cli.expiry_sweep_ms)),
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.bind, self.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", self.bind, self.port))?;

        self.serve(listener).await
    }

    /// Accepts connections on `listener` until the process exits.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        self.serve_with_store(listener, Arc::new(Mutex::new(KeyValueStore::new())))
            .await
    }

    /// Like [`RedisServer::serve`], over a store owned by the caller.
    pub async fn serve_with_store(
        self,
        listener: TcpListener,
        store: Arc<Mutex<KeyValueStore>>,
    ) -> anyhow::Result<()> {
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;

        info!(
            %address,
            role = self.role.as_string(),
            repl_id = %self.repl_id,
            "server listening"
        );

        if let Some(period) = self.expiry_sweep_interval {
            tokio::spawn(sweep_expired_keys(Arc::clone(&store), period));
        }

        if let RedisRole::Replica((host, port)) = &self.role {
            tokio::spawn(replicate_from_master(host.clone(), *port, self.port));
        }

        let server = Arc::new(RwLock::new(self));

        loop {
            match listener.accept().await {
                Ok((stream, client_address)) => {
                    tokio::spawn(handle_client_connection(
                        stream,
                        Arc::clone(&server),
                        client_address.to_string(),
                        Arc::clone(&store),
                    ));
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    }
}

/// Random alphanumeric replication id, generated once per process.
pub fn generate_repl_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REPL_ID_LENGTH)
        .map(char::from)
        .collect()
}

async fn sweep_expired_keys(store: Arc<Mutex<KeyValueStore>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let removed = store.lock().await.remove_expired();
        if removed > 0 {
            debug!(removed, "swept expired keys");
        }
    }
}
