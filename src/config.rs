//! Command line configuration.

use std::net::IpAddr;

use clap::Parser;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("invalid --replicaof value {0:?}, expected \"<host> <port>\"")]
    InvalidReplicaOf(String),
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "In-memory key-value server speaking RESP", long_about = None)]
pub struct Cli {
    /// Port to listen on. Also announced to the master when running as a replica.
    #[arg(long, default_value_t = 6379, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Address the listener binds to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Master to replicate from, e.g. "localhost 6379".
    #[arg(long, conflicts_with = "sentinel")]
    pub replicaof: Option<String>,

    /// Run with the sentinel role.
    #[arg(long)]
    pub sentinel: bool,

    /// Period of the background expiry sweep in milliseconds. 0 disables it.
    #[arg(long = "expiry-sweep-ms", default_value_t = 100)]
    pub expiry_sweep_ms: u64,
}

/// Splits a `--replicaof` value into host and port.
pub fn parse_replica_of(value: &str) -> Result<(String, u16), CliError> {
    let invalid = || CliError::InvalidReplicaOf(value.to_string());

    let mut parts = value.split_whitespace();
    let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let port = port.parse::<u16>().map_err(|_| invalid())?;
    if port == 0 {
        return Err(invalid());
    }

    Ok((host.to_string(), port))
}
