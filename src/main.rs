use tracing_subscriber::EnvFilter;

use redis_lite::server::RedisServer;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let server = RedisServer::new(std::env::args())?;

    server.run().await
}
