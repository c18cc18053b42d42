use aichat::config::{ServerConfig, load_dotenv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    aichat::server::serve(ServerConfig::from_env()).await
}
