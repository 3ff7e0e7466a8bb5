// This main function is the entry point when running `cargo run -p web-server`.
// It loads settings, installs logging and hands off to the crate's library.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = configuration::load_config()?;
    let _log_guard = configuration::init_tracing(&config.logging)?;
    web_server::run(config).await
}
