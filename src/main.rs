use anyhow::Result;
use edumapa::{config::Config, server, state::AppState};

#[actix_web::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?.apply_args(&args)?;

    let state = AppState::load(&config).await?;
    let status = state.status();
    if !status.geo_loaded {
        tracing::warn!(detail = ?status.detail, "serving without the map");
    }

    server::serve(state, &config.host, config.port).await
}
