use vetgate::server::build_router;
use vetgate::util::{env_bind_addr, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let state = AppState::from_env();
    let app = build_router(state);

    let addr = env_bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("vetgate listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
