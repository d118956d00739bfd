use user_accounts::{app, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("user_accounts=debug,axum=info,tower_http=info");

    let state = AppState::init().await?;
    let config = state.config.clone();

    let router = app::build_app(state);
    app::serve(router, &config).await
}
