//! # offerapp
//!
//! Headless launcher: opens the local store, restores the saved session and,
//! when someone is signed in, loads the first feed page.

use offerapp_client::config::ClientConfig;
use offerapp_client::navigation::Screen;
use offerapp_shared::constants::APP_NAME;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    offerapp_client::init_tracing();
    info!("Starting {APP_NAME} v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let app = offerapp_client::launch(config).await?;
    let theme = app.theme_view_model().await;
    let start = app.start_destination().await;
    info!(route = %start, dark_mode = theme.is_dark_mode(), "start destination");

    if start != Screen::Main {
        return Ok(());
    }
    let auth = app.auth_view_model().await;
    let Some(user) = auth.current_user() else {
        info!("saved session is no longer valid, login required");
        return Ok(());
    };

    let main = app.main_view_model(user);
    main.start().await;
    let state = main.snapshot()?;
    info!(
        user = %state.user.username,
        posts = state.posts.len(),
        exhausted = state.all_loaded,
        "feed loaded"
    );
    Ok(())
}
