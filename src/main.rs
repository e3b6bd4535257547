use std::sync::Arc;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use home_dashboard::{
    api::{
        self,
        handlers::{AppState, ViewContext},
    },
    clock::SystemClock,
    config::Config,
    dashboard::{Dashboard, DashboardSettings},
    hub::HubClient,
    icons::IconMapping,
    view::ViewOptions,
    weather::WeatherClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let icons = IconMapping::load(
        config.icon_mapping_path.as_deref(),
        config.weather_provider,
        config.lang,
    )?;

    let hub = Arc::new(HubClient::new(&config)?);
    let weather = Arc::new(WeatherClient::new(&config)?);
    info!(
        hub = %config.hub_base_url,
        hub_mode = ?config.hub_mode,
        provider = ?config.weather_provider,
        "Clients ready"
    );

    let dashboard = Dashboard::mount(
        DashboardSettings::from(&config),
        hub,
        weather,
        Arc::new(SystemClock),
    )
    .await?;

    let state = AppState {
        display: dashboard.display(),
        view: Arc::new(ViewContext {
            options: ViewOptions::from(&config),
            icons,
            refresh_secs: config.time_interval_secs,
        }),
    };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    let served = axum::serve(listener, api::router(state, config.assets_dir.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    dashboard.teardown().await;
    served?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
