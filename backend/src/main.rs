use std::sync::Arc;

use backend::{
    AppState, config::Config, create_router, dataset::TransitDataset, directions::OsrmClient,
    geocoding::NominatimClient,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=info,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let dataset = TransitDataset::from_files(&config.routes, &config.stops)?;
    tracing::info!(
        "loaded transit dataset from {} and {}",
        config.routes.display(),
        config.stops.display()
    );

    let geocoder = NominatimClient::new(&config.nominatim())?;
    let directions = OsrmClient::new(&config.osrm())?;
    tracing::info!(
        "geocoding via {}, directions via {}, {} units",
        config.nominatim_url,
        config.osrm_url,
        config.units
    );

    let state = AppState::new(
        Arc::new(dataset),
        Arc::new(geocoder),
        Arc::new(directions),
        config.units,
    );
    let app = create_router(state);

    tracing::info!("starting backend on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
