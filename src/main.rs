//! Tatak Norte Orders - cart, checkout and fulfilment service

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tataknorte_orders::http::{self, AppState, Backends};
use tataknorte_orders::services::{
    EventPublisher, InMemoryOrders, InMemoryProfiles, InMemorySellerApplications, NatsPublisher, NoopPublisher, PgStore, SimulatedCarrier, StaticLocations,
};
use tataknorte_orders::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let settings = Settings::from_env()?;

    let publisher: Arc<dyn EventPublisher> = match settings.nats_url.as_deref() {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(nats) => Arc::new(nats),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; domain events will be dropped");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };
    let locations = Arc::new(StaticLocations::bundled()?);
    let carrier = Arc::new(SimulatedCarrier::new());

    let backends = match settings.database_url.as_deref() {
        Some(url) => {
            let store = Arc::new(PgStore::connect(url).await?);
            Backends { profiles: store.clone(), orders: store.clone(), applications: store, locations, carrier, publisher }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Backends {
                profiles: Arc::new(InMemoryProfiles::new()), orders: Arc::new(InMemoryOrders::new()),
                applications: Arc::new(InMemorySellerApplications::new()), locations, carrier, publisher,
            }
        }
    };

    let port = settings.port;
    let app = http::router(AppState::new(settings, backends));
    tracing::info!("Tatak Norte orders listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
