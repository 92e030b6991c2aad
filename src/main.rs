use std::sync::Arc;

use sap_portal::config::PortalConfig;
use sap_portal::odata::SapODataClient;
use sap_portal::rfc::{MockRfcConnector, RfcConnector};
use sap_portal::routes::{router, AppState};
use sap_portal::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PortalConfig::from_env()?;

    let log_format = std::env::var("LOG_FORMAT").ok();
    telemetry::init_tracing("info", telemetry::json_requested(log_format.as_deref()));

    let sap_service = SapODataClient::new(&config.sap)?;
    info!(url = %sap_service.entity_url(), "SAP OData client ready");

    let rfc = Arc::new(MockRfcConnector::new(config.rfc.clone()));
    rfc.connect().await;

    let state = AppState { work_orders: Arc::new(sap_service), rfc: rfc.clone() };
    let app = router(state, &config.server.allowed_origins);

    let listener = config.server.bind().await?;
    info!(addr = %listener.local_addr()?, "Starting SAP Portal API");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    rfc.disconnect().await;
    info!("SAP Portal API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
