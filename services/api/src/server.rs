use crate::cli::ServeArgs;
use crate::infra::{build_service, build_spreadsheet, load_catalog, AppState};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use taicc_readiness::config::AppConfig;
use taicc_readiness::error::AppError;
use taicc_readiness::telemetry;
use taicc_readiness::workflows::assessment::SessionStore;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(&config)?;
    let spreadsheet = build_spreadsheet(&config.integrations).await?;
    let service_config = config.clone();
    let service = tokio::task::spawn_blocking(move || {
        build_service(&service_config, catalog, spreadsheet)
    })
    .await
    .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    let sessions = Arc::new(SessionStore::new(config.assessment.session_ttl));

    let app = with_assessment_routes(Arc::new(service), sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        payment_enabled = config.assessment.payment.enabled,
        "ai readiness assessment ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
