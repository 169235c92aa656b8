use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryBlobStore, InMemoryHomologationStore, InMemoryPaymentStore,
    SandboxPaymentGateway, TracingAuditTrail,
};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use homologa::config::AppConfig;
use homologa::error::AppError;
use homologa::telemetry;
use homologa::workflows::homologation::{
    HomologationService, HomologationStore, PaymentReconciler, ServiceSettings, WorkflowState,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

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

    let homologations = Arc::new(InMemoryHomologationStore::default());
    let payments = Arc::new(InMemoryPaymentStore::default());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let gateway = Arc::new(SandboxPaymentGateway::default());
    let audit = Arc::new(TracingAuditTrail);

    let datastore_ready =
        probe_datastore(homologations.clone(), config.datastore.startup_timeout).await;

    let service = Arc::new(HomologationService::new(
        homologations.clone(),
        payments.clone(),
        blobs,
        gateway.clone(),
        audit,
        ServiceSettings {
            currency: config.payments.currency.clone(),
            notification_url: config.payments.notification_url.clone(),
        },
    ));
    let reconciler = Arc::new(PaymentReconciler::new(payments, homologations, gateway));

    let app = with_workflow_routes(WorkflowState { service, reconciler })
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(datastore_ready, Ordering::Release);

    info!(?config.environment, %addr, datastore_ready, "homologation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Bounded connectivity probe. A slow or unreachable datastore degrades the
/// readiness endpoint instead of aborting startup, so the deployment can
/// recover without a restart loop.
async fn probe_datastore<H>(store: Arc<H>, timeout: Duration) -> bool
where
    H: HomologationStore + 'static,
{
    let probe = tokio::task::spawn_blocking(move || store.ping());
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(err))) => {
            warn!(%err, "datastore probe failed; serving degraded");
            false
        }
        Ok(Err(join_err)) => {
            warn!(%join_err, "datastore probe panicked; serving degraded");
            false
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "datastore probe timed out; serving degraded");
            false
        }
    }
}
