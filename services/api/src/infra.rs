use ecocredit::workflows::carbon::{
    CarbonCreditService, Clock, CreditSettings, InMemoryFootprintRepository,
    InMemoryWalletRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryCreditService =
    CarbonCreditService<InMemoryFootprintRepository, InMemoryWalletRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Engine over process-local stores; everything is lost on restart.
pub(crate) fn in_memory_service(settings: CreditSettings) -> Arc<MemoryCreditService> {
    Arc::new(CarbonCreditService::new(
        Arc::new(InMemoryFootprintRepository::default()),
        Arc::new(InMemoryWalletRepository::default()),
        settings,
    ))
}

pub(crate) fn in_memory_service_with_clock(
    settings: CreditSettings,
    clock: Arc<dyn Clock>,
) -> Arc<MemoryCreditService> {
    Arc::new(CarbonCreditService::with_clock(
        Arc::new(InMemoryFootprintRepository::default()),
        Arc::new(InMemoryWalletRepository::default()),
        settings,
        clock,
    ))
}
