use chrono::NaiveDate;
use his_core::config::AppConfig;
use his_core::error::AppError;
use his_core::store::Database;
use his_core::workflows::benefits::{
    BenefitsService, CorrespondenceTrigger, DispatchError, NoticeDispatcher,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Dispatcher used until a mail or print transport is wired in: every notice is
/// written to the log and counts as delivered.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNoticeDispatcher;

impl NoticeDispatcher for LoggingNoticeDispatcher {
    fn dispatch(&self, trigger: &CorrespondenceTrigger) -> Result<(), DispatchError> {
        info!(
            trigger_id = %trigger.id,
            case_number = %trigger.case_number,
            notice = %trigger.notice,
            "notice dispatched"
        );
        Ok(())
    }
}

pub(crate) type Service = BenefitsService<LoggingNoticeDispatcher>;

pub(crate) fn open_service(config: &AppConfig) -> Result<Arc<Service>, AppError> {
    let database = Database::open(&config.store)?;
    Ok(Arc::new(BenefitsService::new(
        database,
        Arc::new(LoggingNoticeDispatcher),
        config.eligibility,
    )))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
