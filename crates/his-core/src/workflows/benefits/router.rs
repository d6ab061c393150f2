use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;
use tracing::error;

use super::domain::{
    AccountId, AccountRole, ApplicationId, CaseNumber, CategoryId, ContactUpdate,
    NewApplication, NewCaseWorkerAccount, NewChild, NewEducation, NewIncome, NewPlan, PlanId,
    TriggerId,
};
use super::error::CaseError;
use super::outbox::NoticeDispatcher;
use super::reporting::{CaseStatusFilter, ReportExportError, ReportKind};
use super::service::BenefitsService;

type SharedService<D> = State<Arc<BenefitsService<D>>>;

/// JSON API over the case lifecycle, catalog, reports and maintenance operations.
pub fn benefits_router<D>(service: Arc<BenefitsService<D>>) -> Router
where
    D: NoticeDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_applications::<D>).post(register_application::<D>),
        )
        .route("/api/v1/applications/:application_id", get(application::<D>))
        .route(
            "/api/v1/applications/:application_id/contact",
            patch(update_contact::<D>),
        )
        .route("/api/v1/cases", post(open_case::<D>))
        .route("/api/v1/cases/:case_number", get(case_bundle::<D>))
        .route(
            "/api/v1/cases/:case_number/decisions",
            get(decision_history::<D>),
        )
        .route("/api/v1/cases/:case_number/income", post(submit_income::<D>))
        .route(
            "/api/v1/cases/:case_number/children",
            post(submit_child::<D>),
        )
        .route(
            "/api/v1/cases/:case_number/education",
            post(submit_education::<D>),
        )
        .route(
            "/api/v1/cases/:case_number/eligibility",
            post(run_eligibility::<D>),
        )
        .route("/api/v1/reports/:report", get(report::<D>))
        .route(
            "/api/v1/categories",
            get(list_categories::<D>).post(create_category::<D>),
        )
        .route(
            "/api/v1/categories/:category_id/active",
            patch(set_category_active::<D>),
        )
        .route("/api/v1/plans", get(list_plans::<D>).post(create_plan::<D>))
        .route(
            "/api/v1/plans/:plan_id/active",
            patch(set_plan_active::<D>),
        )
        .route(
            "/api/v1/accounts",
            get(list_accounts::<D>).post(create_account::<D>),
        )
        .route(
            "/api/v1/accounts/:account_id/active",
            patch(set_account_active::<D>),
        )
        .route(
            "/api/v1/triggers/:trigger_id/sent",
            post(mark_trigger_sent::<D>),
        )
        .route(
            "/api/v1/maintenance/reconcile",
            post(reconcile::<D>),
        )
        .with_state(service)
}

pub(crate) fn error_response(err: CaseError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(%err, "benefits request failed");
    }
    let payload = json!({
        "error": err.to_string(),
        "retryable": err.is_transient(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CaseError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Store calls block on the connection lock and SQLite; keep them off the async workers.
async fn on_blocking_pool<D, T, F>(
    service: Arc<BenefitsService<D>>,
    call: F,
) -> Result<T, Response>
where
    D: NoticeDispatcher + 'static,
    T: Send + 'static,
    F: FnOnce(&BenefitsService<D>) -> T + Send + 'static,
{
    task::spawn_blocking(move || call(&service))
        .await
        .map_err(|err| {
            error!(%err, "benefits store task failed");
            let payload = json!({
                "error": "internal error while accessing the case store",
                "retryable": false,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        })
}

async fn call<D, T, F>(service: Arc<BenefitsService<D>>, status: StatusCode, call: F) -> Response
where
    D: NoticeDispatcher + 'static,
    T: Serialize + Send + 'static,
    F: FnOnce(&BenefitsService<D>) -> Result<T, CaseError> + Send + 'static,
{
    match on_blocking_pool(service, call).await {
        Ok(result) => respond(status, result),
        Err(response) => response,
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApplicationListing {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

pub(crate) async fn list_applications<D>(
    State(service): SharedService<D>,
    Query(listing): Query<ApplicationListing>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.list_applications(listing.limit, listing.offset)
    })
    .await
}

pub(crate) async fn register_application<D>(
    State(service): SharedService<D>,
    Json(application): Json<NewApplication>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.register_application(&application)
    })
    .await
}

pub(crate) async fn application<D>(
    State(service): SharedService<D>,
    Path(application_id): Path<i64>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.application(ApplicationId(application_id))
    })
    .await
}

pub(crate) async fn update_contact<D>(
    State(service): SharedService<D>,
    Path(application_id): Path<i64>,
    Json(update): Json<ContactUpdate>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.update_application_contact(ApplicationId(application_id), &update)
    })
    .await
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenCaseRequest {
    application_id: ApplicationId,
    plan_id: PlanId,
}

pub(crate) async fn open_case<D>(
    State(service): SharedService<D>,
    Json(request): Json<OpenCaseRequest>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.open_case(request.application_id, request.plan_id)
    })
    .await
}

pub(crate) async fn case_bundle<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.case_bundle(CaseNumber(case_number))
    })
    .await
}

pub(crate) async fn decision_history<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.decision_history(CaseNumber(case_number))
    })
    .await
}

pub(crate) async fn submit_income<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
    Json(income): Json<NewIncome>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.submit_income(CaseNumber(case_number), &income)
    })
    .await
}

pub(crate) async fn submit_child<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
    Json(child): Json<NewChild>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.submit_child(CaseNumber(case_number), &child)
    })
    .await
}

pub(crate) async fn submit_education<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
    Json(education): Json<NewEducation>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.submit_education(CaseNumber(case_number), &education)
    })
    .await
}

pub(crate) async fn run_eligibility<D>(
    State(service): SharedService<D>,
    Path(case_number): Path<i64>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.run_eligibility(CaseNumber(case_number))
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportFormat {
    #[serde(default)]
    format: Option<String>,
}

pub(crate) async fn report<D>(
    State(service): SharedService<D>,
    Path(report): Path<String>,
    Query(filter): Query<CaseStatusFilter>,
    Query(format): Query<ReportFormat>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    let kind = match report.parse::<ReportKind>() {
        Ok(kind) => kind,
        Err(message) => {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
        }
    };

    let as_csv = match format.format.as_deref() {
        None | Some("json") => false,
        Some("csv") => true,
        Some(other) => {
            let payload = json!({ "error": format!("unsupported report format '{other}'") });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    let rendered = on_blocking_pool(service, move |service| {
        if as_csv {
            return csv_response(service.reports().export_csv(kind, &filter));
        }
        match kind {
            ReportKind::CaseStatus => respond(StatusCode::OK, service.case_status_report(&filter)),
            ReportKind::StateDemographics => {
                respond(StatusCode::OK, service.state_demographics_report())
            }
            ReportKind::PendingTriggers => {
                respond(StatusCode::OK, service.pending_trigger_report(filter.limit))
            }
        }
    })
    .await;

    match rendered {
        Ok(response) | Err(response) => response,
    }
}

fn csv_response(result: Result<String, ReportExportError>) -> Response {
    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(ReportExportError::Query(err)) => error_response(err),
        Err(err @ ReportExportError::Encode(_)) => {
            error!(%err, "report export failed");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewCategory {
    name: String,
}

pub(crate) async fn create_category<D>(
    State(service): SharedService<D>,
    Json(category): Json<NewCategory>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.create_category(&category.name)
    })
    .await
}

pub(crate) async fn list_categories<D>(State(service): SharedService<D>) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, |service| service.list_categories()).await
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveFlag {
    active: bool,
}

pub(crate) async fn set_category_active<D>(
    State(service): SharedService<D>,
    Path(category_id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.set_category_active(CategoryId(category_id), flag.active)
    })
    .await
}

pub(crate) async fn create_plan<D>(
    State(service): SharedService<D>,
    Json(plan): Json<NewPlan>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.create_plan(&plan)
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlanListing {
    #[serde(default)]
    active_only: bool,
}

pub(crate) async fn list_plans<D>(
    State(service): SharedService<D>,
    Query(listing): Query<PlanListing>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.list_plans(listing.active_only)
    })
    .await
}

pub(crate) async fn set_plan_active<D>(
    State(service): SharedService<D>,
    Path(plan_id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.set_plan_active(PlanId(plan_id), flag.active)
    })
    .await
}

pub(crate) async fn create_account<D>(
    State(service): SharedService<D>,
    Json(account): Json<NewCaseWorkerAccount>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::CREATED, move |service| {
        service.create_account(&account)
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccountListing {
    #[serde(default)]
    role: Option<AccountRole>,
}

pub(crate) async fn list_accounts<D>(
    State(service): SharedService<D>,
    Query(listing): Query<AccountListing>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.list_accounts(listing.role)
    })
    .await
}

pub(crate) async fn set_account_active<D>(
    State(service): SharedService<D>,
    Path(account_id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.set_account_active(AccountId(account_id), flag.active)
    })
    .await
}

pub(crate) async fn mark_trigger_sent<D>(
    State(service): SharedService<D>,
    Path(trigger_id): Path<i64>,
) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, move |service| {
        service.mark_trigger_sent(TriggerId(trigger_id))
    })
    .await
}

pub(crate) async fn reconcile<D>(State(service): SharedService<D>) -> Response
where
    D: NoticeDispatcher + 'static,
{
    call(service, StatusCode::OK, |service| service.reconcile()).await
}
