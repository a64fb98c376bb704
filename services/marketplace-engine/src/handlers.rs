use crate::errors::LedgerError;
use crate::metrics;
use crate::models::{DateRange, DepositRequest, Profile};
use crate::services::MarketplaceService;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Header carrying the id of the calling profile
pub const PROFILE_HEADER: &str = "profile_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start: String,
    pub end: String,
    pub limit: Option<i64>,
}

/// Parse a report bound given as RFC 3339 or as `YYYY-MM-DD`.
///
/// A bare date covers the whole day: the start bound is its first instant and
/// the end bound its last microsecond.
pub fn parse_date_bound(value: &str, bound: DateBound) -> Result<DateTime<Utc>, LedgerError> {
    let value = value.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDateRange(format!("unparsable date: {:?}", value)))?;

    let naive = match bound {
        DateBound::Start => date.and_hms_opt(0, 0, 0),
        DateBound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
    }
    .ok_or_else(|| LedgerError::InvalidDateRange(format!("unrepresentable date: {}", value)))?;

    Ok(Utc.from_utc_datetime(&naive))
}

fn report_range(query: &ReportQuery) -> Result<DateRange, LedgerError> {
    DateRange::new(
        parse_date_bound(&query.start, DateBound::Start)?,
        parse_date_bound(&query.end, DateBound::End)?,
    )
}

async fn acting_profile(
    req: &HttpRequest,
    service: &MarketplaceService,
) -> Result<Profile, LedgerError> {
    let profile_id = req
        .headers()
        .get(PROFILE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(LedgerError::Unauthorized)?;

    service.authenticate(profile_id).await
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "marketplace-engine",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Get a contract the caller is party to
pub async fn get_contract(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
    contract_id: web::Path<i64>,
) -> Result<HttpResponse, LedgerError> {
    let profile = acting_profile(&req, &service).await?;
    let contract = service
        .get_contract(contract_id.into_inner(), &profile.acting())
        .await?;

    Ok(HttpResponse::Ok().json(contract))
}

/// Non-terminated contracts of the caller
pub async fn list_contracts(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
) -> Result<HttpResponse, LedgerError> {
    let profile = acting_profile(&req, &service).await?;
    let contracts = service.list_contracts(&profile.acting()).await?;

    Ok(HttpResponse::Ok().json(contracts))
}

/// Unpaid jobs of the caller's in-progress contracts
pub async fn list_unpaid_jobs(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
) -> Result<HttpResponse, LedgerError> {
    let profile = acting_profile(&req, &service).await?;
    let jobs = service.list_unpaid_jobs(&profile.acting()).await?;

    Ok(HttpResponse::Ok().json(jobs))
}

/// Pay a job as the calling client
pub async fn pay_job(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
    job_id: web::Path<i64>,
) -> Result<HttpResponse, LedgerError> {
    let profile = acting_profile(&req, &service).await?;
    let receipt = service.pay_job(job_id.into_inner(), &profile.acting()).await?;

    Ok(HttpResponse::Ok().json(receipt))
}

/// Deposit into a client's balance
pub async fn deposit(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
    user_id: web::Path<i64>,
    request: web::Json<DepositRequest>,
) -> Result<HttpResponse, LedgerError> {
    acting_profile(&req, &service).await?;
    let receipt = service
        .deposit(user_id.into_inner(), request.into_inner().amount)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Deposit successful.",
        "deposit": receipt
    })))
}

/// Profession with the highest earnings in the window
pub async fn best_profession(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, LedgerError> {
    acting_profile(&req, &service).await?;
    let profession = service.best_profession(report_range(&query)?).await?;

    Ok(HttpResponse::Ok().json(json!({ "profession": profession })))
}

/// Clients that paid the most in the window
pub async fn best_clients(
    service: web::Data<Arc<MarketplaceService>>,
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, LedgerError> {
    acting_profile(&req, &service).await?;
    let clients = service
        .best_clients(report_range(&query)?, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "clients": clients })))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    match metrics::metrics_handler() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Failed to gather metrics",
            "details": e.to_string()
        })),
    }
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/contracts")
            .route("", web::get().to(list_contracts))
            .route("/{id}", web::get().to(get_contract)),
    )
    .service(
        web::scope("/jobs")
            .route("/unpaid", web::get().to(list_unpaid_jobs))
            .route("/{job_id}/pay", web::post().to(pay_job)),
    )
    .route("/balances/deposit/{user_id}", web::post().to(deposit))
    .service(
        web::scope("/admin")
            .route("/best-profession", web::get().to(best_profession))
            .route("/best-clients", web::get().to(best_clients)),
    )
    .route("/metrics", web::get().to(metrics_endpoint))
    .route("/health", web::get().to(health_check));
}
