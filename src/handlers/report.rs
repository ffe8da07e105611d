use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::{SummaryQuery, TransactionSummary};
use crate::services::QueryService;

#[utoipa::path(
    get,
    path = "/reports/transactions/summary",
    tag = "report",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Per-type and per-day transaction aggregates", body = TransactionSummary),
        (status = 400, description = "Bad filter")
    )
)]
pub async fn transaction_summary(
    query_service: web::Data<QueryService>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse> {
    match query_service.summary(&query).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn report_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports").route("/transactions/summary", web::get().to(transaction_summary)),
    );
}
