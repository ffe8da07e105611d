use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::{
    AccountResponse, HistoryQuery, LedgerAudit, PenaltyRequest, PurchaseRequest, TopUpRequest,
    TransactionReceipt,
};
use crate::services::{LedgerService, QueryService};

#[utoipa::path(
    post,
    path = "/accounts/{id}/topup",
    tag = "ledger",
    request_body = TopUpRequest,
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Balance credited", body = TransactionReceipt),
        (status = 400, description = "Invalid amount or inactive account"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn top_up(
    ledger_service: web::Data<LedgerService>,
    path: web::Path<i64>,
    request: web::Json<TopUpRequest>,
) -> Result<HttpResponse> {
    let account_id = path.into_inner();

    match ledger_service.top_up(account_id, request.into_inner()).await {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": receipt
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/accounts/{id}/purchase",
    tag = "ledger",
    request_body = PurchaseRequest,
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Purchase completed", body = TransactionReceipt),
        (status = 400, description = "Insufficient balance or stock"),
        (status = 404, description = "Account or product not found")
    )
)]
pub async fn purchase(
    ledger_service: web::Data<LedgerService>,
    path: web::Path<i64>,
    request: web::Json<PurchaseRequest>,
) -> Result<HttpResponse> {
    let account_id = path.into_inner();

    match ledger_service
        .purchase(account_id, request.into_inner())
        .await
    {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": receipt
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/accounts/{id}/penalty",
    tag = "ledger",
    request_body = PenaltyRequest,
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Penalty applied", body = TransactionReceipt),
        (status = 400, description = "Invalid amount or insufficient balance"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn penalty(
    ledger_service: web::Data<LedgerService>,
    path: web::Path<i64>,
    request: web::Json<PenaltyRequest>,
) -> Result<HttpResponse> {
    let account_id = path.into_inner();

    match ledger_service
        .penalty(account_id, request.into_inner())
        .await
    {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": receipt
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    tag = "account",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account with current balance", body = AccountResponse),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    query_service: web::Data<QueryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match query_service.get_account(path.into_inner()).await {
        Ok(account) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": account
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/accounts/{id}/transactions",
    tag = "account",
    params(
        ("id" = i64, Path, description = "Account id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Paginated transaction history"),
        (status = 400, description = "Bad filter"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_transactions(
    query_service: web::Data<QueryService>,
    path: web::Path<i64>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    match query_service.history(path.into_inner(), &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/accounts/{id}/audit",
    tag = "account",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Ledger replay compared with stored balance", body = LedgerAudit),
        (status = 404, description = "Account not found")
    )
)]
pub async fn audit(
    query_service: web::Data<QueryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match query_service.audit_account(path.into_inner()).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn account_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts")
            .route("/{id}/topup", web::post().to(top_up))
            .route("/{id}/purchase", web::post().to(purchase))
            .route("/{id}/penalty", web::post().to(penalty))
            .route("/{id}/transactions", web::get().to(get_transactions))
            .route("/{id}/audit", web::get().to(audit))
            .route("/{id}", web::get().to(get_account)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_account, seed_product, setup_test_pool};
    use actix_web::{App, http::StatusCode, test};

    macro_rules! spawn_app {
        ($pool:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(LedgerService::new($pool.clone())))
                    .app_data(web::Data::new(QueryService::new($pool.clone())))
                    .service(web::scope("/api/v1").configure(account_config)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn topup_roundtrip_over_http() {
        let pool = setup_test_pool().await;
        let account_id = seed_account(&pool, "Siti", 0).await;
        let app = spawn_app!(pool);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/accounts/{account_id}/topup"))
            .set_json(json!({ "amount": 10_000 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["new_balance"], json!(10_000));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/accounts/{account_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["balance"], json!(10_000));
    }

    #[actix_web::test]
    async fn error_kinds_map_to_status_codes() {
        let pool = setup_test_pool().await;
        let account_id = seed_account(&pool, "Budi", 1_000).await;
        let product_id = seed_product(&pool, "Nasi Goreng", 6_000, 5).await;
        let app = spawn_app!(pool);

        // unknown account -> 404
        let req = test::TestRequest::post()
            .uri("/api/v1/accounts/999/topup")
            .set_json(json!({ "amount": 100 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // non-positive amount -> 400 VALIDATION_ERROR
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/accounts/{account_id}/topup"))
            .set_json(json!({ "amount": -500 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
        assert!(body["error"].get("details").is_none());

        // insufficient balance -> 400 with the current balance in details
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/accounts/{account_id}/purchase"))
            .set_json(json!({
                "line_items": [{ "product_id": product_id, "quantity": 1 }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], json!("INSUFFICIENT_BALANCE"));
        assert_eq!(body["error"]["details"]["balance"], json!(1_000));
    }

    #[actix_web::test]
    async fn history_bad_filter_is_rejected() {
        let pool = setup_test_pool().await;
        let account_id = seed_account(&pool, "Rina", 0).await;
        let app = spawn_app!(pool);

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/v1/accounts/{account_id}/transactions?page=0"
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
