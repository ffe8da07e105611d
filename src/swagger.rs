use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::account::top_up,
        handlers::account::purchase,
        handlers::account::penalty,
        handlers::account::get_account,
        handlers::account::get_transactions,
        handlers::account::audit,
        handlers::report::transaction_summary,
    ),
    components(
        schemas(
            AccountResponse,
            TransactionType,
            TransactionStatus,
            TransactionResponse,
            TransactionDetailResponse,
            TopUpRequest,
            PurchaseRequest,
            PurchaseLineItem,
            PenaltyRequest,
            TransactionReceipt,
            HistoryQuery,
            SummaryQuery,
            TransactionSummary,
            TypeSummary,
            DailySummary,
            LedgerAudit,
            ApiError,
        )
    ),
    tags(
        (name = "ledger", description = "Balance mutation API"),
        (name = "account", description = "Account and transaction history API"),
        (name = "report", description = "Reporting API"),
    ),
    info(
        title = "Kantin Backend API",
        version = "1.0.0",
        description = "School canteen prepaid wallet REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
