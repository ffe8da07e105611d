use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credit: cash or admin-initiated balance load
    Topup,
    /// Debit: catalogued products, decrements stock
    Purchase,
    /// Debit: administrative deduction with no product
    Penalty,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Topup => write!(f, "topup"),
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Penalty => write!(f, "penalty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// One immutable ledger row. `amount` is the magnitude; the direction is
/// implied by `transaction_type`. `balance_after` is the account balance the
/// commit left behind, so the ledger can be replayed row by row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Purchase line item joined with the product name for display.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionDetailRow {
    pub transaction_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetailResponse {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    /// Price charged at the time of sale, not the current catalog price
    pub unit_price: i64,
    pub subtotal: i64,
}

impl From<TransactionDetailRow> for TransactionDetailResponse {
    fn from(row: TransactionDetailRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            subtotal: row.unit_price * row.quantity,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i64,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<TransactionDetailResponse>>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            status: transaction.status,
            note: transaction.note,
            balance_after: transaction.balance_after,
            created_at: transaction.created_at,
            line_items: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TopUpRequest {
    /// Amount to credit, in the smallest currency unit; must be positive
    pub amount: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseLineItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub line_items: Vec<PurchaseLineItem>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PenaltyRequest {
    pub amount: i64,
    pub note: Option<String>,
}

/// Outcome of a successful ledger operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionReceipt {
    pub transaction_id: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Inclusive lower bound, RFC 3339
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound, RFC 3339
    pub end: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TypeSummary {
    pub transaction_type: TransactionType,
    pub count: i64,
    pub total_amount: i64,
    pub average_amount: f64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DailySummary {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionSummary {
    pub total_transactions: i64,
    pub total_amount: i64,
    pub average_amount: f64,
    pub by_type: Vec<TypeSummary>,
    pub daily: Vec<DailySummary>,
}

/// Result of replaying the completed ledger against the stored balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerAudit {
    pub account_id: i64,
    pub stored_balance: i64,
    pub replayed_balance: i64,
    pub completed_transactions: i64,
    pub consistent: bool,
}
