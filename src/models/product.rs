use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry referenced by purchase line items. Only the ledger service
/// mutates `stock_quantity`, and only inside a purchase unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_price: i64,
    pub stock_quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
