use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A student's prepaid account. `version` is the optimistic-concurrency
/// counter: every committed balance mutation bumps it by one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub student_name: String,
    pub balance: i64,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i64,
    pub student_name: String,
    /// Current balance in the smallest currency unit
    pub balance: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            student_name: account.student_name,
            balance: account.balance,
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}
