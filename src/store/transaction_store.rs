use crate::error::AppResult;
use crate::models::{
    DailySummary, Transaction, TransactionDetailRow, TransactionType, TypeSummary,
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

pub struct NewTransaction<'a> {
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub note: Option<&'a str>,
    pub balance_after: i64,
}

/// Read-side filter over committed ledger rows.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub account_id: i64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub transaction_type: Option<TransactionType>,
    pub limit: i64,
    pub offset: i64,
}

/// Appends a `completed` ledger row. Rows are never updated or deleted;
/// failed operations roll back before anything is durable.
pub async fn insert<'e>(
    executor: impl SqliteExecutor<'e>,
    new: &NewTransaction<'_>,
) -> AppResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions (account_id, transaction_type, amount, status, note, balance_after, created_at)
        VALUES (?, ?, ?, 'completed', ?, ?, ?)
        "#,
    )
    .bind(new.account_id)
    .bind(new.transaction_type)
    .bind(new.amount)
    .bind(new.note)
    .bind(new.balance_after)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_detail<'e>(
    executor: impl SqliteExecutor<'e>,
    transaction_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: i64,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_details (transaction_id, product_id, quantity, unit_price)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(transaction_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .execute(executor)
    .await?;

    Ok(())
}

fn push_history_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &HistoryFilter) {
    qb.push(" AND account_id = ");
    qb.push_bind(filter.account_id);
    if let Some(transaction_type) = filter.transaction_type {
        qb.push(" AND transaction_type = ");
        qb.push_bind(transaction_type);
    }
    // datetime() normalizes both sides, TEXT timestamps compare reliably
    if let Some(start) = filter.start {
        qb.push(" AND datetime(created_at) >= datetime(");
        qb.push_bind(start);
        qb.push(")");
    }
    if let Some(end) = filter.end {
        qb.push(" AND datetime(created_at) <= datetime(");
        qb.push_bind(end);
        qb.push(")");
    }
}

pub async fn list<'e>(
    executor: impl SqliteExecutor<'e>,
    filter: &HistoryFilter,
) -> AppResult<Vec<Transaction>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT id, account_id, transaction_type, amount, status, note, balance_after, created_at
        FROM transactions
        WHERE status = 'completed'
        "#,
    );
    push_history_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    qb.push_bind(filter.limit);
    qb.push(" OFFSET ");
    qb.push_bind(filter.offset);

    let rows = qb
        .build_query_as::<Transaction>()
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

pub async fn count<'e>(
    executor: impl SqliteExecutor<'e>,
    filter: &HistoryFilter,
) -> AppResult<i64> {
    let mut qb =
        QueryBuilder::new("SELECT COUNT(*) FROM transactions WHERE status = 'completed'");
    push_history_filters(&mut qb, filter);

    let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;

    Ok(total)
}

/// Line items for a page of transactions, joined with the product name.
pub async fn details_for<'e>(
    executor: impl SqliteExecutor<'e>,
    transaction_ids: &[i64],
) -> AppResult<Vec<TransactionDetailRow>> {
    if transaction_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::new(
        r#"
        SELECT td.transaction_id, td.product_id, p.name AS product_name, td.quantity, td.unit_price
        FROM transaction_details td
        JOIN products p ON p.id = td.product_id
        WHERE td.transaction_id IN (
        "#,
    );
    let mut separated = qb.separated(", ");
    for id in transaction_ids {
        separated.push_bind(*id);
    }
    qb.push(") ORDER BY td.transaction_id, td.id");

    let rows = qb
        .build_query_as::<TransactionDetailRow>()
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

fn push_date_range(
    qb: &mut QueryBuilder<'_, Sqlite>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) {
    if let Some(start) = start {
        qb.push(" AND datetime(created_at) >= datetime(");
        qb.push_bind(start);
        qb.push(")");
    }
    if let Some(end) = end {
        qb.push(" AND datetime(created_at) <= datetime(");
        qb.push_bind(end);
        qb.push(")");
    }
}

pub async fn summary_by_type<'e>(
    executor: impl SqliteExecutor<'e>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<Vec<TypeSummary>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT transaction_type,
               COUNT(*) AS count,
               SUM(amount) AS total_amount,
               AVG(amount) AS average_amount
        FROM transactions
        WHERE status = 'completed'
        "#,
    );
    push_date_range(&mut qb, start, end);
    qb.push(" GROUP BY transaction_type ORDER BY transaction_type");

    let rows = qb
        .build_query_as::<TypeSummary>()
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

pub async fn summary_daily<'e>(
    executor: impl SqliteExecutor<'e>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<Vec<DailySummary>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT date(created_at) AS date,
               COUNT(*) AS count,
               SUM(amount) AS total_amount
        FROM transactions
        WHERE status = 'completed'
        "#,
    );
    push_date_range(&mut qb, start, end);
    qb.push(" GROUP BY date(created_at) ORDER BY date(created_at)");

    let rows = qb
        .build_query_as::<DailySummary>()
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
pub struct LedgerReplay {
    pub replayed_balance: i64,
    pub completed_transactions: i64,
}

/// Replays the completed ledger for one account: credits minus debits.
pub async fn replay_balance<'e>(
    executor: impl SqliteExecutor<'e>,
    account_id: i64,
) -> AppResult<LedgerReplay> {
    let replay = sqlx::query_as::<_, LedgerReplay>(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN transaction_type = 'topup' THEN amount ELSE -amount END), 0)
                AS replayed_balance,
            COUNT(*) AS completed_transactions
        FROM transactions
        WHERE account_id = ? AND status = 'completed'
        "#,
    )
    .bind(account_id)
    .fetch_one(executor)
    .await?;

    Ok(replay)
}
