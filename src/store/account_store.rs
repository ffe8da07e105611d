use crate::error::AppResult;
use crate::models::Account;
use chrono::Utc;
use sqlx::SqliteExecutor;

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> AppResult<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, student_name, balance, is_active, version, created_at, updated_at
        FROM accounts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Compare-and-swap claim on the account row. Issued as the first write of a
/// mutation transaction: a return of `false` means another mutation committed
/// since the caller read `expected_version`, and the whole unit must be
/// retried against fresh state.
pub async fn claim<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    expected_version: i64,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(expected_version)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Only valid after a successful [`claim`] in the same transaction.
pub async fn apply_balance<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    new_balance: i64,
) -> AppResult<()> {
    sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
        .bind(new_balance)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn create<'e>(
    executor: impl SqliteExecutor<'e>,
    student_name: &str,
    opening_balance: i64,
) -> AppResult<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (student_name, balance, is_active, version, created_at, updated_at)
        VALUES (?, ?, 1, 0, ?, ?)
        "#,
    )
    .bind(student_name)
    .bind(opening_balance)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Accounts are never deleted, only deactivated.
pub async fn deactivate<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> AppResult<bool> {
    let result = sqlx::query("UPDATE accounts SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_pool;

    #[tokio::test]
    async fn claim_succeeds_once_per_version() {
        let pool = setup_test_pool().await;
        let id = create(&*pool, "Siti", 0).await.unwrap();

        let account = find_by_id(&*pool, id).await.unwrap().unwrap();
        assert_eq!(account.version, 0);

        assert!(claim(&*pool, id, account.version).await.unwrap());
        // stale version loses
        assert!(!claim(&*pool, id, account.version).await.unwrap());

        let account = find_by_id(&*pool, id).await.unwrap().unwrap();
        assert_eq!(account.version, 1);
    }

    #[tokio::test]
    async fn deactivate_keeps_the_row() {
        let pool = setup_test_pool().await;
        let id = create(&*pool, "Budi", 1500).await.unwrap();

        assert!(deactivate(&*pool, id).await.unwrap());

        let account = find_by_id(&*pool, id).await.unwrap().unwrap();
        assert!(!account.is_active);
        assert_eq!(account.balance, 1500);
    }

    #[tokio::test]
    async fn find_unknown_returns_none() {
        let pool = setup_test_pool().await;
        assert!(find_by_id(&*pool, 999).await.unwrap().is_none());
    }
}
