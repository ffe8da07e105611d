use crate::error::AppResult;
use crate::models::Product;
use chrono::Utc;
use sqlx::SqliteExecutor;

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> AppResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, unit_price, stock_quantity, is_active, created_at
        FROM products
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Conditional decrement: the stock check lives in the UPDATE itself so a
/// concurrent purchase can never drive stock negative. Returns `false` when
/// the remaining stock does not cover `quantity`.
pub async fn decrement_stock<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    quantity: i64,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?
        WHERE id = ? AND is_active = 1 AND stock_quantity >= ?
        "#,
    )
    .bind(quantity)
    .bind(id)
    .bind(quantity)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn create<'e>(
    executor: impl SqliteExecutor<'e>,
    name: &str,
    unit_price: i64,
    stock_quantity: i64,
) -> AppResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO products (name, unit_price, stock_quantity, is_active, created_at)
        VALUES (?, ?, ?, 1, ?)
        "#,
    )
    .bind(name)
    .bind(unit_price)
    .bind(stock_quantity)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}
