//! The single authority over balance mutation.
//!
//! Every operation is one atomic unit: read the account, open a transaction,
//! claim the account row with a version compare-and-swap as the first write,
//! apply balance (and stock and ledger) changes, commit. Losing the claim
//! means another mutation committed in between; the whole unit is retried
//! against fresh state a bounded number of times.

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    Account, PenaltyRequest, PurchaseRequest, TopUpRequest, TransactionReceipt, TransactionType,
};
use crate::store::{account_store, product_store, transaction_store};
use std::collections::HashSet;

/// Upper bound on claim retries before surfacing a conflict to the caller.
const MAX_RETRIES: u32 = 10;

#[derive(Clone)]
pub struct LedgerService {
    pool: DbPool,
}

impl LedgerService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Credits `amount` to the account and appends a completed `topup` row.
    pub async fn top_up(
        &self,
        account_id: i64,
        request: TopUpRequest,
    ) -> AppResult<TransactionReceipt> {
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "Top-up amount must be greater than 0".to_string(),
            ));
        }

        for _ in 0..MAX_RETRIES {
            let account = self.load_active(account_id).await?;
            let new_balance = account.balance.checked_add(request.amount).ok_or_else(|| {
                AppError::ValidationError("Top-up amount out of range".to_string())
            })?;

            let mut tx = self.pool.begin().await?;
            if !account_store::claim(&mut *tx, account_id, account.version).await? {
                tx.rollback().await?;
                continue;
            }

            account_store::apply_balance(&mut *tx, account_id, new_balance).await?;
            let transaction_id = transaction_store::insert(
                &mut *tx,
                &transaction_store::NewTransaction {
                    account_id,
                    transaction_type: TransactionType::Topup,
                    amount: request.amount,
                    note: request.note.as_deref(),
                    balance_after: new_balance,
                },
            )
            .await?;
            tx.commit().await?;

            log::info!(
                "Top-up of {} on account {account_id}, new balance {new_balance}",
                request.amount
            );
            return Ok(TransactionReceipt {
                transaction_id,
                new_balance,
            });
        }

        Err(AppError::ConcurrencyError(format!(
            "top-up on account {account_id} retried {MAX_RETRIES} times"
        )))
    }

    /// Debits the total of the line items and decrements each product's
    /// stock, all in one unit. Prices are re-read from the catalog at
    /// execution time; client-supplied prices are never trusted.
    pub async fn purchase(
        &self,
        account_id: i64,
        request: PurchaseRequest,
    ) -> AppResult<TransactionReceipt> {
        if request.line_items.is_empty() {
            return Err(AppError::ValidationError(
                "Purchase needs at least one line item".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for item in &request.line_items {
            if item.quantity <= 0 {
                return Err(AppError::ValidationError(format!(
                    "Quantity for product {} must be greater than 0",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(AppError::ValidationError(format!(
                    "Product {} appears more than once",
                    item.product_id
                )));
            }
        }

        for _ in 0..MAX_RETRIES {
            let account = self.load_active(account_id).await?;

            let mut tx = self.pool.begin().await?;
            if !account_store::claim(&mut *tx, account_id, account.version).await? {
                tx.rollback().await?;
                continue;
            }

            // price and stock under the claim
            let mut total: i64 = 0;
            let mut priced_items = Vec::with_capacity(request.line_items.len());
            for item in &request.line_items {
                let product = product_store::find_by_id(&mut *tx, item.product_id)
                    .await?
                    .filter(|p| p.is_active)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Product {} not found", item.product_id))
                    })?;

                if product.stock_quantity < item.quantity {
                    tx.rollback().await?;
                    return Err(AppError::InsufficientStock {
                        product_id: product.id,
                        available: product.stock_quantity,
                        requested: item.quantity,
                    });
                }

                let line_total = product
                    .unit_price
                    .checked_mul(item.quantity)
                    .and_then(|line| total.checked_add(line))
                    .ok_or_else(|| {
                        AppError::ValidationError("Purchase total out of range".to_string())
                    })?;
                total = line_total;
                priced_items.push((product.id, item.quantity, product.unit_price));
            }

            if total <= 0 {
                tx.rollback().await?;
                return Err(AppError::ValidationError(
                    "Purchase total must be greater than 0".to_string(),
                ));
            }
            if account.balance < total {
                tx.rollback().await?;
                return Err(AppError::InsufficientBalance {
                    balance: account.balance,
                    required: total,
                });
            }

            let mut stock_conflict = false;
            for (product_id, quantity, _) in &priced_items {
                if !product_store::decrement_stock(&mut *tx, *product_id, *quantity).await? {
                    stock_conflict = true;
                    break;
                }
            }
            if stock_conflict {
                // stock moved under us, re-run against fresh state
                tx.rollback().await?;
                continue;
            }

            let new_balance = account.balance - total;
            account_store::apply_balance(&mut *tx, account_id, new_balance).await?;
            let transaction_id = transaction_store::insert(
                &mut *tx,
                &transaction_store::NewTransaction {
                    account_id,
                    transaction_type: TransactionType::Purchase,
                    amount: total,
                    note: request.note.as_deref(),
                    balance_after: new_balance,
                },
            )
            .await?;
            for (product_id, quantity, unit_price) in &priced_items {
                transaction_store::insert_detail(
                    &mut *tx,
                    transaction_id,
                    *product_id,
                    *quantity,
                    *unit_price,
                )
                .await?;
            }
            tx.commit().await?;

            log::info!(
                "Purchase of {total} ({} items) on account {account_id}, new balance {new_balance}",
                priced_items.len()
            );
            return Ok(TransactionReceipt {
                transaction_id,
                new_balance,
            });
        }

        Err(AppError::ConcurrencyError(format!(
            "purchase on account {account_id} retried {MAX_RETRIES} times"
        )))
    }

    /// Administrative debit with no product. The balance may be driven to
    /// exactly 0 but never below it.
    pub async fn penalty(
        &self,
        account_id: i64,
        request: PenaltyRequest,
    ) -> AppResult<TransactionReceipt> {
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "Penalty amount must be greater than 0".to_string(),
            ));
        }

        for _ in 0..MAX_RETRIES {
            let account = self.load_active(account_id).await?;

            let mut tx = self.pool.begin().await?;
            if !account_store::claim(&mut *tx, account_id, account.version).await? {
                tx.rollback().await?;
                continue;
            }

            // the claim succeeded, so the balance read above is current
            if account.balance < request.amount {
                tx.rollback().await?;
                return Err(AppError::InsufficientBalance {
                    balance: account.balance,
                    required: request.amount,
                });
            }
            let new_balance = account.balance - request.amount;

            account_store::apply_balance(&mut *tx, account_id, new_balance).await?;
            let transaction_id = transaction_store::insert(
                &mut *tx,
                &transaction_store::NewTransaction {
                    account_id,
                    transaction_type: TransactionType::Penalty,
                    amount: request.amount,
                    note: request.note.as_deref(),
                    balance_after: new_balance,
                },
            )
            .await?;
            tx.commit().await?;

            log::info!(
                "Penalty of {} on account {account_id}, new balance {new_balance}",
                request.amount
            );
            return Ok(TransactionReceipt {
                transaction_id,
                new_balance,
            });
        }

        Err(AppError::ConcurrencyError(format!(
            "penalty on account {account_id} retried {MAX_RETRIES} times"
        )))
    }

    async fn load_active(&self, account_id: i64) -> AppResult<Account> {
        let account = account_store::find_by_id(&self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;
        if !account.is_active {
            return Err(AppError::AccountInactive(account_id));
        }
        Ok(account)
    }
}
