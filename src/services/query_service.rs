//! Read-only projections over the committed ledger. Never writes, and only
//! ever observes committed state: queries run outside any mutation
//! transaction.

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AccountResponse, HistoryQuery, LedgerAudit, MAX_PAGE_SIZE, PaginatedResponse,
    PaginationParams, SummaryQuery, TransactionDetailResponse, TransactionResponse,
    TransactionSummary, TransactionType,
};
use crate::store::{account_store, transaction_store};
use std::collections::HashMap;

#[derive(Clone)]
pub struct QueryService {
    pool: DbPool,
}

impl QueryService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_account(&self, account_id: i64) -> AppResult<AccountResponse> {
        let account = account_store::find_by_id(&self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;
        Ok(AccountResponse::from(account))
    }

    /// Paginated transaction history, newest first. Purchase rows carry
    /// their line items priced as charged at the time of sale.
    pub async fn history(
        &self,
        account_id: i64,
        query: &HistoryQuery,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let pagination = PaginationParams::new(query.page, query.limit);
        let page = pagination.page.unwrap_or(1);
        let limit = pagination.get_limit();
        if page < 1 {
            return Err(AppError::ValidationError(
                "page must be at least 1".to_string(),
            ));
        }
        if limit < 1 || limit > MAX_PAGE_SIZE {
            return Err(AppError::ValidationError(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if let (Some(start), Some(end)) = (query.start, query.end)
            && start > end
        {
            return Err(AppError::ValidationError(
                "start must not be after end".to_string(),
            ));
        }

        // 404 for unknown accounts, distinct from "known account, no rows"
        account_store::find_by_id(&self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;

        let filter = transaction_store::HistoryFilter {
            account_id,
            start: query.start,
            end: query.end,
            transaction_type: query.transaction_type,
            limit,
            offset: pagination.get_offset(),
        };

        let total = transaction_store::count(&self.pool, &filter).await?;
        let transactions = transaction_store::list(&self.pool, &filter).await?;

        let purchase_ids: Vec<i64> = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Purchase)
            .map(|t| t.id)
            .collect();
        let mut details_by_transaction: HashMap<i64, Vec<TransactionDetailResponse>> =
            HashMap::new();
        for row in transaction_store::details_for(&self.pool, &purchase_ids).await? {
            details_by_transaction
                .entry(row.transaction_id)
                .or_default()
                .push(TransactionDetailResponse::from(row));
        }

        let items: Vec<TransactionResponse> = transactions
            .into_iter()
            .map(|transaction| {
                let line_items = details_by_transaction.remove(&transaction.id);
                let mut response = TransactionResponse::from(transaction);
                response.line_items = line_items;
                response
            })
            .collect();

        Ok(PaginatedResponse::new(items, page, limit, total))
    }

    /// Per-type and per-day aggregates for the reporting dashboards.
    pub async fn summary(&self, query: &SummaryQuery) -> AppResult<TransactionSummary> {
        if let (Some(start), Some(end)) = (query.start, query.end)
            && start > end
        {
            return Err(AppError::ValidationError(
                "start must not be after end".to_string(),
            ));
        }

        let by_type =
            transaction_store::summary_by_type(&self.pool, query.start, query.end).await?;
        let daily = transaction_store::summary_daily(&self.pool, query.start, query.end).await?;

        let total_transactions: i64 = by_type.iter().map(|t| t.count).sum();
        let total_amount: i64 = by_type.iter().map(|t| t.total_amount).sum();
        let average_amount = if total_transactions > 0 {
            total_amount as f64 / total_transactions as f64
        } else {
            0.0
        };

        Ok(TransactionSummary {
            total_transactions,
            total_amount,
            average_amount,
            by_type,
            daily,
        })
    }

    /// Replays the completed ledger and compares it with the stored balance.
    /// A `consistent: false` result means the ledger/balance invariant has
    /// been violated and needs operator attention.
    pub async fn audit_account(&self, account_id: i64) -> AppResult<LedgerAudit> {
        let account = account_store::find_by_id(&self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;

        let replay = transaction_store::replay_balance(&self.pool, account_id).await?;

        Ok(LedgerAudit {
            account_id,
            stored_balance: account.balance,
            replayed_balance: replay.replayed_balance,
            completed_transactions: replay.completed_transactions,
            consistent: replay.replayed_balance == account.balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PenaltyRequest, PurchaseLineItem, PurchaseRequest, TopUpRequest};
    use crate::services::LedgerService;
    use crate::test_utils::{seed_account, seed_product, setup_test_pool};
    use chrono::{Duration, Utc};

    async fn seed_history(pool: &DbPool) -> (i64, i64) {
        let account_id = seed_account(pool, "Siti", 0).await;
        let product_id = seed_product(pool, "Nasi Goreng", 6_000, 10).await;
        let ledger = LedgerService::new(pool.clone());

        for amount in [10_000, 5_000, 2_500] {
            ledger
                .top_up(
                    account_id,
                    TopUpRequest {
                        amount,
                        note: None,
                    },
                )
                .await
                .unwrap();
        }
        ledger
            .purchase(
                account_id,
                PurchaseRequest {
                    line_items: vec![PurchaseLineItem {
                        product_id,
                        quantity: 2,
                    }],
                    note: Some("lunch".to_string()),
                },
            )
            .await
            .unwrap();
        ledger
            .penalty(
                account_id,
                PenaltyRequest {
                    amount: 1_000,
                    note: None,
                },
            )
            .await
            .unwrap();

        (account_id, product_id)
    }

    #[tokio::test]
    async fn history_returns_newest_first_with_line_items() {
        let pool = setup_test_pool().await;
        let (account_id, product_id) = seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        let page = service
            .history(account_id, &HistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].transaction_type, TransactionType::Penalty);
        assert!(
            page.data
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );

        let purchase = page
            .data
            .iter()
            .find(|t| t.transaction_type == TransactionType::Purchase)
            .unwrap();
        assert_eq!(purchase.amount, 12_000);
        let line_items = purchase.line_items.as_ref().unwrap();
        assert_eq!(line_items.len(), 1);
        assert_eq!(line_items[0].product_id, product_id);
        assert_eq!(line_items[0].product_name, "Nasi Goreng");
        assert_eq!(line_items[0].unit_price, 6_000);
        assert_eq!(line_items[0].subtotal, 12_000);
    }

    #[tokio::test]
    async fn history_filters_by_type_and_date_range() {
        let pool = setup_test_pool().await;
        let (account_id, _) = seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        let topups = service
            .history(
                account_id,
                &HistoryQuery {
                    transaction_type: Some(TransactionType::Topup),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(topups.total, 3);
        assert!(
            topups
                .data
                .iter()
                .all(|t| t.transaction_type == TransactionType::Topup)
        );

        let in_range = service
            .history(
                account_id,
                &HistoryQuery {
                    start: Some(Utc::now() - Duration::hours(1)),
                    end: Some(Utc::now() + Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(in_range.total, 5);

        let future_only = service
            .history(
                account_id,
                &HistoryQuery {
                    start: Some(Utc::now() + Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(future_only.total, 0);
        assert!(future_only.data.is_empty());
    }

    #[tokio::test]
    async fn history_paginates_and_reads_are_idempotent() {
        let pool = setup_test_pool().await;
        let (account_id, _) = seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        let query = HistoryQuery {
            limit: Some(2),
            page: Some(2),
            ..Default::default()
        };
        let page = service.history(account_id, &query).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 2);

        // same filters, same result set
        let again = service.history(account_id, &query).await.unwrap();
        let ids: Vec<i64> = page.data.iter().map(|t| t.id).collect();
        let ids_again: Vec<i64> = again.data.iter().map(|t| t.id).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn history_rejects_bad_filters() {
        let pool = setup_test_pool().await;
        let (account_id, _) = seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        for query in [
            HistoryQuery {
                page: Some(0),
                ..Default::default()
            },
            HistoryQuery {
                limit: Some(0),
                ..Default::default()
            },
            HistoryQuery {
                limit: Some(MAX_PAGE_SIZE as u32 + 1),
                ..Default::default()
            },
            HistoryQuery {
                start: Some(Utc::now()),
                end: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            },
        ] {
            let err = service.history(account_id, &query).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }

        let err = service
            .history(999, &HistoryQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn summary_aggregates_by_type_and_day() {
        let pool = setup_test_pool().await;
        seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        let summary = service.summary(&SummaryQuery::default()).await.unwrap();
        assert_eq!(summary.total_transactions, 5);
        assert_eq!(summary.total_amount, 10_000 + 5_000 + 2_500 + 12_000 + 1_000);

        let topup = summary
            .by_type
            .iter()
            .find(|t| t.transaction_type == TransactionType::Topup)
            .unwrap();
        assert_eq!(topup.count, 3);
        assert_eq!(topup.total_amount, 17_500);

        // seeding may straddle a UTC midnight, so assert over the buckets
        assert!(!summary.daily.is_empty());
        let daily_count: i64 = summary.daily.iter().map(|d| d.count).sum();
        assert_eq!(daily_count, 5);
        let daily_amount: i64 = summary.daily.iter().map(|d| d.total_amount).sum();
        assert_eq!(daily_amount, summary.total_amount);
    }

    #[tokio::test]
    async fn audit_confirms_ledger_matches_balance() {
        let pool = setup_test_pool().await;
        let (account_id, _) = seed_history(&pool).await;
        let service = QueryService::new(pool.clone());

        let audit = service.audit_account(account_id).await.unwrap();
        assert!(audit.consistent);
        assert_eq!(audit.completed_transactions, 5);
        assert_eq!(audit.stored_balance, 17_500 - 12_000 - 1_000);
        assert_eq!(audit.replayed_balance, audit.stored_balance);
    }
}
