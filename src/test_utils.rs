//! Shared test helpers: throwaway file-backed databases (so concurrency
//! tests exercise real multi-connection interleaving) and direct row
//! seeding that bypasses the service layer.

use crate::config::DatabaseConfig;
use crate::database::{DbPool, create_pool, run_migrations};
use crate::store::{account_store, product_store};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A migrated pool over a unique temp-dir database file. Derefs to the
/// pool; dropping it removes the file again.
pub(crate) struct TestDb {
    pool: DbPool,
    path: PathBuf,
}

impl Deref for TestDb {
    type Target = DbPool;

    fn deref(&self) -> &DbPool {
        &self.pool
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // WAL mode leaves -wal/-shm siblings next to the database file
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(file));
        }
    }
}

pub(crate) async fn setup_test_pool() -> TestDb {
    let n = DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "kantin-backend-test-{}-{n}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 8,
    };
    let pool = create_pool(&config).await.expect("create test pool");
    run_migrations(&pool).await.expect("run migrations");
    TestDb { pool, path }
}

pub(crate) async fn seed_account(pool: &DbPool, student_name: &str, balance: i64) -> i64 {
    account_store::create(pool, student_name, balance)
        .await
        .expect("seed account")
}

pub(crate) async fn seed_product(pool: &DbPool, name: &str, unit_price: i64, stock: i64) -> i64 {
    product_store::create(pool, name, unit_price, stock)
        .await
        .expect("seed product")
}
