//! Narrow persistence layer over the accounts, products and ledger tables.
//!
//! Mutating functions take any executor so they compose inside a single
//! `sqlx` transaction driven by the ledger service; nothing outside the
//! ledger service writes these tables.

pub mod account_store;
pub mod product_store;
pub mod transaction_store;
