pub mod account;
pub mod common;
pub mod pagination;
pub mod product;
pub mod transaction;

pub use account::*;
pub use common::*;
pub use pagination::*;
pub use product::*;
pub use transaction::*;
