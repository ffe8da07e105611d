pub mod account;
pub mod report;

pub use account::account_config;
pub use report::report_config;
