pub mod config;
pub mod focus;
pub mod forms;
pub mod navigation;
pub mod operations;
pub mod popup;
pub mod query_executor;
pub mod records;
pub mod statements;
