pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod pivot;
pub mod query_schema;
pub mod recap;
pub mod record;
pub mod server;
pub mod store;
pub mod synthesis;
