pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::ProcessError;
pub use jobs::ExtractionQueue;
pub use service::{InvoiceProcessor, ProcessOutcome};
