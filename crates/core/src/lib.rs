pub mod config;
pub mod error;
pub mod types;
pub mod urlcanon;

pub use config::AppConfig;
pub use error::CrawlError;
pub use types::*;
pub use urlcanon::{canonicalize, host_of, in_scope, resolve_href};
