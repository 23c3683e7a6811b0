pub mod advisory;
pub mod config;
pub mod db;
pub mod discord;
pub mod environment;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod rss;
pub mod sanitize;

pub use advisory::Advisory;
pub use error::{Result, WatchError};

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
