pub mod config;
pub mod error;
pub mod health;
pub mod jsonrpc;
pub mod number;
pub mod tool;

pub use config::*;
pub use error::*;
pub use health::*;
pub use jsonrpc::*;
pub use number::*;
pub use tool::*;

/// Seconds since the Unix epoch with millisecond resolution, the timestamp
/// format used in every JSON document the server emits.
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
