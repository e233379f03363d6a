pub mod http_client;
pub mod server;
pub mod sse;

pub use http_client::*;
pub use server::*;
pub use sse::*;
