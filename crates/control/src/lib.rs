pub mod dispatcher;
pub mod sessions;
pub mod tools;

pub use dispatcher::*;
pub use sessions::*;
pub use tools::*;
