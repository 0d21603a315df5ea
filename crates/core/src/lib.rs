// crates/core/src/lib.rs
pub mod backend;
pub mod bridge;
pub mod cancel;
pub mod config;
pub mod error;
pub mod graphql;
pub mod headers;
pub mod heartbeat;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod subscription;
pub mod types;

pub use backend::JobBackend;
pub use bridge::JobBridge;
pub use cancel::CancellationWatcher;
pub use config::*;
pub use error::*;
pub use graphql::GraphqlBackend;
pub use headers::*;
pub use heartbeat::Heartbeat;
pub use progress::*;
pub use registry::*;
pub use retry::*;
pub use subscription::*;
pub use types::*;
