pub mod config;
pub mod core;
pub mod events;
pub mod session;
pub mod transport;
pub mod utils;

// Re-export the surface most callers need
pub use config::AppConfig;
pub use crate::core::domain::{
    CompletionEvent, DeviceId, EventKind, SessionId, SessionState, TransferRequest, TransferResult,
};
pub use crate::core::error::{SendFileError, err_code};
pub use crate::core::traits::Transport;
pub use events::{EventDispatcher, ListenerId};
pub use session::{SessionHandle, TransferSessionManager};
pub use transport::LocalFsTransport;
