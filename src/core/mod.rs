pub mod domain;
pub mod error;
pub mod traits;

pub use domain::*;
pub use error::{SendFileError, err_code};
pub use traits::Transport;
