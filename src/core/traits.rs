use async_trait::async_trait;

use super::domain::TransferRequest;
use super::error::SendFileError;

/// The external collaborator that moves bytes between devices.
///
/// The session manager validates and tracks sessions; everything on the wire
/// is behind this seam. A transport must eventually return: `Ok(())` for a
/// delivered request, or an error whose `err_code()` becomes the session's
/// terminal status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransferRequest) -> Result<(), SendFileError>;
}
