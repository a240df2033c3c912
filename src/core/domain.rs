use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use super::error::SendFileError;

/// Identifier of a remote device known to the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub id: String,
}

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl Serialize for DeviceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.id.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        Ok(DeviceId::new(id))
    }
}

/// Strongly typed session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One outbound transfer request: which device, which files, where they land.
///
/// The declared `file_count` must agree with both path lists; requests are
/// checked with [`TransferRequest::validate`] before any transport work starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub device_id: DeviceId,
    pub source_paths: Vec<String>,
    pub dest_paths: Vec<String>,
    pub file_count: u32,
}

impl TransferRequest {
    pub fn new(
        device_id: impl Into<DeviceId>,
        source_paths: Vec<String>,
        dest_paths: Vec<String>,
        file_count: u32,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            source_paths,
            dest_paths,
            file_count,
        }
    }

    /// Check the request shape invariant:
    /// `source_paths.len() == dest_paths.len() == file_count`, nothing empty.
    pub fn validate(&self) -> Result<(), SendFileError> {
        if self.device_id.is_empty() {
            return Err(SendFileError::EmptyDeviceId);
        }
        if self.source_paths.is_empty() || self.dest_paths.is_empty() {
            return Err(SendFileError::EmptyPathList);
        }
        if self.source_paths.len() != self.dest_paths.len()
            || self.source_paths.len() != self.file_count as usize
        {
            return Err(SendFileError::FileCountMismatch {
                sources: self.source_paths.len(),
                dests: self.dest_paths.len(),
                declared: self.file_count,
            });
        }
        Ok(())
    }

    /// Source/destination pairs in request order
    pub fn file_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.source_paths
            .iter()
            .map(String::as_str)
            .zip(self.dest_paths.iter().map(String::as_str))
    }
}

/// Terminal outcome of a transfer session.
///
/// Serialized field names follow the wire shape consumed by API clients:
/// `{ "errCode": .., "fileName": [..], "fileCount": .. }`. `file_names` is
/// only populated on the receiving side; a sender-side result carries an
/// empty list alongside the count of files it pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    #[serde(rename = "errCode")]
    pub err_code: i32,
    #[serde(rename = "fileName")]
    pub file_names: Vec<String>,
    #[serde(rename = "fileCount")]
    pub file_count: u32,
}

impl TransferResult {
    /// Sender-side success: no file list, just the count that went out
    pub fn sent(file_count: u32) -> Self {
        Self {
            err_code: 0,
            file_names: Vec::new(),
            file_count,
        }
    }

    /// Receiver-side success carrying the landed file names
    pub fn received(file_names: Vec<String>) -> Self {
        let file_count = file_names.len() as u32;
        Self {
            err_code: 0,
            file_names,
            file_count,
        }
    }

    pub fn failure(err_code: i32) -> Self {
        Self {
            err_code,
            file_names: Vec::new(),
            file_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.err_code == 0
    }
}

/// Direction tag of a completion event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "sendFinished")]
    SendFinished,
    #[serde(rename = "receiveFinished")]
    ReceiveFinished,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SendFinished => "sendFinished",
            EventKind::ReceiveFinished => "receiveFinished",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted once per session reaching a terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub result: TransferResult,
}

impl CompletionEvent {
    pub fn new(kind: EventKind, result: TransferResult) -> Self {
        Self { kind, result }
    }
}

/// Session lifecycle: `Created -> InProgress -> {Completed | Failed}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
    Failed { code: i32 },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed { .. })
    }
}

/// Bookkeeping entry for one tracked session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub device_id: DeviceId,
    pub file_count: u32,
    pub state: SessionState,
    pub started_at: SystemTime,
    pub completed_at: Option<SystemTime>,
}

impl SessionRecord {
    pub fn new(request: &TransferRequest) -> Self {
        Self {
            id: SessionId::new(),
            device_id: request.device_id.clone(),
            file_count: request.file_count,
            state: SessionState::Created,
            started_at: SystemTime::now(),
            completed_at: None,
        }
    }
}
