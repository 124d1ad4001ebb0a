use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    File,
    Folder,
    Symlink,
    Unknown,
}

impl Default for PathType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Metadata for one filesystem entry, as reported by the sync engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PathItem {
    pub name: String,
    #[serde(default)]
    pub ptype: PathType,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_writer: Option<String>,
}

impl PathItem {
    /// Placeholder for a path the engine has not reported yet.
    pub fn unknown(path: &str) -> Self {
        let name = path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_string();
        Self {
            name,
            ptype: PathType::Unknown,
            size: 0,
            last_writer: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransferKey(pub String);

impl TransferKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Download,
    Upload,
}

/// Why a transfer is running. `None` marks background work that should not
/// surface any UI of its own.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferIntent {
    None,
    CameraRoll,
    Share,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    pub kind: TransferKind,
    #[serde(default = "TransferRecord::default_intent")]
    pub intent: TransferIntent,
    #[serde(default)]
    pub complete_portion: f32,
    #[serde(default)]
    pub end_estimate: Option<i64>,
    #[serde(default)]
    pub is_done: bool,
}

impl TransferRecord {
    fn default_intent() -> TransferIntent {
        TransferIntent::None
    }

    /// Sentinel used when no transfer matches; downstream formatting never
    /// has to handle absent data.
    pub fn empty() -> Self {
        Self {
            kind: TransferKind::Download,
            intent: TransferIntent::None,
            complete_portion: 0.0,
            end_estimate: None,
            is_done: false,
        }
    }
}

/// Splits a full path into its non-empty segments.
///
/// `"/loft/private/alice/doc.txt"` -> `["loft", "private", "alice", "doc.txt"]`.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
