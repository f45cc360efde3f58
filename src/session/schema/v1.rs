//! Schema v1: the untagged layout of the first releases.
//!
//! Messages store role and content at the top level; tracked files store
//! only a path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkingFileV1 {
    pub path: String,
    /// Present in files written by transitional builds; never read back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted_checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageV1 {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_working_files: Vec<WorkingFileV1>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkingSessionV1 {
    /// Explicit oldest-version tag; most v1 files carry none
    #[serde(rename = "schemaVersion", default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageV1>,
    #[serde(default)]
    pub working_files: Vec<WorkingFileV1>,
}
