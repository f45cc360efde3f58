//! Schema v2: tagged with `apiVersion: v2`.
//!
//! Role and content move under a nested `aiServiceMessage` mapping,
//! tracked files gain `last_submitted_checksum` and the draft question is
//! stored as `input_text`.

use super::v1::{MessageV1, WorkingFileV1, WorkingSessionV1};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessageV2 {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingFileV2 {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted_checksum: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageV2 {
    #[serde(rename = "aiServiceMessage", default)]
    pub ai_service_message: ServiceMessageV2,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_working_files: Vec<WorkingFileV2>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSessionV2 {
    #[serde(rename = "apiVersion", default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageV2>,
    #[serde(default)]
    pub working_files: Vec<WorkingFileV2>,
    #[serde(default)]
    pub input_text: String,
}

impl From<WorkingFileV1> for WorkingFileV2 {
    fn from(v1: WorkingFileV1) -> Self {
        // v1 never recorded what was submitted
        Self {
            path: v1.path,
            last_submitted_checksum: None,
        }
    }
}

impl From<MessageV1> for MessageV2 {
    fn from(v1: MessageV1) -> Self {
        Self {
            ai_service_message: ServiceMessageV2 {
                role: v1.role,
                content: v1.content,
            },
            question: v1.question,
            included_working_files: v1
                .included_working_files
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<WorkingSessionV1> for WorkingSessionV2 {
    fn from(v1: WorkingSessionV1) -> Self {
        Self {
            api_version: Some("v2".to_string()),
            messages: v1.messages.into_iter().map(Into::into).collect(),
            working_files: v1.working_files.into_iter().map(Into::into).collect(),
            input_text: String::new(),
        }
    }
}
