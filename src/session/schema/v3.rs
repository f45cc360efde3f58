//! Schema v3 (current): tagged with `schemaVersion: v3`, camelCase keys.

use super::v2::{MessageV2, WorkingFileV2, WorkingSessionV2};
use crate::session::{Message, Role, WorkingFile, WorkingSession};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const TAG: &str = "v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleV3 {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingFileV3 {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted_checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageV3 {
    pub role: RoleV3,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_working_files: Vec<WorkingFileV3>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSessionV3 {
    pub schema_version: String,
    #[serde(default)]
    pub messages: Vec<MessageV3>,
    #[serde(default)]
    pub working_files: Vec<WorkingFileV3>,
    #[serde(default)]
    pub input_text: String,
}

impl From<WorkingFileV2> for WorkingFileV3 {
    fn from(v2: WorkingFileV2) -> Self {
        Self {
            path: v2.path,
            last_submitted_checksum: v2.last_submitted_checksum,
        }
    }
}

/// Earlier builds stored service replies under the `system` role, and
/// files converted from v1 by those builds carry no role at all; a turn
/// with a question is then the user's.
fn legacy_role(role: &str, question: &str) -> RoleV3 {
    if role.trim().is_empty() && !question.is_empty() {
        return RoleV3::User;
    }
    match Role::parse_str(role) {
        Some(Role::User) => RoleV3::User,
        Some(Role::Assistant) | Some(Role::System) => RoleV3::Assistant,
        None => {
            tracing::warn!("Unknown legacy role '{}', treating as assistant", role);
            RoleV3::Assistant
        }
    }
}

impl From<MessageV2> for MessageV3 {
    fn from(v2: MessageV2) -> Self {
        let role = legacy_role(&v2.ai_service_message.role, &v2.question);
        // Converted v1 turns lost their prompt; the question is all that is left
        let content = if role == RoleV3::User && v2.ai_service_message.content.is_empty() {
            v2.question.clone()
        } else {
            v2.ai_service_message.content
        };
        Self {
            role,
            content,
            question: v2.question,
            included_working_files: v2
                .included_working_files
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<WorkingSessionV2> for WorkingSessionV3 {
    fn from(v2: WorkingSessionV2) -> Self {
        Self {
            schema_version: TAG.to_string(),
            messages: v2.messages.into_iter().map(Into::into).collect(),
            working_files: v2.working_files.into_iter().map(Into::into).collect(),
            input_text: v2.input_text,
        }
    }
}

// ============================================================================
// Domain mapping
// ============================================================================

impl From<RoleV3> for Role {
    fn from(role: RoleV3) -> Self {
        match role {
            RoleV3::User => Role::User,
            RoleV3::Assistant => Role::Assistant,
            RoleV3::System => Role::System,
        }
    }
}

impl From<Role> for RoleV3 {
    fn from(role: Role) -> Self {
        match role {
            Role::User => RoleV3::User,
            Role::Assistant => RoleV3::Assistant,
            Role::System => RoleV3::System,
        }
    }
}

impl From<WorkingFileV3> for WorkingFile {
    fn from(dto: WorkingFileV3) -> Self {
        WorkingFile {
            path: PathBuf::from(dto.path),
            last_submitted_checksum: dto.last_submitted_checksum,
            content: None,
        }
    }
}

impl From<&WorkingFile> for WorkingFileV3 {
    fn from(file: &WorkingFile) -> Self {
        Self {
            path: file.path.to_string_lossy().to_string(),
            last_submitted_checksum: file.last_submitted_checksum.clone(),
        }
    }
}

impl From<MessageV3> for Message {
    fn from(dto: MessageV3) -> Self {
        Message {
            role: dto.role.into(),
            content: dto.content,
            question: dto.question,
            included_working_files: dto
                .included_working_files
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<&Message> for MessageV3 {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
            question: message.question.clone(),
            included_working_files: message
                .included_working_files
                .iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<WorkingSessionV3> for WorkingSession {
    fn from(dto: WorkingSessionV3) -> Self {
        WorkingSession {
            messages: dto.messages.into_iter().map(Into::into).collect(),
            working_files: dto.working_files.into_iter().map(Into::into).collect(),
            input_text: dto.input_text,
        }
    }
}

/// Always stamps the current schema tag; file content has no field here.
impl From<&WorkingSession> for WorkingSessionV3 {
    fn from(session: &WorkingSession) -> Self {
        Self {
            schema_version: TAG.to_string(),
            messages: session.messages.iter().map(Into::into).collect(),
            working_files: session.working_files.iter().map(Into::into).collect(),
            input_text: session.input_text.clone(),
        }
    }
}
