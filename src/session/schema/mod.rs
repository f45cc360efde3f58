//! Versioned on-disk session schemas
//!
//! Every schema the client has ever written is kept as its own plain data
//! types (`v1`, `v2`, `v3`). Loading detects the version tag, decodes the
//! payload with that version's types and walks the single-step `From`
//! conversions up to the current version before mapping into the domain
//! model. Migration is total: anything that decodes under its own schema
//! reaches the current version.
//!
//! | Version | Tag | Layout |
//! |---|---|---|
//! | v1 | absent | `messages[role, content]`, `working_files[path]` |
//! | v2 | `apiVersion: v2` | nested `aiServiceMessage`, checksums, `input_text` |
//! | v3 | `schemaVersion: v3` | camelCase keys, typed roles |

pub mod v1;
pub mod v2;
pub mod v3;

use crate::error::{CirError, Result};
use crate::session::WorkingSession;
use serde::Deserialize;
use std::fmt;

/// Closed set of known session schema versions, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
}

impl SchemaVersion {
    /// Version written by this build
    pub const CURRENT: SchemaVersion = SchemaVersion::V3;

    /// Tag string as stored in the file
    pub fn tag(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => v3::TAG,
        }
    }

    /// Resolve a stored tag
    ///
    /// An absent tag means the oldest version. A tag that names no known
    /// version cannot be downgraded safely and is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use cir::session::schema::SchemaVersion;
    ///
    /// assert_eq!(SchemaVersion::from_tag(None).unwrap(), SchemaVersion::V1);
    /// assert_eq!(SchemaVersion::from_tag(Some("v2")).unwrap(), SchemaVersion::V2);
    /// assert!(SchemaVersion::from_tag(Some("v99")).is_err());
    /// ```
    pub fn from_tag(tag: Option<&str>) -> Result<Self> {
        match tag.map(str::trim) {
            None => Ok(Self::V1),
            Some("v1") => Ok(Self::V1),
            Some("v2") => Ok(Self::V2),
            Some("v3") => Ok(Self::V3),
            Some(other) => Err(CirError::UnsupportedSchemaVersion(other.to_string()).into()),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reads only the version tags; every other key is ignored.
#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(rename = "schemaVersion", default)]
    schema_version: Option<String>,
    #[serde(rename = "apiVersion", default)]
    api_version: Option<String>,
}

/// A session payload decoded under the schema it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    V1(v1::WorkingSessionV1),
    V2(v2::WorkingSessionV2),
    V3(v3::WorkingSessionV3),
}

impl StoredSession {
    /// Detect the version tag and decode with that version's types
    ///
    /// # Errors
    ///
    /// `CirError::Parse` when the payload is malformed for its version,
    /// `CirError::UnsupportedSchemaVersion` for unknown tags
    pub fn parse(raw: &str) -> Result<Self> {
        let probe: VersionProbe = serde_yaml::from_str(raw)
            .map_err(|e| CirError::Parse(format!("unreadable session header: {}", e)))?;
        let tag = probe.schema_version.or(probe.api_version);
        let version = SchemaVersion::from_tag(tag.as_deref())?;

        let parse_error = |e: serde_yaml::Error| CirError::Parse(format!("{} schema: {}", version, e));
        let stored = match version {
            SchemaVersion::V1 => Self::V1(serde_yaml::from_str(raw).map_err(parse_error)?),
            SchemaVersion::V2 => Self::V2(serde_yaml::from_str(raw).map_err(parse_error)?),
            SchemaVersion::V3 => Self::V3(serde_yaml::from_str(raw).map_err(parse_error)?),
        };
        Ok(stored)
    }

    /// Schema version of the payload
    pub fn version(&self) -> SchemaVersion {
        match self {
            Self::V1(_) => SchemaVersion::V1,
            Self::V2(_) => SchemaVersion::V2,
            Self::V3(_) => SchemaVersion::V3,
        }
    }

    /// Apply one `Vn -> Vn+1` transform; the current version is a fixed point
    fn step(self) -> Self {
        match self {
            Self::V1(s) => Self::V2(s.into()),
            Self::V2(s) => Self::V3(s.into()),
            current @ Self::V3(_) => current,
        }
    }

    /// Migrate up to the current schema
    pub fn into_current(self) -> v3::WorkingSessionV3 {
        let mut stored = self;
        loop {
            match stored {
                Self::V3(current) => return current,
                older => {
                    let from = older.version();
                    stored = older.step();
                    tracing::debug!("Migrated session schema {} -> {}", from, stored.version());
                }
            }
        }
    }
}

/// Decode a stored session of any known version into the domain model
///
/// A blank payload decodes to an empty session.
pub fn decode(raw: &str) -> Result<WorkingSession> {
    if raw.trim().is_empty() {
        return Ok(WorkingSession::default());
    }
    let stored = StoredSession::parse(raw)?;
    if stored.version() != SchemaVersion::CURRENT {
        tracing::info!(
            "Session uses schema {}, migrating to {}",
            stored.version(),
            SchemaVersion::CURRENT
        );
    }
    Ok(stored.into_current().into())
}

/// Encode a session with the current schema
///
/// # Errors
///
/// `CirError::Storage` if a tracked path is not valid UTF-8; the file
/// format stores paths as text and cannot represent it.
pub fn encode(session: &WorkingSession) -> Result<String> {
    let paths = session.working_files.iter().chain(
        session
            .messages
            .iter()
            .flat_map(|m| m.included_working_files.iter()),
    );
    for file in paths {
        if file.path.to_str().is_none() {
            return Err(CirError::Storage(format!(
                "cannot store non UTF-8 path {}",
                file.path.display()
            ))
            .into());
        }
    }
    let dto = v3::WorkingSessionV3::from(session);
    Ok(serde_yaml::to_string(&dto).map_err(CirError::from)?)
}
