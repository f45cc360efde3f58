//! Cir - terminal chat client with persistent sessions and file context
//!
//! This library provides the core of the `cir` binary: a durable,
//! versioned working session, a content differ that re-sends local files
//! only when they changed, and a streaming state machine that fills the
//! reply into the conversation as tokens arrive.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: domain model, versioned on-disk schemas and storage
//! - `context`: content differ and external file picker
//! - `prompt`: prompt rendering
//! - `providers`: streaming provider abstraction and OpenAI implementation
//! - `chat`: question submission, single in-flight gate, reply streaming
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use cir::chat::{ChatClient, NullObserver, Submission};
//! use cir::providers::create_provider;
//! use cir::session::YamlSessionStore;
//! use cir::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(&cir::config::default_config_path(), &Default::default())?;
//!     config.validate()?;
//!
//!     let storage = Arc::new(YamlSessionStore::new(config.session.resolved_path()));
//!     let provider = create_provider(&config.provider)?;
//!     let client = ChatClient::open(storage, provider, Arc::new(NullObserver))?;
//!
//!     if let Submission::Started(reply) = client.submit_question("What does main.rs do?").await? {
//!         reply.finished().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod session;

// Re-export commonly used types
pub use chat::{ChatClient, ChatObserver, Submission};
pub use config::Config;
pub use error::{CirError, Result};
pub use session::{Message, Role, WorkingFile, WorkingSession};

#[cfg(test)]
pub mod test_utils;
