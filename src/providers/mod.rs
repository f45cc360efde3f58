//! Provider module for Cir
//!
//! This module contains the streaming chat provider abstraction and the
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;
pub mod sse;

pub use base::{ChatProvider, ServiceMessage, StreamEvent};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{CirError, Result};
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.openai.clone())?)),
        other => Err(CirError::Config(format!("Unknown provider type: {}", other)).into()),
    }
}
