//! Provider module for pocketchat
//!
//! This module contains the streaming chat provider abstraction and its
//! implementations for data stream chat APIs and Ollama.

pub mod base;
pub mod data_stream;
pub mod ollama;

pub use base::{decode_text_stream, LineDecoder, LineOutcome, Provider, TextStream};
pub use data_stream::DataStreamProvider;
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::{PocketchatError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
/// * `provider_override` - Optional provider type replacing `config.provider_type`
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
///
/// # Examples
///
/// ```
/// use pocketchat::config::ProviderConfig;
/// use pocketchat::providers::create_provider;
///
/// let provider = create_provider(&ProviderConfig::default(), Some("ollama")).unwrap();
/// assert_eq!(provider.name(), "ollama");
/// ```
pub fn create_provider(
    config: &ProviderConfig,
    provider_override: Option<&str>,
) -> Result<Arc<dyn Provider>> {
    let provider_type = provider_override.unwrap_or(&config.provider_type);
    let timeout = Duration::from_secs(config.timeout_seconds);

    match provider_type {
        "data_stream" => Ok(Arc::new(DataStreamProvider::new(
            config.data_stream.clone(),
            timeout,
        )?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.ollama.clone(), timeout)?)),
        _ => Err(PocketchatError::Provider(format!(
            "Unknown provider type: {}",
            provider_type
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_default_provider() {
        let provider = create_provider(&ProviderConfig::default(), None).unwrap();
        assert_eq!(provider.name(), "data_stream");
    }

    #[test]
    fn test_create_provider_rejects_unknown_type() {
        let result = create_provider(&ProviderConfig::default(), Some("copilot"));
        let err = result.err().expect("expected an error");
        assert!(err.to_string().contains("Unknown provider type: copilot"));
    }
}
