use super::anthropic::AnthropicGenerator;
use super::traits::Generator;
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use std::sync::Arc;

/// Build the reply generator named by `generation.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>, GenerationError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => Ok(Arc::new(AnthropicGenerator::new(config))),
        other => Err(GenerationError::UnknownProvider(other.to_string())),
    }
}
