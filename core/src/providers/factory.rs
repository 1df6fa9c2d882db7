use crate::config::Config;
use crate::error::TransportError;
use crate::providers::{AnthropicProvider, OpenAIProvider};
use crate::traits::Provider;

pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>, TransportError> {
    let provider_name = config.provider.as_deref().unwrap_or("anthropic");

    match provider_name.to_lowercase().as_str() {
        "anthropic" | "claude" => {
            let api_key = resolve_api_key_with_fallback(
                &["ANTHROPIC_API_KEY", "RELAY_ANTHROPIC_API_KEY"],
                &config.api_key,
            )?;
            let mut provider = AnthropicProvider::new(api_key)
                .with_model(config.model.clone())
                .with_max_tokens(config.max_tokens);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "RELAY_OPENAI_API_KEY"],
                &config.api_key,
            )?;
            let mut provider = OpenAIProvider::new(api_key)
                .with_model(config.model.clone())
                .with_max_tokens(config.max_tokens);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        _ => Err(TransportError::UnknownProvider(provider_name.to_string())),
    }
}

/// Environment first, then the key stored in the config file.
pub fn resolve_api_key_with_fallback(
    env_vars: &[&str],
    config_key: &str,
) -> Result<String, TransportError> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(TransportError::MissingApiKey(env_vars.join(" or ")))
    }
}
