//! Provider selection — builds the configured completion backend.

use crate::azure::AzureDeploymentProvider;
use crate::openai_compat::OpenAiCompatProvider;
use lorebot_config::{OpenAiConfig, ProviderFlavor};
use lorebot_core::error::ProviderError;
use lorebot_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the provider described by the `[openai]` config section.
pub fn build_from_config(config: &OpenAiConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Arc<dyn Provider> = match config.flavor {
        ProviderFlavor::OpenAi => Arc::new(OpenAiCompatProvider::with_timeout(
            "openai",
            &config.base_url,
            &config.api_key,
            timeout,
        )),
        ProviderFlavor::Azure => {
            let api_version = config
                .api_version
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ProviderError::NotConfigured("azure flavor requires openai.api_version".into())
                })?;
            Arc::new(AzureDeploymentProvider::new(
                &config.base_url,
                &config.api_key,
                api_version,
                timeout,
            ))
        }
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config() -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".into(),
            model_name: "gpt-4o-mini".into(),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn default_flavor_builds_openai() {
        let provider = build_from_config(&openai_config()).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn azure_flavor_builds_deployment_provider() {
        let config = OpenAiConfig {
            flavor: ProviderFlavor::Azure,
            api_version: Some("2024-02-01".into()),
            ..openai_config()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "azure");
    }

    #[test]
    fn azure_without_version_is_rejected() {
        let config = OpenAiConfig {
            flavor: ProviderFlavor::Azure,
            ..openai_config()
        };
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
