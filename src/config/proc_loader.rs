use std::path::Path;

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_initiator::initiate_default_values;
use crate::config::proc_validator;
use crate::config::service::ServiceConfig;
use crate::config::settings::LoggingConfig;
use crate::observability::metrics::get_metrics;

/// Load, normalize and validate config from a YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    // an empty document is a valid, all-defaults config
    let mut service_config: ServiceConfig = if content.trim().is_empty() {
        ServiceConfig::default()
    } else {
        serde_yaml::from_str(&content).inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })?
    };

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }
    service_config = initiate_default_values(service_config);

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("config is not valid: {}", errors.join("; ")))?;

    Ok(service_config)
}

/// Replace `${VAR}` / `${VAR:default}` with values from the process environment.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[tokio::test]
    async fn empty_document_yields_defaults() {
        let config = parse_config(String::new()).await.unwrap();
        assert_eq!(config.settings.server.port, 3000);
        assert_eq!(config.settings.server.api_prefix, "/api");
        assert_eq!(config.stocks.indices.len(), 6);
        assert_eq!(config.news.max_articles, 50);
        assert!(config.news.categories.contains_key("technology"));
        assert!(config.settings.logging.is_some());
    }

    #[tokio::test]
    async fn sections_override_defaults() {
        let yaml = r#"
settings:
  server:
    port: 8080
    api_prefix: "v1/"
news:
  max_articles: 5
  categories:
    Science:
      Nature: "https://www.nature.com/nature.rss"
stocks:
  indices:
    - symbol: "^N225"
      name: "Nikkei 225"
"#;
        let config = parse_config(yaml.to_owned()).await.unwrap();
        assert_eq!(config.settings.server.port, 8080);
        assert_eq!(config.settings.server.api_prefix, "/v1");
        assert_eq!(config.news.max_articles, 5);
        assert!(config.news.categories.contains_key("science"));
        assert_eq!(config.stocks.indices.len(), 1);
    }

    #[tokio::test]
    async fn invalid_config_lists_every_problem() {
        let yaml = r#"
qweather:
  token_ttl_seconds: 100
  renewal_margin_seconds: 200
stocks:
  indices: []
"#;
        let err = parse_config(yaml.to_owned()).await.unwrap_err().to_string();
        assert!(err.starts_with("config is not valid"), "{err}");
        assert!(err.contains("renewal_margin_seconds"), "{err}");
        assert!(err.contains("stocks.indices"), "{err}");
    }

    #[tokio::test]
    async fn ttl_beyond_the_signing_window_does_not_load() {
        let yaml = "qweather:\n  token_ttl_seconds: 18446744073709551615\n";
        let err = parse_config(yaml.to_owned()).await.unwrap_err().to_string();
        assert!(err.contains("qweather.token_ttl_seconds"), "{err}");
    }

    #[tokio::test]
    #[serial]
    async fn env_placeholders_are_expanded() {
        std::env::set_var("FORGE_TEST_PROJECT", "project-42");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "qweather:\n  project_id: \"${{FORGE_TEST_PROJECT}}\"\n  credential_id: \"${{FORGE_TEST_MISSING:cred-1}}\""
        )
        .unwrap();

        let config = file_to_config(file.path()).await.unwrap();
        assert_eq!(config.qweather.project_id, "project-42");
        assert_eq!(config.qweather.credential_id, "cred-1");
        std::env::remove_var("FORGE_TEST_PROJECT");
    }
}
