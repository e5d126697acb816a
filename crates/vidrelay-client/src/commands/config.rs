//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
///
/// Secret references are printed as written, never resolved.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including secret references and the store
/// backend settings.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    let store = config.resolved_store()?;
    store.build()?;
    println!("Store backend: {}", store.backend_name());
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and catalog file paths.
pub fn path(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!("catalog: {}", config.catalog.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidrelay_store::StoreConfig;

    fn http_config(url: &str, api_key: &str) -> ClientConfig {
        ClientConfig {
            store: StoreConfig::Http {
                url: url.into(),
                api_key: api_key.into(),
                timeout_secs: 30,
            },
            ..Default::default()
        }
    }

    #[test]
    fn validate_reports_bad_store_url() {
        let err = validate(&http_config("not a url", "key")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn validate_reports_empty_api_key() {
        let err = validate(&http_config("https://project.supabase.co", "")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&ClientConfig::default()).is_ok());
    }
}
