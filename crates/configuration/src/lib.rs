use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    ApiConfig, CacheConfig, ConsoleConfig, LoggingConfig, PageId, PollingConfig, Settings,
};

/// Prefix of the environment variables that override file settings,
/// e.g. `WATCHTOWER__API__BASE_URL`.
pub const ENV_PREFIX: &str = "WATCHTOWER";

/// Loads the application configuration.
///
/// Sources are layered: built-in defaults, then the TOML file, then the
/// environment. With no explicit `path`, an optional `watchtower.toml` in the
/// working directory is used if present.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("watchtower").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [api]
            base_url = "http://backend:9000"

            [polling]
            orders_ms = 1500

            [console]
            default_page = "orders"
            "#,
        );

        let settings = load_config(Some(file.path())).unwrap();
        assert_eq!(settings.api.base_url, "http://backend:9000");
        assert_eq!(settings.polling.orders_ms, 1500);
        assert_eq!(settings.polling.heartbeat_ms, 5_000);
        assert_eq!(settings.console.default_page, PageId::Orders);
        assert_eq!(settings.cache.retry, 1);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let file = write_config(
            r#"
            [polling]
            heartbeat_ms = 0
            "#,
        );

        match load_config(Some(file.path())) {
            Err(ConfigError::ValidationError(message)) => {
                assert!(message.contains("polling.heartbeat_ms"))
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here/watchtower.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn page_rotation_wraps_around() {
        assert_eq!(PageId::Overview.next(), PageId::Orders);
        assert_eq!(PageId::Logs.next(), PageId::Overview);
    }
}
