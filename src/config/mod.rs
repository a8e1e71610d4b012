//! Settings for reaching the table service.
//!
//! [`Config`] is resolved once at process start through [`ConfigBuilder`]. Explicit
//! values take precedence; anything still unset is looked up in the environment when
//! [`ConfigBuilder::with_env`] is used.

use std::env;
use thiserror::Error;

pub const ENDPOINT_VAR: &str = "CONFIGURATION__TABLES__ENDPOINT";
pub const TABLE_NAME_VAR: &str = "CONFIGURATION__TABLES__TABLENAME";
pub const REGION_VAR: &str = "CONFIGURATION__TABLES__REGION";
pub const PAGE_SIZE_VAR: &str = "CONFIGURATION__TABLES__PAGESIZE";

/// Table used when no table name is configured.
pub const DEFAULT_TABLE_NAME: &str = "cosmicworks-products";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("Invalid value for {setting}: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    endpoint: String,
    table_name: String,
    region: Option<String>,
    page_size: Option<i32>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Shorthand for `Config::builder().with_env().build()`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().with_env().build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Maximum number of entities requested per scan page.
    pub fn page_size(&self) -> Option<i32> {
        self.page_size
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    endpoint: Option<String>,
    table_name: Option<String>,
    region: Option<String>,
    page_size: Option<String>,
}

impl ConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size.to_string());
        self
    }

    /// Fill every unset field from the process environment.
    pub fn with_env(self) -> Self {
        self.with_lookup(|name| env::var(name).ok())
    }

    /// Fill every unset field from `lookup`, called with the setting's variable name.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fill = |current: Option<String>, name: &str| -> Option<String> {
            non_empty(current).or_else(|| non_empty(lookup(name)))
        };

        self.endpoint = fill(self.endpoint, ENDPOINT_VAR);
        self.table_name = fill(self.table_name, TABLE_NAME_VAR);
        self.region = fill(self.region, REGION_VAR);
        self.page_size = fill(self.page_size, PAGE_SIZE_VAR);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let endpoint = non_empty(self.endpoint).ok_or(ConfigError::MissingSetting(ENDPOINT_VAR))?;

        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                setting: ENDPOINT_VAR,
                reason: format!("expected an http:// or https:// URL, got '{endpoint}'"),
            });
        }

        let page_size = non_empty(self.page_size)
            .map(|value| match value.trim().parse::<i32>() {
                Ok(size) if size > 0 => Ok(size),
                _ => Err(ConfigError::Invalid {
                    setting: PAGE_SIZE_VAR,
                    reason: format!("expected a positive integer, got '{value}'"),
                }),
            })
            .transpose()?;

        Ok(Config {
            endpoint,
            table_name: non_empty(self.table_name).unwrap_or_else(|| DEFAULT_TABLE_NAME.into()),
            region: non_empty(self.region),
            page_size,
        })
    }
}

// An empty value counts as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_default_table_name() {
        let config = Config::builder()
            .with_lookup(lookup(&[(ENDPOINT_VAR, "http://localhost:8000")]))
            .build()
            .expect("Failed to build config");

        assert_eq!(config.endpoint(), "http://localhost:8000");
        assert_eq!(config.table_name(), DEFAULT_TABLE_NAME);
        assert_eq!(config.region(), None);
        assert_eq!(config.page_size(), None);
    }

    #[test]
    fn test_missing_endpoint() {
        let result = Config::builder()
            .with_lookup(lookup(&[(TABLE_NAME_VAR, "products")]))
            .build();

        assert_eq!(result, Err(ConfigError::MissingSetting(ENDPOINT_VAR)));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let result = Config::builder()
            .with_lookup(lookup(&[(ENDPOINT_VAR, ""), (TABLE_NAME_VAR, "")]))
            .build();
        assert_eq!(result, Err(ConfigError::MissingSetting(ENDPOINT_VAR)));

        let config = Config::builder()
            .endpoint("https://tables.example.com")
            .with_lookup(lookup(&[(TABLE_NAME_VAR, "  ")]))
            .build()
            .expect("Failed to build config");
        assert_eq!(config.table_name(), DEFAULT_TABLE_NAME);
    }

    #[test]
    fn test_explicit_values_take_precedence() {
        let config = Config::builder()
            .endpoint("https://explicit.example.com")
            .table_name("explicit")
            .with_lookup(lookup(&[
                (ENDPOINT_VAR, "http://env:8000"),
                (TABLE_NAME_VAR, "from-env"),
                (REGION_VAR, "ap-southeast-2"),
                (PAGE_SIZE_VAR, "25"),
            ]))
            .build()
            .expect("Failed to build config");

        assert_eq!(config.endpoint(), "https://explicit.example.com");
        assert_eq!(config.table_name(), "explicit");
        assert_eq!(config.region(), Some("ap-southeast-2"));
        assert_eq!(config.page_size(), Some(25));
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = Config::builder().endpoint("localhost:8000").build();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                setting: ENDPOINT_VAR,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_page_size() {
        for value in ["0", "-3", "many"] {
            let result = Config::builder()
                .endpoint("http://localhost:8000")
                .with_lookup(lookup(&[(PAGE_SIZE_VAR, value)]))
                .build();

            assert!(
                matches!(
                    result,
                    Err(ConfigError::Invalid {
                        setting: PAGE_SIZE_VAR,
                        ..
                    })
                ),
                "page size {value} should be rejected"
            );
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var(ENDPOINT_VAR, "http://localhost:8000");
        env::set_var(TABLE_NAME_VAR, "surfboards");
        env::remove_var(REGION_VAR);
        env::remove_var(PAGE_SIZE_VAR);

        let config = Config::from_env().expect("Failed to build config");

        env::remove_var(ENDPOINT_VAR);
        env::remove_var(TABLE_NAME_VAR);

        assert_eq!(config.endpoint(), "http://localhost:8000");
        assert_eq!(config.table_name(), "surfboards");
    }

    #[test]
    #[serial]
    fn test_from_env_missing_endpoint() {
        env::remove_var(ENDPOINT_VAR);

        assert_eq!(
            Config::from_env(),
            Err(ConfigError::MissingSetting(ENDPOINT_VAR))
        );
    }
}
