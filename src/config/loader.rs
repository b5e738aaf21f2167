use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be greater than zero");
        }

        for name in &self.default_gateways {
            if name.is_empty() {
                anyhow::bail!("default gateway names must not be empty");
            }
        }

        for name in self.gateways.keys() {
            if name.is_empty() {
                anyhow::bail!("gateway section names must not be empty");
            }
        }

        info!(
            gateways = self.gateways.len(),
            defaults = self.default_gateways.len(),
            "configuration validated successfully"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::StrategyKind;
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.strategy, StrategyKind::Order);
        assert!(config.default_gateways.is_empty());
        assert!(config.gateways.is_empty());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
timeout: 3s
strategy: random

default_gateways:
  - yunpian
  - errorlog

gateways:
  yunpian:
    api_key: abc123
  errorlog:
    file: /tmp/sms.log
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.strategy, StrategyKind::Random);
        assert_eq!(config.default_gateways, vec!["yunpian", "errorlog"]);
        assert_eq!(config.gateways.len(), 2);
    }

    #[test]
    fn test_empty_default_gateway_name() {
        let yaml = r#"
default_gateways:
  - yunpian
  - ""
"#;

        let result = Config::from_yaml(yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must not be empty"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Config::from_yaml("timeout: 0s");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("greater than zero"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(Config::from_yaml("strategy: roundrobin").is_err());
    }
}
