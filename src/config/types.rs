use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for the dispatcher
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Request timeout shared by every gateway unless its section
    /// overrides it
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Candidate ordering strategy
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Gateways tried for messages that name none of their own
    #[serde(default)]
    pub default_gateways: Vec<String>,

    /// Per-gateway config sections, keyed by gateway name
    #[serde(default)]
    pub gateways: HashMap<String, GatewayConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            strategy: StrategyKind::default(),
            default_gateways: Vec::new(),
            gateways: HashMap::new(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Candidate ordering strategy
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Order,
    Random,
}

/// One gateway's untyped config section.
///
/// Sections stay opaque YAML until the owning adapter parses them into
/// its typed settings struct, so unknown providers can be configured
/// without this crate knowing their schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct GatewayConfig(serde_yaml::Value);

impl GatewayConfig {
    /// An empty section.
    pub fn new() -> Self {
        Self(serde_yaml::Value::Mapping(Default::default()))
    }

    /// Parse this section into an adapter's typed settings.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct NullConfig {
    ///     #[serde(default)]
    ///     verbose: bool,
    /// }
    ///
    /// let settings: NullConfig = section.parse()?;
    /// ```
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        // An absent section behaves like an empty mapping.
        let value = match &self.0 {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
            value => value.clone(),
        };
        serde_yaml::from_value(value)
    }
}

impl From<serde_yaml::Value> for GatewayConfig {
    fn from(value: serde_yaml::Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct DemoSettings {
        key: String,
        #[serde(default)]
        region: Option<String>,
    }

    #[test]
    fn test_parse_typed_section() {
        let section: GatewayConfig = serde_yaml::from_str("{key: abc, region: eu}").unwrap();
        let settings: DemoSettings = section.parse().unwrap();
        assert_eq!(settings.key, "abc");
        assert_eq!(settings.region.as_deref(), Some("eu"));
    }

    #[test]
    fn test_parse_missing_required_field() {
        let section: GatewayConfig = serde_yaml::from_str("{region: eu}").unwrap();
        assert!(section.parse::<DemoSettings>().is_err());
    }

    #[test]
    fn test_null_section_reads_as_empty_mapping() {
        #[derive(Debug, Deserialize)]
        struct Empty {
            #[serde(default)]
            flag: bool,
        }

        let section = GatewayConfig::default();
        let settings: Empty = section.parse().unwrap();
        assert!(!settings.flag);
    }
}
