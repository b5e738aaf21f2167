//! Juhe data SMS gateway.
//!
//! Template variables travel as a nested query string whose keys are
//! wrapped in `#` markers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "juhe";
const DEFAULT_ENDPOINT: &str = "http://v.juhe.cn/sms/send";
const RESPONSE_FORMAT: &str = "json";

/// Juhe application key and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct JuheConfig {
    pub app_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Juhe SMS gateway.
pub struct JuheGateway {
    config: JuheConfig,
    http: HttpClient,
}

impl JuheGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: JuheConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }
}

/// Encodes template data as `#key#=value` pairs in a query string.
fn format_template_vars(data: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(String, &String)> = data
        .iter()
        .map(|(key, value)| (format!("#{}#", key.trim_matches('#')), value))
        .collect();
    pairs.sort();

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(&key, value);
    }
    serializer.finish()
}

#[async_trait]
impl Gateway for JuheGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let query = vec![
            ("mobile".to_string(), to.number().to_string()),
            ("tpl_id".to_string(), message.template().unwrap_or("").to_string()),
            ("tpl_value".to_string(), format_template_vars(message.data())),
            ("dtype".to_string(), RESPONSE_FORMAT.to_string()),
            ("key".to_string(), self.config.app_key.clone()),
        ];

        let resp = self
            .http
            .get_json(&self.config.endpoint, &query)
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        // A missing or zero error_code means the request was accepted.
        if let Some(code) = resp.get("error_code").and_then(Value::as_i64) {
            if code != 0 {
                let reason = resp.get("reason").and_then(Value::as_str).unwrap_or("");
                return Err(GatewayError::vendor(NAME, code.to_string(), reason));
            }
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_vars_wrapped_and_encoded() {
        let mut data = HashMap::new();
        data.insert("code".to_string(), "1234".to_string());
        assert_eq!(format_template_vars(&data), "%23code%23=1234");
    }

    #[test]
    fn test_template_vars_existing_markers_not_doubled() {
        let mut data = HashMap::new();
        data.insert("#code#".to_string(), "1234".to_string());
        assert_eq!(format_template_vars(&data), "%23code%23=1234");
    }

    #[test]
    fn test_template_vars_sorted_by_key() {
        let mut data = HashMap::new();
        data.insert("name".to_string(), "li".to_string());
        data.insert("code".to_string(), "9".to_string());
        assert_eq!(format_template_vars(&data), "%23code%23=9&%23name%23=li");
    }

    #[test]
    fn test_template_vars_empty() {
        assert_eq!(format_template_vars(&HashMap::new()), "");
    }
}
