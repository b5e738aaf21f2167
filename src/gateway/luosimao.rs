//! Luosimao SMS gateway.
//!
//! Form posts authenticated with HTTP basic auth over a fixed `api`
//! user and a `key-` prefixed password.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "luosimao";
const DEFAULT_ENDPOINT: &str = "https://sms-api.luosimao.com";

/// Luosimao API key and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LuosimaoConfig {
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Luosimao SMS gateway.
pub struct LuosimaoGateway {
    config: LuosimaoConfig,
    http: HttpClient,
}

impl LuosimaoGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: LuosimaoConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn send_url(&self) -> String {
        format!("{}/v1/send.json", self.config.endpoint)
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("api:key-{}", self.config.api_key);
        format!("Basic {}", BASE64.encode(credentials))
    }
}

#[async_trait]
impl Gateway for LuosimaoGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let form = vec![
            ("mobile".to_string(), to.number().to_string()),
            (
                "message".to_string(),
                message.content().unwrap_or("").to_string(),
            ),
        ];
        let headers = vec![("Authorization".to_string(), self.basic_auth())];

        let resp = self
            .http
            .post_form(&self.send_url(), &form, &headers)
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        if let Some(code) = resp.get("error").and_then(Value::as_i64) {
            if code != 0 {
                let reason = resp.get("msg").and_then(Value::as_str).unwrap_or("");
                return Err(GatewayError::vendor(NAME, code.to_string(), reason));
            }
        }

        Ok(resp)
    }
}
