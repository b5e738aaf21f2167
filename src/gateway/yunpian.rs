//! Yunpian SMS gateway.
//!
//! Form posts of finished message text; the configured signature is
//! prepended whenever the content does not already carry it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "yunpian";
const DEFAULT_ENDPOINT: &str = "https://sms.yunpian.com";

/// Yunpian API key and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct YunpianConfig {
    pub api_key: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Yunpian SMS gateway.
#[derive(Debug)]
pub struct YunpianGateway {
    config: YunpianConfig,
    http: HttpClient,
}

impl YunpianGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: YunpianConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn send_url(&self) -> String {
        format!("{}/v2/sms/single_send.json", self.config.endpoint)
    }

    /// Final message text with the account signature applied.
    fn sign_content(&self, content: &str) -> String {
        if !self.config.signature.is_empty() && !content.contains(&self.config.signature) {
            format!("{}{}", self.config.signature, content)
        } else {
            content.to_string()
        }
    }
}

#[async_trait]
impl Gateway for YunpianGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let content = message
            .content()
            .ok_or_else(|| GatewayError::invalid_message(NAME, "content is required"))?;

        let form = vec![
            ("apikey".to_string(), self.config.api_key.clone()),
            ("mobile".to_string(), to.number().to_string()),
            ("text".to_string(), self.sign_content(content)),
        ];

        let resp = self
            .http
            .post_form(&self.send_url(), &form, &[])
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        let code = resp.get("code").and_then(Value::as_i64);
        if code != Some(0) {
            let code = code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
            let reason = resp
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(GatewayError::vendor(NAME, code, reason));
        }

        Ok(resp)
    }
}
