//! Huyi (ihuyi) SMS gateway.
//!
//! Form posts authenticated with an MD5 digest over account, key,
//! mobile, content, and timestamp.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "huyi";
const DEFAULT_ENDPOINT: &str = "http://106.ihuyi.com/webservice/sms.php";
const RESPONSE_FORMAT: &str = "json";
const SUCCESS_CODE: i64 = 2;

/// Huyi account credentials and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HuyiConfig {
    pub api_id: String,
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

/// Huyi SMS gateway.
pub struct HuyiGateway {
    config: HuyiConfig,
    http: HttpClient,
}

impl HuyiGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: HuyiConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn submit_url(&self) -> String {
        format!("{}?method=Submit", self.config.endpoint)
    }

    /// MD5 request password over account, key, mobile, content, and time.
    fn password(&self, mobile: &str, content: &str, timestamp: &str) -> String {
        let digest = Md5::digest(
            format!(
                "{}{}{}{}{}",
                self.config.api_id, self.config.api_key, mobile, content, timestamp
            )
            .as_bytes(),
        );
        hex::encode(digest)
    }
}

/// "{idd} {number}" for international numbers, the bare number otherwise.
fn format_mobile(to: &PhoneNumber) -> String {
    match to.idd_code() {
        Some(idd) => format!("{} {}", idd, to.number()),
        None => to.number().to_string(),
    }
}

#[async_trait]
impl Gateway for HuyiGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let mobile = format_mobile(to);
        let content = message.content().unwrap_or("");
        let timestamp = Utc::now().timestamp().to_string();

        let form = vec![
            ("account".to_string(), self.config.api_id.clone()),
            ("mobile".to_string(), mobile.clone()),
            ("content".to_string(), content.to_string()),
            ("time".to_string(), timestamp.clone()),
            ("format".to_string(), RESPONSE_FORMAT.to_string()),
            ("sign".to_string(), self.config.signature.clone()),
            ("password".to_string(), self.password(&mobile, content, &timestamp)),
        ];

        let resp = self
            .http
            .post_form(&self.submit_url(), &form, &[])
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        let code = resp.get("code").and_then(Value::as_i64);
        if code != Some(SUCCESS_CODE) {
            let code = code.unwrap_or(0).to_string();
            let reason = resp.get("msg").and_then(Value::as_str).unwrap_or("");
            return Err(GatewayError::vendor(NAME, code, reason));
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(yaml: &str) -> HuyiGateway {
        let config: GatewayConfig = serde_yaml::from_str(yaml).unwrap();
        HuyiGateway::new(&config, &HttpClient::new(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_format_mobile_with_idd_code() {
        let to = PhoneNumber::with_idd_code(86, "13800000000");
        assert_eq!(format_mobile(&to), "86 13800000000");
    }

    #[test]
    fn test_format_mobile_without_idd_code() {
        let to = PhoneNumber::new("13800000000");
        assert_eq!(format_mobile(&to), "13800000000");
    }

    #[test]
    fn test_password_known_vector() {
        // md5("abc"), the concatenation of api_id, api_key, and mobile.
        let gw = gateway("{api_id: a, api_key: b}");
        assert_eq!(gw.password("c", "", ""), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_submit_url() {
        let gw = gateway("{api_id: a, api_key: b, endpoint: 'http://127.0.0.1:9000/sms.php'}");
        assert_eq!(gw.submit_url(), "http://127.0.0.1:9000/sms.php?method=Submit");
    }
}
