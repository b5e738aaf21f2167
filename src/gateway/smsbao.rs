//! Smsbao SMS gateway.
//!
//! Plain GET requests against a text API. Mainland numbers go through
//! the `sms` action, everything else through `wsms`; the response body
//! is a bare status code rather than JSON.

use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "smsbao";
const DEFAULT_ENDPOINT: &str = "http://api.smsbao.com";
const SUCCESS_CODE: &str = "0";

/// Smsbao account credentials and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsbaoConfig {
    pub user: String,
    pub password: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Smsbao SMS gateway.
pub struct SmsbaoGateway {
    config: SmsbaoConfig,
    http: HttpClient,
}

impl SmsbaoGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: SmsbaoConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }
}

/// Number representation and API action for one recipient.
fn route(to: &PhoneNumber) -> (String, &'static str) {
    if to.in_chinese_mainland() {
        (to.number().to_string(), "sms")
    } else {
        (to.universal_number(), "wsms")
    }
}

fn describe(code: &str) -> &'static str {
    match code {
        "-1" => "incomplete parameters",
        "-2" => "server environment not supported",
        "30" => "password error",
        "40" => "account not found",
        "41" => "insufficient balance",
        "42" => "account expired",
        "43" => "ip address restricted",
        "50" => "content contains sensitive words",
        _ => "unknown error",
    }
}

#[async_trait]
impl Gateway for SmsbaoGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let (number, action) = route(to);
        let url = format!("{}/{}", self.config.endpoint, action);

        let password = hex::encode(Md5::digest(self.config.password.as_bytes()));
        let query = vec![
            ("u".to_string(), self.config.user.clone()),
            ("p".to_string(), password),
            ("m".to_string(), number),
            ("c".to_string(), message.content().unwrap_or("").to_string()),
        ];

        let body = self
            .http
            .get_text(&url, &query)
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        let code = body.trim();
        if code != SUCCESS_CODE {
            return Err(GatewayError::vendor(NAME, code, describe(code)));
        }

        Ok(Value::String(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_mainland_number() {
        let (number, action) = route(&PhoneNumber::new("13800000000"));
        assert_eq!(number, "13800000000");
        assert_eq!(action, "sms");

        let (number, action) = route(&PhoneNumber::with_idd_code(86, "13800000000"));
        assert_eq!(number, "13800000000");
        assert_eq!(action, "sms");
    }

    #[test]
    fn test_route_international_number() {
        let (number, action) = route(&PhoneNumber::with_idd_code(1, "5550100"));
        assert_eq!(number, "+15550100");
        assert_eq!(action, "wsms");
    }

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(describe("41"), "insufficient balance");
        assert_eq!(describe("50"), "content contains sensitive words");
        assert_eq!(describe("99"), "unknown error");
    }

    #[test]
    fn test_password_is_hashed() {
        let config: GatewayConfig =
            serde_yaml::from_str("{user: u, password: abc}").unwrap();
        let gw = SmsbaoGateway::new(&config, &HttpClient::new(Duration::from_secs(5))).unwrap();
        assert_eq!(
            hex::encode(Md5::digest(gw.config.password.as_bytes())),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
