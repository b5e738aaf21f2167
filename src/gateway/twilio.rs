//! Twilio SMS gateway.
//!
//! Form posts to the Messages resource, authenticated with HTTP Basic
//! credentials (account SID and auth token).

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

const NAME: &str = "twilio";
const DEFAULT_ENDPOINT: &str = "https://api.twilio.com";

// Message states Twilio reports as terminal failures.
const ERROR_STATUSES: [&str; 2] = ["failed", "undelivered"];

/// Twilio credentials and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub token: String,
    pub from: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Twilio SMS gateway.
pub struct TwilioGateway {
    config: TwilioConfig,
    http: HttpClient,
}

impl TwilioGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: TwilioConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.endpoint, self.config.account_sid
        )
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.config.account_sid, self.config.token);
        format!("Basic {}", BASE64.encode(credentials))
    }
}

/// Recipient in E.164-ish form; numbers without a dialing code default
/// to +86.
fn format_to(to: &PhoneNumber) -> String {
    match to.idd_code() {
        Some(_) => to.universal_number(),
        None => format!("+86{}", to.number()),
    }
}

#[async_trait]
impl Gateway for TwilioGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let content = message
            .content()
            .ok_or_else(|| GatewayError::invalid_message(NAME, "content is required"))?;

        let form = vec![
            ("To".to_string(), format_to(to)),
            ("From".to_string(), self.config.from.clone()),
            ("Body".to_string(), content.to_string()),
        ];
        let headers = vec![("Authorization".to_string(), self.basic_auth())];

        let resp = self
            .http
            .post_form(&self.messages_url(), &form, &headers)
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        let status = resp.get("status").and_then(Value::as_str).unwrap_or("");
        let error_code = resp.get("error_code").and_then(Value::as_i64).unwrap_or(0);

        if ERROR_STATUSES.contains(&status) || error_code != 0 {
            let reason = resp
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            return Err(GatewayError::vendor(NAME, error_code, reason));
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_to_defaults_to_china() {
        assert_eq!(format_to(&PhoneNumber::new("18888888888")), "+8618888888888");
        assert_eq!(format_to(&PhoneNumber::with_idd_code(1, "5550100")), "+15550100");
    }

    #[test]
    fn test_messages_url_contains_sid() {
        let config: GatewayConfig = serde_yaml::from_str(
            "{account_sid: AC123, token: tok, from: '+15550100'}",
        )
        .unwrap();
        let http = HttpClient::new(Duration::from_secs(5));

        let gateway = TwilioGateway::new(&config, &http).unwrap();
        assert_eq!(
            gateway.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
