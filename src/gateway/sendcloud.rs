//! SendCloud SMS gateway.
//!
//! Form posts signed with `key&sorted-params&key` MD5. Template
//! variables travel as a JSON object with `%key%` wrapped names.

use std::collections::{BTreeMap, HashMap};
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

const NAME: &str = "sendcloud";
const DEFAULT_ENDPOINT: &str = "http://www.sendcloud.net";

/// SendCloud account credentials and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SendcloudConfig {
    pub sms_user: String,
    pub sms_key: String,
    /// Adds a millisecond timestamp to the signed parameters.
    #[serde(default)]
    pub timestamp: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// SendCloud SMS gateway.
pub struct SendcloudGateway {
    config: SendcloudConfig,
    http: HttpClient,
}

impl SendcloudGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: SendcloudConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn send_url(&self) -> String {
        format!("{}/smsapi/send", self.config.endpoint)
    }

    /// MD5 over the key, the sorted unencoded parameters, and the key
    /// again.
    fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        let digest = Md5::digest(
            format!("{}&{}&{}", self.config.sms_key, query, self.config.sms_key).as_bytes(),
        );
        hex::encode(digest)
    }
}

/// Encodes template data as a JSON object with `%key%` wrapped names.
fn format_template_vars(data: &HashMap<String, String>) -> String {
    let formatted: BTreeMap<String, &String> = data
        .iter()
        .map(|(key, value)| (format!("%{}%", key.trim_matches('%')), value))
        .collect();
    serde_json::to_string(&formatted).unwrap_or_else(|_| "{}".to_string())
}

fn msg_type(to: &PhoneNumber) -> &'static str {
    if to.idd_code().is_some() {
        "2"
    } else {
        "0"
    }
}

#[async_trait]
impl Gateway for SendcloudGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let mut params = BTreeMap::new();
        params.insert("smsUser".to_string(), self.config.sms_user.clone());
        params.insert(
            "templateId".to_string(),
            message.template().unwrap_or("").to_string(),
        );
        params.insert("msgType".to_string(), msg_type(to).to_string());
        params.insert("phone".to_string(), to.zero_prefixed_number());
        params.insert("vars".to_string(), format_template_vars(message.data()));
        if self.config.timestamp {
            params.insert(
                "timestamp".to_string(),
                Utc::now().timestamp_millis().to_string(),
            );
        }
        params.insert("signature".to_string(), self.sign(&params));

        let form: Vec<(String, String)> = params.into_iter().collect();
        let resp = self
            .http
            .post_form(&self.send_url(), &form, &[])
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        if resp.get("result").and_then(Value::as_bool) != Some(true) {
            let code = resp
                .get("statusCode")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                .to_string();
            let reason = resp.get("message").and_then(Value::as_str).unwrap_or("");
            return Err(GatewayError::vendor(NAME, code, reason));
        }

        Ok(resp)
    }
}
