//! Aliyun (Alibaba Cloud) SMS gateway.
//!
//! Template sends against the dysmsapi endpoint, signed with the POP
//! HMAC-SHA1 scheme over the sorted query string.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha1::Sha1;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "aliyun";
const DEFAULT_ENDPOINT: &str = "http://dysmsapi.aliyuncs.com";
const ACTION: &str = "SendSms";
const API_VERSION: &str = "2017-05-25";
const REGION_ID: &str = "cn-hangzhou";

/// Aliyun credentials and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AliyunConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub sign_name: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Aliyun SMS gateway.
#[derive(Debug)]
pub struct AliyunGateway {
    config: AliyunConfig,
    http: HttpClient,
}

impl AliyunGateway {
    pub fn new(config: &GatewayConfig, http: &HttpClient) -> Result<Self, GatewayError> {
        let config: AliyunConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let http = match config.timeout {
            Some(timeout) => http.with_timeout(timeout),
            None => http.clone(),
        };
        Ok(Self { config, http })
    }

    fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let canonical = params
            .iter()
            .map(|(k, v)| format!("{}={}", pop_encode(k), pop_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let string_to_sign = format!("GET&%2F&{}", pop_encode(&canonical));

        let key = format!("{}&", self.config.access_key_secret);
        BASE64.encode(hmac_sha1(key.as_bytes(), string_to_sign.as_bytes()))
    }
}

/// Percent-encode one component the way the POP signature expects:
/// form-urlencode, then remap `+` to `%20`, `*` to `%2A`, and keep `~`.
fn pop_encode(value: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    encoded
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("hmac key");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[async_trait]
impl Gateway for AliyunGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let template = message
            .template()
            .ok_or_else(|| GatewayError::invalid_message(NAME, "template is required"))?;

        let now = Utc::now();
        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("AccessKeyId", self.config.access_key_id.clone());
        params.insert("Action", ACTION.to_string());
        params.insert("Format", "JSON".to_string());
        params.insert("PhoneNumbers", to.number().to_string());
        params.insert("RegionId", REGION_ID.to_string());
        params.insert("SignName", self.config.sign_name.clone());
        params.insert("SignatureMethod", "HMAC-SHA1".to_string());
        params.insert(
            "SignatureNonce",
            now.timestamp_nanos_opt().unwrap_or_default().to_string(),
        );
        params.insert("SignatureVersion", "1.0".to_string());
        params.insert("TemplateCode", template.to_string());
        params.insert("Timestamp", now.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        params.insert("Version", API_VERSION.to_string());

        if !message.data().is_empty() {
            // Sorted keys keep TemplateParam stable for identical messages.
            let sorted: BTreeMap<&String, &String> = message.data().iter().collect();
            let template_param = serde_json::to_string(&sorted)
                .map_err(|e| GatewayError::invalid_message(NAME, e.to_string()))?;
            params.insert("TemplateParam", template_param);
        }

        let signature = self.sign(&params);
        params.insert("Signature", signature);

        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let resp = self
            .http
            .get_json(&self.config.endpoint, &query)
            .await
            .map_err(|e| GatewayError::http(NAME, e))?;

        let code = resp
            .get("Code")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        if code == "OK" {
            return Ok(resp);
        }

        let reason = resp
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Err(GatewayError::vendor(NAME, code, reason))
    }
}
