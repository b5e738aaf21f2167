//! Gateway trait, adapter errors, and the built-in providers.
//!
//! Extensible design:
//! - Define your own provider by implementing the `Gateway` trait
//! - Register a constructor for it with the dispatcher's registry

pub mod aliyun;
pub mod errorlog;
pub mod huyi;
pub mod juhe;
pub mod luosimao;
pub mod qcloud;
pub mod sendcloud;
pub mod smsbao;
pub mod twilio;
pub mod yunpian;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::http::{HttpClient, HttpError};
use crate::message::{Message, PhoneNumber};

/// A provider-specific adapter able to deliver one message to one
/// recipient.
///
/// Instances must be safe for concurrent use; the dispatcher never
/// serializes calls to the same instance.
///
/// # Example
///
/// ```ignore
/// struct NullGateway;
///
/// #[async_trait]
/// impl Gateway for NullGateway {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     async fn send(&self, _to: &PhoneNumber, _msg: &Message) -> Result<Value, GatewayError> {
///         Ok(Value::Null)
///     }
/// }
/// ```
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The provider name this adapter answers to.
    fn name(&self) -> &str;

    /// Deliver `message` to `to`, returning the vendor's response payload
    /// unmodified.
    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError>;
}

impl std::fmt::Debug for dyn Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").field("name", &self.name()).finish()
    }
}

/// Constructor closure building a gateway from its config section and the
/// shared HTTP client.
pub type GatewayCreator =
    Arc<dyn Fn(&GatewayConfig, &HttpClient) -> Result<Arc<dyn Gateway>, GatewayError> + Send + Sync>;

/// Errors from gateway construction and sending.
///
/// Payloads are plain strings so per-attempt errors stay cheap to clone
/// into the results map.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway's config section is missing or malformed.
    #[error("gateway `{gateway}`: invalid config: {reason}")]
    InvalidConfig { gateway: String, reason: String },

    /// The message lacks a field this vendor requires.
    #[error("gateway `{gateway}`: {reason}")]
    InvalidMessage { gateway: String, reason: String },

    /// Transport-level failure talking to the vendor.
    #[error("gateway `{gateway}`: request failed: {reason}")]
    Http { gateway: String, reason: String },

    /// The vendor did not answer within the configured timeout.
    #[error("gateway `{gateway}`: request timed out")]
    Timeout { gateway: String },

    /// The vendor accepted the request but rejected the message.
    #[error("gateway `{gateway}` rejected the message: [{code}] {reason}")]
    Vendor {
        gateway: String,
        code: String,
        reason: String,
    },

    /// Local I/O failure (file-backed gateways).
    #[error("gateway `{gateway}`: {reason}")]
    Io { gateway: String, reason: String },
}

impl GatewayError {
    pub(crate) fn invalid_config(gateway: &str, err: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            gateway: gateway.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn invalid_message(gateway: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            gateway: gateway.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a transport error, keeping timeouts distinct.
    pub(crate) fn http(gateway: &str, err: HttpError) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                gateway: gateway.to_string(),
            }
        } else {
            Self::Http {
                gateway: gateway.to_string(),
                reason: err.to_string(),
            }
        }
    }

    pub(crate) fn vendor(
        gateway: &str,
        code: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::Vendor {
            gateway: gateway.to_string(),
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(gateway: &str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            gateway: gateway.to_string(),
            reason: err.to_string(),
        }
    }
}

/// The built-in provider creators, in registration order.
pub(crate) fn builtin_creators() -> Vec<(&'static str, GatewayCreator)> {
    fn arc<G: Gateway + 'static>(gateway: G) -> Arc<dyn Gateway> {
        Arc::new(gateway)
    }

    vec![
        (
            "aliyun",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(aliyun::AliyunGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "errorlog",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(errorlog::ErrorlogGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "huyi",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(huyi::HuyiGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "juhe",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(juhe::JuheGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "luosimao",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(luosimao::LuosimaoGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "qcloud",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(qcloud::QcloudGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "sendcloud",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(sendcloud::SendcloudGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "smsbao",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(smsbao::SmsbaoGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "twilio",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(twilio::TwilioGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
        (
            "yunpian",
            Arc::new(|config: &GatewayConfig, http: &HttpClient| {
                Ok(arc(yunpian::YunpianGateway::new(config, http)?))
            }) as GatewayCreator,
        ),
    ]
}
