//! Dispatch engine for fallback delivery across providers.
//!
//! - The registry maps provider names to constructors
//! - The instance cache holds at most one live gateway per name
//! - A send walks the strategy-ordered candidates until one succeeds

mod registry;

pub use registry::GatewayRegistry;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{Config, GatewayConfig};
use crate::gateway::{Gateway, GatewayCreator, GatewayError};
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};
use crate::strategy::{self, Strategy};

/// Errors resolving one gateway name to a live instance.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No config section exists for the name.
    #[error("no configuration for gateway `{name}`")]
    ConfigNotFound { name: String },

    /// A config section exists but no constructor is registered.
    #[error("no gateway registered under `{name}`")]
    GatewayNotFound { name: String },

    /// Registry-level miss when constructing by name directly.
    #[error("no creator registered under `{name}`")]
    CreatorNotFound { name: String },

    /// The constructor or the provider itself failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub enum SendStatus {
    /// The provider accepted the message; its payload is kept unmodified.
    Success(Value),
    /// Resolution or delivery failed.
    Failure(DispatchError),
}

/// One gateway's attempt record within a single `send` call.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub gateway: String,
    pub status: SendStatus,
}

impl SendResult {
    pub fn success(gateway: &str, response: Value) -> Self {
        Self {
            gateway: gateway.to_string(),
            status: SendStatus::Success(response),
        }
    }

    pub fn failure(gateway: &str, error: DispatchError) -> Self {
        Self {
            gateway: gateway.to_string(),
            status: SendStatus::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, SendStatus::Success(_))
    }
}

/// Per-gateway outcomes keyed by gateway name.
pub type SendResults = HashMap<String, SendResult>;

/// Errors from a whole `send` call.
///
/// Per-attempt failures never escape on their own; they are captured in
/// the results map and only the aggregate surfaces here.
#[derive(Debug, Error)]
pub enum SendError {
    /// Neither the message nor the configuration supplied candidates.
    #[error("no gateway available for message")]
    NoGatewayAvailable,

    /// Every candidate failed. Each attempt stays inspectable in
    /// `results`; the last failure doubles as the error source.
    #[error("all gateways failed after {} attempts", .results.len())]
    AllGatewaysFailed {
        results: SendResults,
        #[source]
        last: DispatchError,
    },
}

impl SendError {
    /// Per-gateway outcomes, when any attempt ran.
    pub fn results(&self) -> Option<&SendResults> {
        match self {
            Self::AllGatewaysFailed { results, .. } => Some(results),
            Self::NoGatewayAvailable => None,
        }
    }
}

/// The fallback dispatch engine.
///
/// Owns the instance cache, the creator registry, the active ordering
/// strategy, and the shared HTTP client handed to every adapter.
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::new(Config::load("sms.yaml")?);
/// let results = dispatcher
///     .send(&PhoneNumber::new("13800000000"), &message)
///     .await?;
/// ```
pub struct Dispatcher {
    default_gateways: Vec<String>,
    gateway_configs: HashMap<String, GatewayConfig>,
    gateways: RwLock<HashMap<String, Arc<dyn Gateway>>>,
    registry: GatewayRegistry,
    strategy: Arc<dyn Strategy>,
    http: HttpClient,
}

impl Dispatcher {
    /// Create an engine from configuration.
    ///
    /// Every configured gateway with a known creator is built eagerly;
    /// sections that fail to build are skipped here and retried on
    /// first use.
    pub fn new(config: Config) -> Self {
        let dispatcher = Self {
            http: HttpClient::new(config.timeout),
            default_gateways: config.default_gateways,
            gateway_configs: config.gateways,
            gateways: RwLock::new(HashMap::new()),
            registry: GatewayRegistry::new(),
            strategy: strategy::for_kind(config.strategy),
        };

        dispatcher.auto_register();
        dispatcher
    }

    /// Replace the ordering strategy.
    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    fn auto_register(&self) {
        for (name, config) in &self.gateway_configs {
            if !self.registry.has_creator(name) {
                debug!(gateway = %name, "configured gateway has no creator yet");
                continue;
            }
            match self.registry.create(name, config, &self.http) {
                Ok(gateway) => {
                    debug!(gateway = %name, "gateway ready");
                    self.gateways.write().unwrap().insert(name.clone(), gateway);
                }
                Err(err) => {
                    error!(gateway = %name, error = %err, "failed to build configured gateway");
                }
            }
        }
    }

    /// Install an already-built instance, bypassing the registry.
    pub fn register_gateway(&self, name: &str, gateway: Arc<dyn Gateway>) {
        debug!(gateway = %name, "registering gateway instance");
        self.gateways
            .write()
            .unwrap()
            .insert(name.to_string(), gateway);
    }

    /// Register a constructor for lazy instantiation.
    pub fn register_creator(&self, name: &str, creator: GatewayCreator) {
        self.registry.register(name, creator);
    }

    /// The creator registry.
    pub fn registry(&self) -> &GatewayRegistry {
        &self.registry
    }

    /// Resolve a name to a live instance, building and caching on first
    /// use.
    pub fn gateway(&self, name: &str) -> Result<Arc<dyn Gateway>, DispatchError> {
        if let Some(gateway) = self.gateways.read().unwrap().get(name) {
            return Ok(gateway.clone());
        }

        let config = self
            .gateway_configs
            .get(name)
            .ok_or_else(|| DispatchError::ConfigNotFound {
                name: name.to_string(),
            })?;

        if !self.registry.has_creator(name) {
            return Err(DispatchError::GatewayNotFound {
                name: name.to_string(),
            });
        }

        let gateway = self.registry.create(name, config, &self.http)?;

        // First install wins; a racing caller gets the cached winner.
        let mut cache = self.gateways.write().unwrap();
        let gateway = cache.entry(name.to_string()).or_insert(gateway).clone();
        Ok(gateway)
    }

    /// Deliver `message` to `to`, falling back across candidates until
    /// one provider succeeds.
    ///
    /// The returned map holds one entry per attempted gateway, failures
    /// included, whatever the overall outcome.
    pub async fn send(
        &self,
        to: &PhoneNumber,
        message: &Message,
    ) -> Result<SendResults, SendError> {
        let candidates: &[String] = if message.gateways().is_empty() {
            &self.default_gateways
        } else {
            message.gateways()
        };
        if candidates.is_empty() {
            return Err(SendError::NoGatewayAvailable);
        }

        let ordered = self.strategy.apply(candidates);
        debug!(
            to = %to,
            strategy = self.strategy.name(),
            candidates = ordered.len(),
            "dispatching message"
        );

        let mut results = SendResults::new();
        let mut last_error: Option<DispatchError> = None;

        for (attempt, name) in ordered.iter().enumerate() {
            debug!(gateway = %name, attempt = attempt + 1, "attempting delivery");

            let gateway = match self.gateway(name) {
                Ok(gateway) => gateway,
                Err(err) => {
                    warn!(gateway = %name, error = %err, "gateway unavailable");
                    results.insert(name.clone(), SendResult::failure(name, err.clone()));
                    last_error = Some(err);
                    continue;
                }
            };

            match gateway.send(to, message).await {
                Ok(response) => {
                    info!(gateway = %name, "message sent");
                    results.insert(name.clone(), SendResult::success(name, response));
                    return Ok(results);
                }
                Err(err) => {
                    warn!(gateway = %name, error = %err, "delivery attempt failed");
                    let err = DispatchError::from(err);
                    results.insert(name.clone(), SendResult::failure(name, err.clone()));
                    last_error = Some(err);
                }
            }
        }

        error!(to = %to, tried = ordered.len(), "all gateways failed");
        match last_error {
            Some(last) => Err(SendError::AllGatewaysFailed { results, last }),
            // The strategy returned nothing to try.
            None => Err(SendError::NoGatewayAvailable),
        }
    }
}
