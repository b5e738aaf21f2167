use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::config::GatewayConfig;
use crate::gateway::{builtin_creators, Gateway, GatewayCreator};
use crate::http::HttpClient;

use super::DispatchError;

/// Registry of gateway constructors.
///
/// Allows registration of custom providers alongside the built-in ones.
/// Construction is never cached here; the dispatcher owns the instance
/// cache.
pub struct GatewayRegistry {
    creators: RwLock<HashMap<String, GatewayCreator>>,
}

impl GatewayRegistry {
    /// Create a new registry with the built-in providers registered.
    pub fn new() -> Self {
        let registry = Self {
            creators: RwLock::new(HashMap::new()),
        };

        for (name, creator) in builtin_creators() {
            registry.register(name, creator);
        }

        registry
    }

    /// Register a constructor, replacing any previous one under `name`.
    pub fn register(&self, name: &str, creator: GatewayCreator) {
        debug!(gateway = %name, "registering gateway creator");
        self.creators
            .write()
            .unwrap()
            .insert(name.to_string(), creator);
    }

    /// Whether a constructor is registered under `name`.
    pub fn has_creator(&self, name: &str) -> bool {
        self.creators.read().unwrap().contains_key(name)
    }

    /// Build a fresh instance by name.
    ///
    /// Constructor errors come back unchanged so callers see the
    /// original cause.
    pub fn create(
        &self,
        name: &str,
        config: &GatewayConfig,
        http: &HttpClient,
    ) -> Result<Arc<dyn Gateway>, DispatchError> {
        let creator = self
            .creators
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::CreatorNotFound {
                name: name.to_string(),
            })?;

        // Construction may do real work; run it outside the lock.
        Ok(creator(config, http)?)
    }

    /// Names of all registered constructors.
    pub fn available(&self) -> Vec<String> {
        self.creators.read().unwrap().keys().cloned().collect()
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::gateway::GatewayError;
    use crate::message::{Message, PhoneNumber};

    use super::*;

    fn http() -> HttpClient {
        HttpClient::new(Duration::from_secs(5))
    }

    struct NullGateway(&'static str);

    #[async_trait]
    impl Gateway for NullGateway {
        fn name(&self) -> &str {
            self.0
        }

        async fn send(&self, _to: &PhoneNumber, _message: &Message) -> Result<Value, GatewayError> {
            Ok(Value::Null)
        }
    }

    fn null_creator(name: &'static str) -> GatewayCreator {
        Arc::new(move |_config: &GatewayConfig, _http: &HttpClient| {
            Ok(Arc::new(NullGateway(name)) as Arc<dyn Gateway>)
        })
    }

    #[test]
    fn test_registry_has_builtins() {
        let registry = GatewayRegistry::new();
        let available = registry.available();
        for name in [
            "aliyun",
            "errorlog",
            "huyi",
            "juhe",
            "luosimao",
            "qcloud",
            "sendcloud",
            "smsbao",
            "twilio",
            "yunpian",
        ] {
            assert!(available.contains(&name.to_string()), "missing {}", name);
            assert!(registry.has_creator(name));
        }
    }

    #[test]
    fn test_registry_create_errorlog() {
        let registry = GatewayRegistry::new();
        let gateway = registry
            .create("errorlog", &GatewayConfig::default(), &http())
            .unwrap();
        assert_eq!(gateway.name(), "errorlog");
    }

    #[test]
    fn test_registry_create_unknown() {
        let registry = GatewayRegistry::new();
        let err = registry
            .create("nope", &GatewayConfig::default(), &http())
            .unwrap_err();
        assert!(matches!(err, DispatchError::CreatorNotFound { .. }));
    }

    #[test]
    fn test_registry_create_propagates_constructor_error() {
        let registry = GatewayRegistry::new();
        // aliyun requires credentials, so an empty section must fail.
        let err = registry
            .create("aliyun", &GatewayConfig::default(), &http())
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Gateway(GatewayError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_registry_custom_gateway() {
        let registry = GatewayRegistry::new();
        registry.register("custom", null_creator("custom"));

        let gateway = registry
            .create("custom", &GatewayConfig::default(), &http())
            .unwrap();
        assert_eq!(gateway.name(), "custom");
    }

    #[test]
    fn test_registry_overwrite_last_wins() {
        let registry = GatewayRegistry::new();
        registry.register("demo", null_creator("one"));
        registry.register("demo", null_creator("two"));

        let gateway = registry
            .create("demo", &GatewayConfig::default(), &http())
            .unwrap();
        assert_eq!(gateway.name(), "two");
    }
}
