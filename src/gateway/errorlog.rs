//! Error-log pseudo gateway.
//!
//! Appends every message to a local file instead of calling a vendor.
//! Useful as a development sink or as the last entry in a fallback
//! chain.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::GatewayConfig;
use crate::http::HttpClient;
use crate::message::{Message, PhoneNumber};

use super::{Gateway, GatewayError};

const NAME: &str = "errorlog";

/// Log file location; defaults to a file in the system temp directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorlogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// File-backed message sink.
pub struct ErrorlogGateway {
    file: PathBuf,
}

impl ErrorlogGateway {
    pub fn new(config: &GatewayConfig, _http: &HttpClient) -> Result<Self, GatewayError> {
        let config: ErrorlogConfig = config
            .parse()
            .map_err(|e| GatewayError::invalid_config(NAME, e))?;
        let file = config
            .file
            .unwrap_or_else(|| std::env::temp_dir().join("smsout-error.log"));
        Ok(Self { file })
    }

    fn format_line(to: &PhoneNumber, message: &Message) -> String {
        // Sorted data keys keep the line stable for identical messages.
        let data: BTreeMap<&String, &String> = message.data().iter().collect();
        format!(
            "[{}] to: {} | message: \"{}\" | template: \"{}\" | data: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            to,
            message.content().unwrap_or(""),
            message.template().unwrap_or(""),
            serde_json::to_string(&data).unwrap_or_else(|_| "{}".to_string()),
        )
    }
}

#[async_trait]
impl Gateway for ErrorlogGateway {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, to: &PhoneNumber, message: &Message) -> Result<Value, GatewayError> {
        let line = Self::format_line(to, message);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.file)
            .await
            .map_err(|e| GatewayError::io(NAME, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| GatewayError::io(NAME, e))?;

        Ok(serde_json::json!({
            "status": true,
            "file": self.file.display().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn gateway(file: &std::path::Path) -> ErrorlogGateway {
        let yaml = format!("{{file: '{}'}}", file.display());
        let config: GatewayConfig = serde_yaml::from_str(&yaml).unwrap();
        ErrorlogGateway::new(&config, &HttpClient::new(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_format_line_shape() {
        let to = PhoneNumber::with_idd_code(86, "13800000000");
        let mut data = HashMap::new();
        data.insert("code".to_string(), "1234".to_string());
        let message = Message::new()
            .with_content("hello")
            .with_template("tpl-1")
            .with_data(data);

        let line = ErrorlogGateway::format_line(&to, &message);
        assert!(line.contains("to: +8613800000000"));
        assert!(line.contains("message: \"hello\""));
        assert!(line.contains("template: \"tpl-1\""));
        assert!(line.contains(r#"data: {"code":"1234"}"#));
        assert!(line.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_send_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sms.log");
        let gw = gateway(&path);

        let to = PhoneNumber::new("13800000000");
        let message = Message::new().with_content("first");
        let resp = gw.send(&to, &message).await.unwrap();
        assert_eq!(resp["status"], Value::Bool(true));
        assert_eq!(resp["file"], Value::String(path.display().to_string()));

        gw.send(&to, &Message::new().with_content("second"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }

    #[test]
    fn test_defaults_to_temp_file() {
        let config: GatewayConfig = serde_yaml::from_str("{}").unwrap();
        let gw = ErrorlogGateway::new(&config, &HttpClient::new(Duration::from_secs(5))).unwrap();
        assert_eq!(gw.file, std::env::temp_dir().join("smsout-error.log"));
    }
}
