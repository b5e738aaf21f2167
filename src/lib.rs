//! Multi-provider SMS delivery with ordered fallback.
//!
//! One `Dispatcher` fronts any number of provider gateways. Candidate
//! gateways come from the message or from the configured defaults, an
//! ordering strategy fixes the attempt order, and the first provider to
//! accept the message wins. Every attempt's outcome is reported back to
//! the caller, failures included.
//!
//! # Example
//!
//! ```no_run
//! use smsout::{Config, Dispatcher, Message, PhoneNumber};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::from_yaml(
//!     r#"
//! default_gateways:
//!   - yunpian
//!   - errorlog
//!
//! gateways:
//!   yunpian:
//!     api_key: your-key
//!   errorlog: {}
//! "#,
//! )?;
//!
//! let dispatcher = Dispatcher::new(config);
//! let message = Message::new().with_content("your code is 1234");
//! let results = dispatcher
//!     .send(&PhoneNumber::with_idd_code(86, "13800000000"), &message)
//!     .await?;
//! println!("delivered via {} attempt(s)", results.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod gateway;
pub mod http;
pub mod message;
pub mod strategy;

pub use config::{Config, GatewayConfig, StrategyKind};
pub use dispatcher::{
    DispatchError, Dispatcher, GatewayRegistry, SendError, SendResult, SendResults, SendStatus,
};
pub use gateway::{Gateway, GatewayCreator, GatewayError};
pub use http::{HttpClient, HttpError};
pub use message::{Message, MessageType, PhoneNumber};
pub use strategy::{OrderStrategy, RandomStrategy, Strategy};
