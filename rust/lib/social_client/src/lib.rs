//! HTTP implementation of the social engine's remote actions.
//!
//! Authentication is handled by pluggable [`TokenSource`] implementations.
//!
//! # Usage
//!
//! ```ignore
//! use openerp_social_client::{ClientConfig, HttpRemote};
//!
//! let config = ClientConfig::load(&ClientConfig::default_path())?;
//! let remote = Arc::new(HttpRemote::from_config(&config)?);
//! let session = Session::start(me, remote, EventHub::new(), BadgeCounters::new()).await;
//! ```

pub mod config;
pub mod http;
pub mod token;

pub use config::ClientConfig;
pub use http::{ConfigError, HttpRemote};
pub use token::{NoAuth, StaticToken, TokenSource};
