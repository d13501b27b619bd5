//! Command implementations.

use std::sync::Arc;

use maya_client::api::{ApiClient, ApiError};
use maya_client::cart::CartEngine;
use maya_client::config::{ClientConfig, ConfigError};
use maya_client::error::set_sentry_user;
use maya_client::orders::{OrderScope, OrderTracker};
use maya_client::qr::EncodeError;
use maya_client::session::{Session, StaticIdentity};
use maya_client::StoreError;
use maya_core::UserId;
use thiserror::Error;

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod qr;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Encode(#[from] EncodeError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handles for one invocation.
pub struct Context {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub session: Session,
}

impl Context {
    /// Build the API client and session from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Api` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CliError> {
        let user = config.user_id.clone().map(UserId::new);
        if let Some(user) = &user {
            set_sentry_user(user);
        }
        let api = ApiClient::new(config.clone())?;
        Ok(Self {
            config,
            api,
            session: Session::new(StaticIdentity(user)),
        })
    }

    pub fn cart(&self) -> CartEngine {
        CartEngine::new(Arc::new(self.api.clone()), self.session.clone())
    }

    pub fn tracker(&self, scope: OrderScope) -> OrderTracker {
        OrderTracker::new(Arc::new(self.api.clone()), self.session.clone(), scope)
    }
}
