//! Signed-in identity.
//!
//! Identity storage lives outside this crate. Components receive a
//! [`Session`] at construction and resolve the current user on every
//! operation, so a sign-out takes effect on the next call.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use maya_core::UserId;

use crate::error::{Result, StoreError};

/// Source of the current user ID.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user_id(&self) -> Option<UserId>;
}

/// Identity context handed to the cart engine, order tracker and checkout.
#[derive(Clone)]
pub struct Session {
    identity: Arc<dyn IdentityProvider>,
}

impl Session {
    /// Wrap an identity provider.
    pub fn new(identity: impl IdentityProvider + 'static) -> Self {
        Self {
            identity: Arc::new(identity),
        }
    }

    /// A session that always resolves to `user`.
    #[must_use]
    pub fn fixed(user: UserId) -> Self {
        Self::new(StaticIdentity(Some(user)))
    }

    /// Resolve the current user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IdentityMissing` when nobody is signed in.
    pub async fn require_user(&self) -> Result<UserId> {
        self.identity
            .current_user_id()
            .await
            .ok_or(StoreError::IdentityMissing)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Identity fixed at construction (for example from `MAYA_USER_ID`).
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Option<UserId>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// In-memory identity that can be signed in and out at runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentity {
    user: Arc<RwLock<Option<UserId>>>,
}

impl MemoryIdentity {
    /// Create a signed-out identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign in as `user`.
    pub fn sign_in(&self, user: UserId) {
        if let Ok(mut guard) = self.user.write() {
            *guard = Some(user);
        }
    }

    /// Sign out.
    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.user.write() {
            *guard = None;
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        self.user.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_identity() {
        let session = Session::new(StaticIdentity(None));
        let err = session.require_user().await.unwrap_err();
        assert!(err.requires_sign_in());
    }

    #[tokio::test]
    async fn test_memory_identity_follows_sign_in_and_out() {
        let identity = MemoryIdentity::new();
        let session = Session::new(identity.clone());
        assert!(session.require_user().await.is_err());

        identity.sign_in(UserId::new("u1"));
        assert_eq!(session.require_user().await.unwrap(), UserId::new("u1"));

        identity.sign_out();
        assert!(session.require_user().await.is_err());
    }
}
