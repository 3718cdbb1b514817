//! Bearer token validation against an external identity oracle.

#[cfg(feature = "http-identity")]
mod http;

use std::{collections::HashMap, error::Error, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    capability::{Capabilities, Capability},
    config::{IdentitySettings, StaticToken},
};

#[cfg(feature = "http-identity")]
pub use http::HttpIdentityOracle;

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: Uuid,
    /// Resolved capability set.
    pub capabilities: Capabilities,
}

impl Identity {
    /// Whether the caller holds every flag in `capability`.
    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.has(capability)
    }
}

/// Failure to authenticate a bearer token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The oracle refused the credential.
    #[error("credential rejected")]
    Rejected,
    /// The oracle could not be consulted.
    #[error("identity oracle unavailable: {message}")]
    Unavailable {
        /// Summary of the failure.
        message: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Validates bearer credentials and returns the caller's identity.
pub trait IdentityOracle: Send + Sync {
    /// Authenticate `token`, rejecting unknown or expired credentials.
    fn authenticate(&self, token: String) -> BoxFuture<'static, Result<Identity, IdentityError>>;
}

/// In-process token table used for development and tests.
#[derive(Clone, Default)]
pub struct StaticIdentityOracle {
    tokens: Arc<HashMap<String, Identity>>,
}

impl StaticIdentityOracle {
    /// Build an oracle from explicit `(token, identity)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            tokens: Arc::new(entries.into_iter().collect()),
        }
    }

    /// Build an oracle from the configuration token table.
    pub fn from_tokens(tokens: &[StaticToken]) -> Self {
        Self::new(tokens.iter().map(|entry| {
            let user: Capabilities = entry.capabilities.iter().copied().collect();
            let group: Capabilities = entry.group_capabilities.iter().copied().collect();
            (
                entry.token.clone(),
                Identity {
                    user_id: entry.user_id,
                    capabilities: Capabilities::resolve(user, group),
                },
            )
        }))
    }
}

impl IdentityOracle for StaticIdentityOracle {
    fn authenticate(&self, token: String) -> BoxFuture<'static, Result<Identity, IdentityError>> {
        let found = self.tokens.get(&token).copied();
        Box::pin(async move { found.ok_or(IdentityError::Rejected) })
    }
}

/// Build the oracle selected by `settings`: HTTP when an endpoint is configured, the
/// static token table otherwise.
pub fn build_identity(settings: &IdentitySettings) -> Result<Arc<dyn IdentityOracle>, IdentityError> {
    match settings.endpoint.as_deref() {
        #[cfg(feature = "http-identity")]
        Some(endpoint) => {
            tracing::info!(endpoint, "using HTTP identity oracle");
            Ok(Arc::new(HttpIdentityOracle::new(endpoint)?))
        }
        #[cfg(not(feature = "http-identity"))]
        Some(endpoint) => {
            tracing::warn!(
                endpoint,
                "identity endpoint configured but HTTP support is disabled; using static tokens"
            );
            Ok(Arc::new(StaticIdentityOracle::from_tokens(&settings.tokens)))
        }
        None => {
            tracing::info!(
                tokens = settings.tokens.len(),
                "using static identity token table"
            );
            Ok(Arc::new(StaticIdentityOracle::from_tokens(&settings.tokens)))
        }
    }
}

/// Wire shape shared by oracle responses: a user id plus direct and group capability names.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct IdentityClaims {
    pub user_id: Uuid,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub group_capabilities: Vec<Capability>,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        let user: Capabilities = claims.capabilities.into_iter().collect();
        let group: Capabilities = claims.group_capabilities.into_iter().collect();
        Identity {
            user_id: claims.user_id,
            capabilities: Capabilities::resolve(user, group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_oracle_resolves_user_and_group_flags() {
        let user_id = Uuid::new_v4();
        let oracle = StaticIdentityOracle::from_tokens(&[StaticToken {
            token: "secret".into(),
            user_id,
            capabilities: vec![Capability::Player],
            group_capabilities: vec![Capability::Judge],
        }]);

        let identity = oracle.authenticate("secret".into()).await.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(identity.has(Capabilities::PLAYER | Capabilities::JUDGE));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let oracle = StaticIdentityOracle::default();
        let err = oracle.authenticate("nope".into()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Rejected));
    }

    #[test]
    fn claims_decode_from_oracle_json() {
        let claims: IdentityClaims = serde_json::from_str(
            r#"{"user_id": "2f1c7a52-1d6c-4f7b-9a43-0f4b7a9d6e11", "capabilities": ["creator"], "group_capabilities": ["moderator"]}"#,
        )
        .unwrap();
        let identity = Identity::from(claims);
        assert!(identity.has(Capabilities::CREATOR));
        assert!(identity.has(Capabilities::MODERATOR));
        assert!(!identity.has(Capabilities::PLAYER));
    }
}
