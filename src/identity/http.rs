use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{Identity, IdentityClaims, IdentityError, IdentityOracle};

/// Identity oracle reached over HTTP: `GET {endpoint}` with the bearer token forwarded.
#[derive(Clone)]
pub struct HttpIdentityOracle {
    client: Client,
    endpoint: Arc<str>,
}

impl HttpIdentityOracle {
    /// Build an oracle targeting `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .build()
            .map_err(|source| IdentityError::Unavailable {
                message: "failed to build HTTP client".into(),
                source: Box::new(source),
            })?;
        Ok(Self {
            client,
            endpoint: Arc::from(endpoint),
        })
    }

    async fn fetch(&self, token: String) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .get(self.endpoint.as_ref())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| IdentityError::Unavailable {
                message: format!("request to `{}` failed", self.endpoint),
                source: Box::new(source),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(endpoint = %self.endpoint, "identity oracle rejected credential");
                Err(IdentityError::Rejected)
            }
            status if status.is_success() => {
                let claims: IdentityClaims =
                    response
                        .json()
                        .await
                        .map_err(|source| IdentityError::Unavailable {
                            message: "malformed identity response".into(),
                            source: Box::new(source),
                        })?;
                Ok(claims.into())
            }
            status => Err(IdentityError::Unavailable {
                message: format!("unexpected identity oracle status {status}"),
                source: Box::new(std::io::Error::other(status.to_string())),
            }),
        }
    }
}

impl IdentityOracle for HttpIdentityOracle {
    fn authenticate(&self, token: String) -> BoxFuture<'static, Result<Identity, IdentityError>> {
        let oracle = self.clone();
        Box::pin(async move { oracle.fetch(token).await })
    }
}
