use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// The user the identity provider vouches for.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("code exchange rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Hosted authentication service that turns an authorization code into a
/// verified identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthProviderError>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    auth_code: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    user: ProviderUser,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthProviderError> {
        let mut request = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "pkce")])
            .json(&ExchangeRequest { auth_code: code });
        if let Some(ref key) = self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: ExchangeResponse = response.json().await?;
        Ok(body.user.into())
    }
}

impl From<ProviderUser> for Identity {
    fn from(user: ProviderUser) -> Self {
        let meta = user.user_metadata;
        Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
            display_name: meta.full_name.or(meta.name),
            avatar_url: meta.avatar_url.or(meta.picture),
        }
    }
}
