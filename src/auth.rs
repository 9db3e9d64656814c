//! Bearer-token verification against a GoTrue-style identity endpoint.
//!
//! The trait is the seam used by the request pipeline and by tests. A token the
//! endpoint cannot verify, for any reason including transport failure, counts
//! as invalid; requests are never let through on a verification error.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::StoreConfig;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("invalid token")]
  Invalid,
  #[error("identity transport: {0}")]
  Transport(String),
}

/// Verified identity of the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
  pub user_id: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
  /// Resolve a bearer token to the identity it belongs to.
  async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Clone)]
pub struct RestIdentity {
  client: reqwest::Client,
  base_url: String,
  service_key: String,
}

impl RestIdentity {
  pub fn new(cfg: &StoreConfig) -> Result<Self, AuthError> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| AuthError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      base_url: cfg.base_url.clone(),
      service_key: cfg.service_key.clone(),
    })
  }
}

#[async_trait]
impl IdentityProvider for RestIdentity {
  async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
    let url = format!("{}/auth/v1/user", self.base_url);
    let res = self.client.get(&url)
      .header("apikey", &self.service_key)
      .header(AUTHORIZATION, format!("Bearer {token}"))
      .send().await
      .map_err(|e| AuthError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      debug!(target: "codesplain_backend", status = %res.status(), "Identity endpoint rejected token");
      return Err(AuthError::Invalid);
    }

    #[derive(Deserialize)]
    struct UserBody {
      id: String,
    }

    let user: UserBody = res.json().await.map_err(|e| AuthError::Transport(e.to_string()))?;
    Ok(Identity { user_id: user.id })
  }
}
