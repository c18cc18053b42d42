//! Access gate
//!
//! A shared secret unlocks the chat once per client. The server side owns the allow-list
//! ([`AccessCodes`]); the client side ([`AccessGate`]) asks a verifier and persists the
//! verified flag so the prompt is skipped on later visits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

pub const DEFAULT_ACCESS_CODE: &str = "AICHAT2025";
pub const AUTH_FLAG_KEY: &str = "aichat-auth";
pub const AUTH_FLAG_VERIFIED: &str = "verified";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Statically configured allow-list of access codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessCodes(Vec<String>);

impl Default for AccessCodes {
    fn default() -> Self {
        Self(vec![DEFAULT_ACCESS_CODE.to_string()])
    }
}

impl AccessCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    /// Parses a comma-separated `ACCESS_CODES` value. Unset or blank yields the default code.
    pub fn from_env_value(raw: Option<&str>) -> Self {
        let codes: Vec<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();
        if codes.is_empty() {
            Self::default()
        } else {
            Self(codes)
        }
    }

    /// True iff the uppercased candidate is on the list.
    pub fn accepts(&self, candidate: &str) -> bool {
        let normalized = candidate.to_uppercase();
        self.0.iter().any(|code| *code == normalized)
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }
}

/// The access-code field shows what the user types, uppercased.
pub fn code_entry(typed: &str) -> String {
    typed.to_uppercase()
}

/// Something that can judge an access code.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AccessVerifier: Send + Sync {
    async fn verify(&self, code: &str) -> Result<bool, GateError>;
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AccessVerifier for AccessCodes {
    async fn verify(&self, code: &str) -> Result<bool, GateError> {
        Ok(self.accepts(code))
    }
}

#[derive(Serialize)]
pub struct AuthRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
}

/// Verifies codes against the `/api/auth` endpoint.
pub struct HttpVerifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpVerifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AccessVerifier for HttpVerifier {
    async fn verify(&self, code: &str) -> Result<bool, GateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AuthRequest { code })
            .send()
            .await?;
        let status = response.status();
        // 401 still carries `{success:false}`; only the body decides.
        let verdict: AuthResponse = response.json().await?;
        debug!("auth endpoint answered {status}");
        Ok(verdict.success)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Blank input, nothing was sent.
    Ignored,
    Verified,
    Invalid,
    Failed,
}

impl GateOutcome {
    pub fn message(self) -> Option<&'static str> {
        match self {
            GateOutcome::Invalid => Some("Invalid access code"),
            GateOutcome::Failed => Some("Something went wrong. Please try again."),
            GateOutcome::Ignored | GateOutcome::Verified => None,
        }
    }
}

/// Whether this client already passed the gate.
pub fn is_verified(store: &dyn KeyValueStore) -> bool {
    match store.get(AUTH_FLAG_KEY) {
        Ok(flag) => flag.as_deref() == Some(AUTH_FLAG_VERIFIED),
        Err(err) => {
            warn!("could not read auth flag: {err}");
            false
        }
    }
}

/// Client half of the gate.
pub struct AccessGate<V> {
    verifier: V,
    store: Arc<dyn KeyValueStore>,
}

impl<V: AccessVerifier> AccessGate<V> {
    pub fn new(verifier: V, store: Arc<dyn KeyValueStore>) -> Self {
        Self { verifier, store }
    }

    pub fn is_verified(&self) -> bool {
        is_verified(self.store.as_ref())
    }

    pub async fn submit(&self, code: &str) -> GateOutcome {
        let code = code.trim();
        if code.is_empty() {
            return GateOutcome::Ignored;
        }

        match self.verifier.verify(code).await {
            Ok(true) => {
                if let Err(err) = self.store.set(AUTH_FLAG_KEY, AUTH_FLAG_VERIFIED) {
                    warn!("verified but could not persist auth flag: {err}");
                }
                GateOutcome::Verified
            }
            Ok(false) => GateOutcome::Invalid,
            Err(err) => {
                warn!("access check failed: {err}");
                GateOutcome::Failed
            }
        }
    }

    /// Drops the persisted flag so the next visit prompts again.
    pub fn forget(&self) -> Result<(), GateError> {
        self.store.remove(AUTH_FLAG_KEY)?;
        Ok(())
    }
}
