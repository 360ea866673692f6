//! Authorization code and access token tables
//!
//! Both tables live behind async locks owned by a single [`GrantStore`].
//! Codes are single-use: a redemption removes the code under the same lock
//! acquisition that checked it, so two concurrent redemptions of one code
//! can never both succeed. Expired entries are evicted lazily when looked up
//! and swept in bulk whenever a new entry is issued.

use super::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

const CODE_LENGTH: usize = 32;
const TOKEN_LENGTH: usize = 48;

/// A minted authorization code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// A minted bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a code could not be redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemError {
    /// Never issued, already redeemed, or swept
    Unknown,
    Expired,
    ClientMismatch,
    RedirectMismatch,
}

impl RedeemError {
    pub fn description(self) -> &'static str {
        match self {
            RedeemError::Unknown => "Invalid authorization code",
            RedeemError::Expired => "Authorization code has expired",
            RedeemError::ClientMismatch => "Authorization code was issued to another client",
            RedeemError::RedirectMismatch => {
                "redirect_uri does not match the authorization request"
            }
        }
    }
}

/// Opaque random credential
fn random_credential(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Short, log-safe prefix of a credential
pub fn redact(credential: &str) -> String {
    let prefix: String = credential.chars().take(6).collect();
    format!("{}…", prefix)
}

/// Owner of the code and token tables
pub struct GrantStore {
    codes: Mutex<HashMap<String, AuthorizationCode>>,
    tokens: RwLock<HashMap<String, AccessToken>>,
    clock: Arc<dyn Clock>,
    code_ttl: Duration,
    token_ttl: Duration,
}

impl GrantStore {
    pub fn new(clock: Arc<dyn Clock>, code_ttl: Duration, token_ttl: Duration) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            clock,
            code_ttl,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Mint a code bound to a client and redirect URI
    pub async fn issue_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> AuthorizationCode {
        let now = self.clock.now();
        let code = AuthorizationCode {
            code: random_credential(CODE_LENGTH),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope: scope.to_string(),
            expires_at: now + self.code_ttl,
        };

        let mut codes = self.codes.lock().await;
        let before = codes.len();
        codes.retain(|_, c| now < c.expires_at);
        if codes.len() != before {
            debug!("Swept {} expired authorization codes", before - codes.len());
        }
        codes.insert(code.code.clone(), code.clone());
        code
    }

    /// Consume a code; it is removed only when every check passes
    pub async fn redeem_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: Option<&str>,
    ) -> Result<AuthorizationCode, RedeemError> {
        let now = self.clock.now();
        let mut codes = self.codes.lock().await;

        let entry = codes.get(code).ok_or(RedeemError::Unknown)?;
        if now >= entry.expires_at {
            codes.remove(code);
            return Err(RedeemError::Expired);
        }
        if entry.client_id != client_id {
            return Err(RedeemError::ClientMismatch);
        }
        if let Some(redirect_uri) = redirect_uri {
            if entry.redirect_uri != redirect_uri {
                return Err(RedeemError::RedirectMismatch);
            }
        }

        codes.remove(code).ok_or(RedeemError::Unknown)
    }

    /// Mint an access token for a client
    pub async fn issue_token(&self, client_id: &str, scope: &str) -> AccessToken {
        let now = self.clock.now();
        let token = AccessToken {
            token: random_credential(TOKEN_LENGTH),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            expires_at: now + self.token_ttl,
        };

        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| now < t.expires_at);
        if tokens.len() != before {
            debug!("Swept {} expired access tokens", before - tokens.len());
        }
        tokens.insert(token.token.clone(), token.clone());
        token
    }

    /// Look up a token; an expired token found here is evicted
    pub async fn validate_token(&self, token: &str) -> Option<AccessToken> {
        let now = self.clock.now();
        {
            let tokens = self.tokens.read().await;
            match tokens.get(token) {
                None => return None,
                Some(entry) if now < entry.expires_at => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        let mut tokens = self.tokens.write().await;
        if tokens
            .get(token)
            .is_some_and(|entry| now >= entry.expires_at)
        {
            tokens.remove(token);
            debug!("Evicted expired access token {}", redact(token));
        }
        None
    }

    pub async fn code_count(&self) -> usize {
        self.codes.lock().await.len()
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, GrantStore) {
        let clock = Arc::new(ManualClock::default());
        let store = GrantStore::new(clock.clone(), Duration::seconds(600), Duration::seconds(3600));
        (clock, store)
    }

    #[tokio::test]
    async fn test_code_single_use() {
        let (_, store) = store();
        let code = store.issue_code("client", "https://app/cb", "mcp:read").await;
        assert_eq!(code.code.len(), CODE_LENGTH);

        let redeemed = store.redeem_code(&code.code, "client", None).await.unwrap();
        assert_eq!(redeemed.scope, "mcp:read");
        assert_eq!(
            store.redeem_code(&code.code, "client", None).await,
            Err(RedeemError::Unknown)
        );
    }

    #[tokio::test]
    async fn test_code_bound_to_client_and_redirect() {
        let (_, store) = store();
        let code = store.issue_code("client", "https://app/cb", "").await;

        assert_eq!(
            store.redeem_code(&code.code, "intruder", None).await,
            Err(RedeemError::ClientMismatch)
        );
        assert_eq!(
            store
                .redeem_code(&code.code, "client", Some("https://evil/cb"))
                .await,
            Err(RedeemError::RedirectMismatch)
        );
        // Failed attempts do not consume the code
        assert!(store
            .redeem_code(&code.code, "client", Some("https://app/cb"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_code_expires() {
        let (clock, store) = store();
        let code = store.issue_code("client", "https://app/cb", "").await;

        clock.advance(Duration::seconds(600));
        assert_eq!(
            store.redeem_code(&code.code, "client", None).await,
            Err(RedeemError::Expired)
        );
        assert_eq!(store.code_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_redemption_has_one_winner() {
        let (_, store) = store();
        let store = Arc::new(store);
        let code = store.issue_code("client", "https://app/cb", "").await.code;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let code = code.clone();
                tokio::spawn(async move { store.redeem_code(&code, "client", None).await })
            })
            .collect();

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_token_expiry_and_lazy_eviction() {
        let (clock, store) = store();
        let token = store.issue_token("client", "mcp:read mcp:write").await;
        assert_eq!(token.token.len(), TOKEN_LENGTH);
        assert!(store.validate_token(&token.token).await.is_some());

        clock.advance(Duration::seconds(3599));
        assert!(store.validate_token(&token.token).await.is_some());

        clock.advance(Duration::seconds(1));
        assert!(store.validate_token(&token.token).await.is_none());
        assert_eq!(store.token_count().await, 0);
    }

    #[tokio::test]
    async fn test_issue_sweeps_expired_entries() {
        let (clock, store) = store();
        store.issue_token("a", "").await;
        store.issue_code("a", "https://app/cb", "").await;

        clock.advance(Duration::seconds(7200));
        store.issue_token("b", "").await;
        store.issue_code("b", "https://app/cb", "").await;

        assert_eq!(store.token_count().await, 1);
        assert_eq!(store.code_count().await, 1);
    }

    #[test]
    fn test_unknown_token_and_redaction() {
        let (_, store) = store();
        assert!(tokio_test::block_on(store.validate_token("missing")).is_none());
        assert_eq!(redact("abcdefghijk"), "abcdef…");
    }
}
