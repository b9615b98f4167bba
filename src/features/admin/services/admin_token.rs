use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use uuid::Uuid;

/// Process-wide admin access token, replaced on a fixed interval
pub struct AdminTokenStore {
    current: RwLock<String>,
}

impl AdminTokenStore {
    pub fn new() -> Self {
        let token = generate_token();
        tracing::info!(token = %token, "Admin access token issued");
        Self {
            current: RwLock::new(token),
        }
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !candidate.is_empty() && *current == candidate
    }

    /// Replace the token; the previous one stops working immediately
    pub fn rotate(&self) -> String {
        let token = generate_token();
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();
        tracing::info!(token = %token, "Admin access token rotated");
        token
    }

    pub fn spawn_rotation(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                self.rotate();
            }
        })
    }
}

impl Default for AdminTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    hex::encode(bytes)
}

/// Credentials accepted on admin routes: current bearer token or the scheduler secret
#[derive(Clone)]
pub struct AdminGate {
    pub tokens: Arc<AdminTokenStore>,
    pub cron_secret: Option<String>,
}

impl AdminGate {
    pub fn new(tokens: Arc<AdminTokenStore>, cron_secret: Option<String>) -> Self {
        Self {
            tokens,
            cron_secret: cron_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn allows(&self, bearer: Option<&str>, cron_secret: Option<&str>) -> bool {
        if bearer.is_some_and(|token| self.tokens.verify(token)) {
            return true;
        }
        matches!(
            (self.cron_secret.as_deref(), cron_secret),
            (Some(expected), Some(given)) if expected == given
        )
    }
}
