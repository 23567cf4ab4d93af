use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::token::Token;
use crate::cache::token_context::TokenContext;
use crate::helpers::time::now_i64;

/// Holds at most one bearer token for the configured credential.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<Option<TokenContext>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, context: TokenContext) {
        *self.inner.write().await = Some(context);
    }

    /// Get the token if present and not yet due for refresh
    pub async fn get(&self) -> Option<Token> {
        let now = now_i64();
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|ctx| !ctx.should_update(now))
            .map(|ctx| ctx.token.clone())
    }

    pub async fn clear(&self) {
        self.inner.write().await.take();
    }
}
