use std::fmt;

/// Bearer credential minted by the client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// unix seconds, when the exchange or the JWT told us
    pub expires_at: Option<i64>,
}

impl Token {
    pub fn new(value: String, expires_at: Option<i64>) -> Self {
        Self { value, expires_at }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value_len", &self.value.len())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
