use crate::cache::token::Token;

/// A token together with the moment it should be replaced.
#[derive(Debug, Clone)]
pub struct TokenContext {
    pub token: Token,
    /// unix seconds; `None` when the expiry is unknown
    pub refresh_at: Option<i64>,
}

impl TokenContext {
    pub fn new(token: Token, safety_margin_seconds: u64) -> Self {
        let refresh_at = token
            .expires_at
            .map(|exp| (exp - safety_margin_seconds as i64).max(0));
        Self { token, refresh_at }
    }

    /// A token without a known expiry stays usable until upstream rejects it.
    pub fn should_update(&self, now: i64) -> bool {
        self.refresh_at.is_some_and(|refresh_at| now >= refresh_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_point_honours_safety_margin() {
        let ctx = TokenContext::new(Token::new("t".into(), Some(1_000)), 60);
        assert_eq!(ctx.refresh_at, Some(940));
        assert!(!ctx.should_update(939));
        assert!(ctx.should_update(940));
    }

    #[test]
    fn unknown_expiry_never_forces_refresh() {
        let ctx = TokenContext::new(Token::new("t".into(), None), 60);
        assert!(!ctx.should_update(i64::MAX));
    }

    #[test]
    fn debug_hides_bearer_value() {
        let token = Token::new("very-secret-bearer".into(), None);
        assert!(!format!("{:?}", token).contains("very-secret-bearer"));
    }
}
