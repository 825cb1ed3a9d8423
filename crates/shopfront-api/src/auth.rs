//! # Identity
//!
//! The signed-in shopper: a user id plus the bearer token issued by the
//! identity provider. No identity means guest scope.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// Authenticated user context.
#[derive(Clone)]
pub struct Identity {
    user_id: String,
    token: Arc<SecretString>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Identity {
            user_id: user_id.into(),
            token: Arc::new(SecretString::from(token.into())),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Raw bearer token, for the Authorization header only.
    pub fn bearer(&self) -> &str {
        self.token.expose_secret()
    }

    /// Same user, regardless of which token they currently hold.
    pub fn is_same_user(&self, other: &Identity) -> bool {
        self.user_id == other.user_id
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let identity = Identity::new("user-1", "sk_live_secret");
        let debug = format!("{:?}", identity);
        assert!(debug.contains("user-1"));
        assert!(!debug.contains("sk_live_secret"));
        assert_eq!(identity.bearer(), "sk_live_secret");
    }

    #[test]
    fn test_same_user_ignores_token() {
        let a = Identity::new("user-1", "t1");
        let b = Identity::new("user-1", "t2");
        assert!(a.is_same_user(&b));
        assert!(!a.is_same_user(&Identity::new("user-2", "t1")));
    }
}
