use secrecy::{ExposeSecret, SecretString};

/// Authentication token forwarded to the native layer. Redacted in Debug.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let cred = Credential::new("eyJhbGciOi.secret");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("secret"), "token leaked in debug: {debug}");
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn expose_returns_token() {
        assert_eq!(Credential::from("abc").expose(), "abc");
    }
}
