use std::sync::{PoisonError, RwLock};

/// Where the backend session id lives between requests.
pub trait SessionContext: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Value of the `JSESSIONID` cookie in a `Set-Cookie` header.
pub fn session_from_set_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("JSESSIONID="))
        .filter(|id| !id.is_empty())
}
