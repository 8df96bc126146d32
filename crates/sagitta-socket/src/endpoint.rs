//! Where the client connects.
//!
//! A factory endpoint is resolved once per connection attempt, so a URL that
//! embeds a short-lived token picks up the current token on every reconnect.

use std::fmt;
use std::sync::Arc;

/// Connection target, fixed or recomputed per attempt.
#[derive(Clone)]
pub enum Endpoint {
    /// Same URL for every attempt.
    Static(String),
    /// URL computed fresh for every attempt.
    Factory(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Endpoint {
    /// Build a per-attempt endpoint from a closure.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    /// The URL to use for the next attempt.
    pub fn resolve(&self) -> String {
        match self {
            Self::Static(url) => url.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(url: &str) -> Self {
        Self::Static(url.to_owned())
    }
}

impl From<String> for Endpoint {
    fn from(url: String) -> Self {
        Self::Static(url)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(url) => f.debug_tuple("Static").field(url).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
