//! Access-token sources for the chat endpoint.

/// Supplies the token embedded in the endpoint URL. Called once per
/// connection attempt.
pub trait TokenSource: Send + Sync + 'static {
    /// A token for the next attempt.
    fn token(&self) -> String;
}

impl<F> TokenSource for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn token(&self) -> String {
        self()
    }
}

/// The same token on every attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> String {
        self.0.clone()
    }
}
