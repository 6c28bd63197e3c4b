use std::fmt;

use crate::error::{GatewayError, GatewayResult};

/// Header carrying the session token on state-changing requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Random bytes per token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Per-process anti-forgery token.
///
/// Debug output is redacted so the value cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the thread-local CSPRNG
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Issues the session token at startup and checks it on every mutating request.
///
/// Owned by the server's top-level state; a restart issues a new token and
/// invalidates whatever a stale client cached.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    token: SessionToken,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::with_token(SessionToken::generate())
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self { token }
    }

    /// Token handed to the legitimate client
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Exact-match check of a presented token
    pub fn verify(&self, presented: Option<&str>) -> GatewayResult<()> {
        match presented {
            Some(presented) if constant_time_eq(presented.as_bytes(), self.token.0.as_bytes()) => {
                Ok(())
            }
            _ => Err(GatewayError::Forbidden),
        }
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
