//! Bearer-token verification
//!
//! Tokens are minted by the identity service after the OAuth exchange;
//! this server only checks them. Format: `<user_id>.<hex tag>` where the
//! tag is HMAC-SHA256 over the user id. Verification yields an opaque
//! user id and nothing else.

use sha2::{Digest, Sha256};

use crate::errors::{GameError, GameResult};

const BLOCK_SIZE: usize = 64;

/// Verifies bearer tokens and signs opaque state blobs handed to clients.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Mint a token for a user id. Used by tests and the dev token tool;
    /// production tokens come from the identity service sharing the secret.
    pub fn mint(&self, user_id: &str) -> String {
        format!("{}.{}", user_id, hex::encode(self.hmac(user_id.as_bytes())))
    }

    /// Verify a token and return the user id it names.
    pub fn verify(&self, token: &str) -> GameResult<String> {
        let (user_id, tag_hex) = token
            .rsplit_once('.')
            .ok_or_else(|| GameError::Auth("malformed token".to_string()))?;
        if user_id.is_empty() {
            return Err(GameError::Auth("malformed token".to_string()));
        }
        let tag = hex::decode(tag_hex).map_err(|_| GameError::Auth("malformed token".to_string()))?;
        if !constant_time_eq(&tag, &self.hmac(user_id.as_bytes())) {
            return Err(GameError::Auth("invalid token".to_string()));
        }
        Ok(user_id.to_string())
    }

    /// Sign arbitrary data (e.g. the blackjack state blob round-tripped
    /// through the client).
    pub fn sign(&self, data: &str) -> String {
        hex::encode(self.hmac(data.as_bytes()))
    }

    /// Check a signature produced by [`sign`](Self::sign).
    pub fn check_signature(&self, data: &str, signature: &str) -> GameResult<()> {
        let tag = hex::decode(signature)
            .map_err(|_| GameError::Auth("malformed signature".to_string()))?;
        if !constant_time_eq(&tag, &self.hmac(data.as_bytes())) {
            return Err(GameError::Auth("invalid signature".to_string()));
        }
        Ok(())
    }

    // HMAC-SHA256 (RFC 2104) over the configured secret.
    fn hmac(&self, message: &[u8]) -> [u8; 32] {
        let mut key = [0u8; BLOCK_SIZE];
        if self.secret.len() > BLOCK_SIZE {
            let digest = Sha256::digest(&self.secret);
            key[..32].copy_from_slice(&digest);
        } else {
            key[..self.secret.len()].copy_from_slice(&self.secret);
        }

        let mut inner = Sha256::new();
        inner.update(key.iter().map(|b| b ^ 0x36).collect::<Vec<u8>>());
        inner.update(message);
        let inner_digest = inner.finalize();

        let mut outer = Sha256::new();
        outer.update(key.iter().map(|b| b ^ 0x5c).collect::<Vec<u8>>());
        outer.update(inner_digest);
        outer.finalize().into()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract a bearer token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header.and_then(|value| value.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_then_verify_round_trips() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.mint("user-42");
        assert_eq!(verifier.verify(&token).unwrap(), "user-42");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.mint("user-42");
        let forged = token.replace("user-42", "user-43");
        assert!(verifier.verify(&forged).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenVerifier::new("secret-a").mint("user-42");
        assert!(TokenVerifier::new("secret-b").verify(&token).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let verifier = TokenVerifier::new("test-secret");
        assert!(verifier.verify("no-separator").is_err());
        assert!(verifier.verify(".deadbeef").is_err());
        assert!(verifier.verify("user.not-hex").is_err());
    }

    #[test]
    fn signature_round_trips() {
        let verifier = TokenVerifier::new("test-secret");
        let sig = verifier.sign("{\"bet\":100}");
        assert!(verifier.check_signature("{\"bet\":100}", &sig).is_ok());
        assert!(verifier.check_signature("{\"bet\":999}", &sig).is_err());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
