// src/services/token.rs

use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::common::error::AppError;

// 48 bytes = 384 bits de entropia
const TOKEN_BYTES: usize = 48;

// Gera tokens opacos e o hash que vai para o banco.
// O token cru só existe no cookie do cliente.
#[derive(Clone)]
pub struct TokenCodec {
    pepper: Arc<str>,
}

impl TokenCodec {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: Arc::from(pepper.into()),
        }
    }

    /// Novo token aleatório, em base64url sem padding.
    pub fn issue(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("falha ao gerar token de sessão")?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// sha256("{token}.{pepper}") em hex. Trocar o pepper invalida todas as sessões.
    pub fn hash(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.update(b".");
        hasher.update(self.pepper.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_long_and_unique() {
        let codec = TokenCodec::new("pepper");
        let a = codec.issue().unwrap();
        let b = codec.issue().unwrap();

        assert_ne!(a, b);
        // 48 bytes em base64 sem padding = 64 caracteres
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_is_deterministic_per_pepper() {
        let codec = TokenCodec::new("pepper");
        assert_eq!(codec.hash("abc"), codec.hash("abc"));
        assert_ne!(codec.hash("abc"), codec.hash("abd"));

        let other = TokenCodec::new("other-pepper");
        assert_ne!(codec.hash("abc"), other.hash("abc"));
    }

    #[test]
    fn hash_matches_peppered_sha256_hex() {
        let codec = TokenCodec::new("dev-pepper");
        let expected = hex::encode(Sha256::digest(b"tok.dev-pepper"));
        assert_eq!(codec.hash("tok"), expected);
        assert_eq!(codec.hash("tok").len(), 64);
    }
}
