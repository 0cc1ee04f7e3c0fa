//! Request authentication.
//!
//! The platform signs `timestamp || raw body` with the application's ed25519
//! key. Verification always runs over the raw bytes, before any JSON parsing.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use pullbot_core::InteractionError;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("public key is not valid hex")]
    MalformedPublicKey,
    #[error("public key is not a valid ed25519 point")]
    InvalidPublicKey,
}

#[derive(Clone, Copy, Debug)]
pub struct SignedRequest<'a> {
    pub body: &'a [u8],
    pub signature: &'a str,
    pub timestamp: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verification<'a> {
    pub valid: bool,
    pub body: &'a [u8],
}

impl<'a> Verification<'a> {
    pub fn into_body(self) -> Result<&'a [u8], InteractionError> {
        if self.valid {
            Ok(self.body)
        } else {
            Err(InteractionError::InvalidSignature)
        }
    }
}

/// Holds the configured verification key. Built once at startup and shared
/// read-only between requests.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_key.trim()).map_err(|_| SignatureError::MalformedPublicKey)?;
        let bytes: [u8; 32] =
            bytes.try_into().map_err(|_| SignatureError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    pub fn verify<'a>(&self, request: SignedRequest<'a>) -> Verification<'a> {
        let valid = decode_signature(request.signature)
            .map(|signature| {
                let mut message =
                    Vec::with_capacity(request.timestamp.len() + request.body.len());
                message.extend_from_slice(request.timestamp.as_bytes());
                message.extend_from_slice(request.body);
                self.key.verify(&message, &signature).is_ok()
            })
            .unwrap_or(false);

        Verification { valid, body: request.body }
    }
}

fn decode_signature(signature: &str) -> Option<Signature> {
    let bytes = hex::decode(signature.trim()).ok()?;
    let bytes: [u8; 64] = bytes.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}
