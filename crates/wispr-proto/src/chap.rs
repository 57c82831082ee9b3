//! CHAP verification (RFC 1994 via RFC 2865 Section 5.3).
//!
//! The NAS sends a 17-byte CHAP-Password attribute: one identifier octet
//! followed by `MD5(ident || password || challenge)`. The challenge is the
//! CHAP-Challenge attribute when present, otherwise the Request
//! Authenticator.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChapError {
    #[error("CHAP-Password must be 17 bytes, got {0}")]
    InvalidLength(usize),
}

/// Parsed CHAP-Password attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapResponse {
    pub ident: u8,
    pub response: [u8; 16],
}

impl ChapResponse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChapError> {
        if bytes.len() != 17 {
            return Err(ChapError::InvalidLength(bytes.len()));
        }
        let mut response = [0u8; 16];
        response.copy_from_slice(&bytes[1..]);
        Ok(ChapResponse {
            ident: bytes[0],
            response,
        })
    }
}

/// `MD5(ident || password || challenge)`
pub fn compute_chap_response(ident: u8, password: &str, challenge: &[u8]) -> [u8; 16] {
    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(ident);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(challenge);
    md5::compute(&data).0
}

/// Verify a CHAP response against the cleartext password
pub fn verify_chap_response(response: &ChapResponse, password: &str, challenge: &[u8]) -> bool {
    compute_chap_response(response.ident, password, challenge) == response.response
}
