//! Packet authenticator math and User-Password hiding (RFC 2865).

use crate::packet::{Packet, PacketError};
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("encrypted password length {0} is not a multiple of 16")]
    BadLength(usize),
    #[error("password longer than 128 bytes")]
    TooLong,
    #[error("decrypted password is not valid UTF-8")]
    InvalidUtf8,
}

/// Random 16-byte Request Authenticator (RFC 2865 Section 3)
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::rng().fill(&mut authenticator);
    authenticator
}

/// Response Authenticator (RFC 2865 Section 3):
/// `MD5(Code || Id || Length || RequestAuth || Attributes || Secret)`
///
/// Used for Access-Accept/Reject and Accounting-Response packets.
pub fn calculate_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let length = response.length();

    let mut data = Vec::with_capacity(length + secret.len());
    data.push(response.code.as_u8());
    data.push(response.identifier);
    data.extend_from_slice(&(length as u16).to_be_bytes());
    data.extend_from_slice(request_authenticator);
    for attr in &response.attributes {
        attr.encode_into(&mut data)
            .map_err(|e| PacketError::Attribute(e.to_string()))?;
    }
    data.extend_from_slice(secret);

    Ok(md5::compute(&data).0)
}

/// Check a response's authenticator against the request it answers
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    match calculate_response_authenticator(response, request_authenticator, secret) {
        Ok(expected) => response.authenticator == expected,
        Err(_) => false,
    }
}

/// Hide a User-Password value (RFC 2865 Section 5.2).
///
/// The password is NUL-padded to a multiple of 16 and each block is
/// XORed with `MD5(secret || b_prev)`, where `b_0` is the Request
/// Authenticator and `b_i` the previous ciphertext block.
pub fn encrypt_user_password(
    password: &str,
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PasswordError> {
    let bytes = password.as_bytes();
    if bytes.len() > 128 {
        return Err(PasswordError::TooLong);
    }

    let blocks = bytes.len().div_ceil(16).max(1);
    let mut padded = bytes.to_vec();
    padded.resize(blocks * 16, 0);

    let mut out = Vec::with_capacity(padded.len());
    let mut prev: [u8; 16] = *authenticator;
    for chunk in padded.chunks_exact(16) {
        let mut keyed = secret.to_vec();
        keyed.extend_from_slice(&prev);
        let digest = md5::compute(&keyed).0;

        let mut block = [0u8; 16];
        for (i, b) in block.iter_mut().enumerate() {
            *b = chunk[i] ^ digest[i];
        }
        out.extend_from_slice(&block);
        prev = block;
    }
    Ok(out)
}

/// Recover a User-Password value (RFC 2865 Section 5.2), stripping the
/// trailing NUL padding.
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PasswordError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 {
        return Err(PasswordError::BadLength(encrypted.len()));
    }

    let mut plain = Vec::with_capacity(encrypted.len());
    let mut prev: &[u8] = authenticator;
    for chunk in encrypted.chunks_exact(16) {
        let mut keyed = secret.to_vec();
        keyed.extend_from_slice(prev);
        let digest = md5::compute(&keyed).0;

        for (i, d) in digest.iter().enumerate() {
            plain.push(chunk[i] ^ d);
        }
        prev = chunk;
    }

    while plain.last() == Some(&0) {
        plain.pop();
    }
    String::from_utf8(plain).map_err(|_| PasswordError::InvalidUtf8)
}
