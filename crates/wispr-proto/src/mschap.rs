//! MS-CHAP (RFC 2433) and MS-CHAPv2 (RFC 2759) verification.
//!
//! Both protocols prove knowledge of the NT hash (MD4 over the UTF-16LE
//! password) by DES-encrypting a challenge under three keys cut from the
//! hash. The server never needs the cleartext password, only the hash.
//! MS-CHAPv2 additionally requires the server to prove itself back with
//! an authenticator response string carried in the MS-CHAP2-Success VSA.

use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use md4::{Digest, Md4};
use sha1::Sha1;
use thiserror::Error;

/// RFC 2759 Section 8.7, literal server-signing constant
const MAGIC_SERVER: &[u8] = b"Magic server to client signing constant";
/// RFC 2759 Section 8.7, literal pad constant
const MAGIC_PAD: &[u8] = b"Pad to make it do more than one iteration";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsChapError {
    #[error("MS-CHAP response must be 50 bytes, got {0}")]
    InvalidResponseLength(usize),
    #[error("MS-CHAP challenge must be {expected} bytes, got {got}")]
    InvalidChallengeLength { expected: usize, got: usize },
}

/// NT hash: MD4 over the password encoded as UTF-16LE, no BOM or
/// terminator (RFC 2759 NtPasswordHash).
pub fn nt_password_hash(password: &str) -> [u8; 16] {
    let utf16le: Vec<u8> = password
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    let mut md4 = Md4::new();
    md4.update(&utf16le);
    md4.finalize().into()
}

/// MD4 of the NT hash itself (RFC 2759 HashNtPasswordHash)
pub fn password_hash_hash(nt_hash: &[u8; 16]) -> [u8; 16] {
    let mut md4 = Md4::new();
    md4.update(nt_hash);
    md4.finalize().into()
}

/// Spread 56 key bits over 8 octets, low bit of each left zero for the
/// parity slot. The DES rounds never read the parity bits.
fn des_key_7_to_8(key7: &[u8]) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[0] = key7[0] & 0xFE;
    key[1] = ((key7[0] << 7) | (key7[1] >> 1)) & 0xFE;
    key[2] = ((key7[1] << 6) | (key7[2] >> 2)) & 0xFE;
    key[3] = ((key7[2] << 5) | (key7[3] >> 3)) & 0xFE;
    key[4] = ((key7[3] << 4) | (key7[4] >> 4)) & 0xFE;
    key[5] = ((key7[4] << 3) | (key7[5] >> 5)) & 0xFE;
    key[6] = ((key7[5] << 2) | (key7[6] >> 6)) & 0xFE;
    key[7] = (key7[6] << 1) & 0xFE;
    key
}

/// Single-block DES-ECB encrypt of `data8` under a 7-byte key, no padding
fn des_encrypt(key7: &[u8], data8: &[u8; 8]) -> [u8; 8] {
    let key8 = des_key_7_to_8(key7);
    // Key is always exactly 8 bytes, construction cannot fail
    let cipher = Des::new(GenericArray::from_slice(&key8));
    let mut block = GenericArray::clone_from_slice(data8);
    cipher.encrypt_block(&mut block);
    block.into()
}

/// ChallengeResponse (RFC 2759 Section 8.5): zero-pad the 16-byte hash to
/// 21 bytes, cut three 7-byte DES keys, encrypt the 8-byte challenge
/// under each and concatenate.
pub fn challenge_response(challenge: &[u8; 8], nt_hash: &[u8; 16]) -> [u8; 24] {
    let mut z = [0u8; 21];
    z[..16].copy_from_slice(nt_hash);

    let mut response = [0u8; 24];
    response[0..8].copy_from_slice(&des_encrypt(&z[0..7], challenge));
    response[8..16].copy_from_slice(&des_encrypt(&z[7..14], challenge));
    response[16..24].copy_from_slice(&des_encrypt(&z[14..21], challenge));
    response
}

/// ChallengeHash (RFC 2759 Section 8.2): first 8 bytes of
/// `SHA1(peer_challenge || auth_challenge || username)`. The username is
/// the raw User-Name attribute, no case folding or domain stripping.
pub fn challenge_hash(
    peer_challenge: &[u8; 16],
    auth_challenge: &[u8; 16],
    username: &str,
) -> [u8; 8] {
    let mut sha = Sha1::new();
    sha.update(peer_challenge);
    sha.update(auth_challenge);
    sha.update(username.as_bytes());
    let digest = sha.finalize();
    digest[..8].try_into().unwrap()
}

/// GenerateNTResponse (RFC 2759 Section 8.1)
pub fn generate_nt_response(
    auth_challenge: &[u8; 16],
    peer_challenge: &[u8; 16],
    username: &str,
    nt_hash: &[u8; 16],
) -> [u8; 24] {
    let challenge = challenge_hash(peer_challenge, auth_challenge, username);
    challenge_response(&challenge, nt_hash)
}

/// GenerateAuthenticatorResponse (RFC 2759 Section 8.7), returned as the
/// `S=<40 uppercase hex>` string the MS-CHAP2-Success VSA carries after
/// its identifier octet.
pub fn generate_authenticator_response(
    nt_hash: &[u8; 16],
    nt_response: &[u8; 24],
    peer_challenge: &[u8; 16],
    auth_challenge: &[u8; 16],
    username: &str,
) -> String {
    let hash_hash = password_hash_hash(nt_hash);

    let mut sha = Sha1::new();
    sha.update(hash_hash);
    sha.update(nt_response);
    sha.update(MAGIC_SERVER);
    let digest = sha.finalize();

    let challenge = challenge_hash(peer_challenge, auth_challenge, username);

    let mut sha = Sha1::new();
    sha.update(digest);
    sha.update(challenge);
    sha.update(MAGIC_PAD);

    format!("S={}", hex::encode_upper(sha.finalize()))
}

/// Parsed MS-CHAP-Response VSA value (RFC 2433):
/// `ident(1) flags(1) lm_response(24) nt_response(24)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsChapResponse {
    pub ident: u8,
    pub flags: u8,
    pub lm_response: [u8; 24],
    pub nt_response: [u8; 24],
}

impl MsChapResponse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MsChapError> {
        if bytes.len() != 50 {
            return Err(MsChapError::InvalidResponseLength(bytes.len()));
        }
        Ok(MsChapResponse {
            ident: bytes[0],
            flags: bytes[1],
            lm_response: bytes[2..26].try_into().unwrap(),
            nt_response: bytes[26..50].try_into().unwrap(),
        })
    }
}

/// Parsed MS-CHAP2-Response VSA value (RFC 2759):
/// `ident(1) flags(1) peer_challenge(16) reserved(8) nt_response(24)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsChap2Response {
    pub ident: u8,
    pub flags: u8,
    pub peer_challenge: [u8; 16],
    pub nt_response: [u8; 24],
}

impl MsChap2Response {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MsChapError> {
        if bytes.len() != 50 {
            return Err(MsChapError::InvalidResponseLength(bytes.len()));
        }
        Ok(MsChap2Response {
            ident: bytes[0],
            flags: bytes[1],
            peer_challenge: bytes[2..18].try_into().unwrap(),
            // bytes[18..26] are reserved, must-be-zero but never checked
            nt_response: bytes[26..50].try_into().unwrap(),
        })
    }
}

/// Verify an MS-CHAP (v1) NT-Response. The challenge is the 8-byte
/// MS-CHAP-Challenge VSA value.
pub fn verify_mschap_response(
    challenge: &[u8],
    response: &MsChapResponse,
    nt_hash: &[u8; 16],
) -> Result<bool, MsChapError> {
    let challenge: &[u8; 8] =
        challenge
            .try_into()
            .map_err(|_| MsChapError::InvalidChallengeLength {
                expected: 8,
                got: challenge.len(),
            })?;
    Ok(challenge_response(challenge, nt_hash) == response.nt_response)
}

/// Verify an MS-CHAPv2 NT-Response. The challenge is the 16-byte
/// MS-CHAP-Challenge VSA value; the peer challenge rides in the response.
pub fn verify_mschap2_response(
    auth_challenge: &[u8],
    username: &str,
    response: &MsChap2Response,
    nt_hash: &[u8; 16],
) -> Result<bool, MsChapError> {
    let auth_challenge: &[u8; 16] =
        auth_challenge
            .try_into()
            .map_err(|_| MsChapError::InvalidChallengeLength {
                expected: 16,
                got: auth_challenge.len(),
            })?;
    let expected =
        generate_nt_response(auth_challenge, &response.peer_challenge, username, nt_hash);
    Ok(expected == response.nt_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2759 Section 9.2 test vectors
    const USER: &str = "User";
    const PASSWORD: &str = "clientPass";
    const AUTH_CHALLENGE: [u8; 16] = [
        0x5B, 0x5D, 0x7C, 0x7D, 0x7B, 0x3F, 0x2F, 0x3E, 0x3C, 0x2C, 0x60, 0x21, 0x32, 0x26, 0x26,
        0x28,
    ];
    const PEER_CHALLENGE: [u8; 16] = [
        0x21, 0x40, 0x23, 0x24, 0x25, 0x5E, 0x26, 0x2A, 0x28, 0x29, 0x5F, 0x2B, 0x3A, 0x33, 0x7C,
        0x7E,
    ];
    const NT_RESPONSE: [u8; 24] = [
        0x82, 0x30, 0x9E, 0xCD, 0x8D, 0x70, 0x8B, 0x5E, 0xA0, 0x8F, 0xAA, 0x39, 0x81, 0xCD, 0x83,
        0x54, 0x42, 0x33, 0x11, 0x4A, 0x3D, 0x85, 0xD6, 0xDF,
    ];

    #[test]
    fn rfc2759_nt_password_hash() {
        assert_eq!(
            hex::encode_upper(nt_password_hash(PASSWORD)),
            "44EBBA8D5312B8D611474411F56989AE"
        );
    }

    #[test]
    fn rfc2759_password_hash_hash() {
        let hash = nt_password_hash(PASSWORD);
        assert_eq!(
            hex::encode_upper(password_hash_hash(&hash)),
            "41C00C584BD2D91C4017A2A12FA59F3F"
        );
    }

    #[test]
    fn rfc2759_challenge_hash() {
        assert_eq!(
            hex::encode_upper(challenge_hash(&PEER_CHALLENGE, &AUTH_CHALLENGE, USER)),
            "D02E4386BCE91226"
        );
    }

    #[test]
    fn rfc2759_nt_response() {
        let hash = nt_password_hash(PASSWORD);
        let response = generate_nt_response(&AUTH_CHALLENGE, &PEER_CHALLENGE, USER, &hash);
        assert_eq!(response, NT_RESPONSE);
    }

    #[test]
    fn rfc2759_authenticator_response() {
        let hash = nt_password_hash(PASSWORD);
        let auth_response = generate_authenticator_response(
            &hash,
            &NT_RESPONSE,
            &PEER_CHALLENGE,
            &AUTH_CHALLENGE,
            USER,
        );
        assert_eq!(auth_response, "S=407A5589115FD0D6209F510FE9C04566932CDA56");
    }

    #[test]
    fn mschap2_response_parse_and_verify() {
        let hash = nt_password_hash(PASSWORD);

        let mut bytes = vec![0x01, 0x00];
        bytes.extend_from_slice(&PEER_CHALLENGE);
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&NT_RESPONSE);
        let response = MsChap2Response::from_bytes(&bytes).unwrap();
        assert_eq!(response.ident, 0x01);
        assert_eq!(response.peer_challenge, PEER_CHALLENGE);

        assert!(verify_mschap2_response(&AUTH_CHALLENGE, USER, &response, &hash).unwrap());

        let wrong_hash = nt_password_hash("wrongPass");
        assert!(!verify_mschap2_response(&AUTH_CHALLENGE, USER, &response, &wrong_hash).unwrap());
    }

    #[test]
    fn mschap2_challenge_length_checked() {
        let response = MsChap2Response {
            ident: 0,
            flags: 0,
            peer_challenge: PEER_CHALLENGE,
            nt_response: NT_RESPONSE,
        };
        let hash = nt_password_hash(PASSWORD);
        assert!(verify_mschap2_response(&[0u8; 8], USER, &response, &hash).is_err());
    }

    #[test]
    fn mschap_v1_verify() {
        let challenge = [0x10u8, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17];
        let hash = nt_password_hash("secret");
        let nt = challenge_response(&challenge, &hash);

        let mut bytes = vec![0x05, 0x01];
        bytes.extend_from_slice(&[0u8; 24]);
        bytes.extend_from_slice(&nt);
        let response = MsChapResponse::from_bytes(&bytes).unwrap();

        assert!(verify_mschap_response(&challenge, &response, &hash).unwrap());
        let wrong = nt_password_hash("other");
        assert!(!verify_mschap_response(&challenge, &response, &wrong).unwrap());
    }

    #[test]
    fn response_length_enforced() {
        assert!(MsChapResponse::from_bytes(&[0u8; 49]).is_err());
        assert!(MsChap2Response::from_bytes(&[0u8; 51]).is_err());
    }

    #[test]
    fn des_key_expansion_keeps_parity_slot_clear() {
        let key = des_key_7_to_8(&[0xFF; 7]);
        for byte in key {
            assert_eq!(byte & 0x01, 0);
        }
    }
}
