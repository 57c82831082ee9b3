//! RADIUS protocol support for wisprd.
//!
//! Implements the wire subset a small-scale access server needs:
//!
//! - Packet and attribute encoding/decoding per RFC 2865/2866, including
//!   vendor-specific attributes (Microsoft and MikroTik)
//! - Request/Response Authenticator calculation and User-Password hiding
//! - PAP, CHAP (RFC 1994), MS-CHAP (RFC 2433) and MS-CHAPv2 (RFC 2759)
//!   verification primitives
//! - Accounting value types with 64-bit octet counter reconstruction
//!
//! The crate does no I/O and never panics on untrusted input; malformed
//! wire data comes back as typed errors the caller turns into silent
//! drops per RFC 2865 Section 3.
//!
//! # Example
//!
//! ```rust
//! use wispr_proto::{Attribute, AttributeType, Code, Packet};
//! use wispr_proto::auth::{encrypt_user_password, generate_request_authenticator};
//!
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//! packet.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
//!
//! let hidden = encrypt_user_password("wonderland", b"xyzzy", &req_auth).unwrap();
//! packet.add_attribute(Attribute::new(AttributeType::UserPassword, hidden).unwrap());
//!
//! let bytes = packet.encode().unwrap();
//! assert_eq!(Packet::decode(&bytes).unwrap().identifier, 1);
//! ```

pub mod accounting;
pub mod attributes;
pub mod auth;
pub mod chap;
pub mod dictionary;
pub mod mschap;
pub mod packet;

pub use accounting::{total_octets, AcctStatusType, AcctTerminateCause};
pub use attributes::{Attribute, AttributeError, AttributeType, Vsa, MICROSOFT, MIKROTIK};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator, PasswordError,
};
pub use chap::{compute_chap_response, verify_chap_response, ChapError, ChapResponse};
pub use dictionary::{AttrKind, AttributeValue, DictEntry};
pub use mschap::{
    challenge_hash, challenge_response, generate_authenticator_response, generate_nt_response,
    nt_password_hash, password_hash_hash, verify_mschap2_response, verify_mschap_response,
    MsChap2Response, MsChapError, MsChapResponse,
};
pub use packet::{Code, Packet, PacketError};
