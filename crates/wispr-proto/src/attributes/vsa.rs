//! Vendor-Specific Attribute (RFC 2865 Section 5.26) handling.
//!
//! A type-26 attribute value carries `vendor_id(4)` followed by one or
//! more nested `type(1) length(1) value(length-2)` sub-attributes. The
//! two vendors this server understands are Microsoft (MS-CHAP family)
//! and MikroTik (group / rate-limit provisioning).

use super::{Attribute, AttributeError, AttributeType};

/// Microsoft vendor id (RFC 2548)
pub const MICROSOFT: u32 = 311;
/// MikroTik vendor id
pub const MIKROTIK: u32 = 14988;

/// MS-CHAP-Response (Microsoft 1)
pub const MS_CHAP_RESPONSE: u8 = 1;
/// MS-CHAP-Error (Microsoft 2)
pub const MS_CHAP_ERROR: u8 = 2;
/// MS-CHAP-Challenge (Microsoft 11)
pub const MS_CHAP_CHALLENGE: u8 = 11;
/// MS-CHAP2-Response (Microsoft 25)
pub const MS_CHAP2_RESPONSE: u8 = 25;
/// MS-CHAP2-Success (Microsoft 26)
pub const MS_CHAP2_SUCCESS: u8 = 26;

/// Mikrotik-Group (MikroTik 3)
pub const MT_GROUP: u8 = 3;
/// Mikrotik-Rate-Limit (MikroTik 8)
pub const MT_RATE_LIMIT: u8 = 8;

/// One parsed vendor sub-attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vsa {
    pub vendor_id: u32,
    pub vsa_type: u8,
    pub value: Vec<u8>,
}

impl Vsa {
    pub fn new(vendor_id: u32, vsa_type: u8, value: Vec<u8>) -> Self {
        Vsa {
            vendor_id,
            vsa_type,
            value,
        }
    }

    pub fn string(vendor_id: u32, vsa_type: u8, value: impl Into<String>) -> Self {
        Vsa::new(vendor_id, vsa_type, value.into().into_bytes())
    }

    /// Parse every sub-attribute out of a type-26 attribute value.
    ///
    /// Returns an empty vec when the payload is too short to hold a
    /// vendor id. Zero-length sub-attribute values are skipped rather
    /// than treated as a parse error; a sub-attribute whose length field
    /// overruns the payload ends the scan (the NAS sent garbage, keep
    /// whatever parsed cleanly).
    pub fn decode_all(payload: &[u8]) -> Vec<Vsa> {
        let mut out = Vec::new();
        if payload.len() < 4 {
            return out;
        }
        let vendor_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);

        let mut rest = &payload[4..];
        while rest.len() >= 2 {
            let vsa_type = rest[0];
            let length = rest[1] as usize;
            if length < 2 || length > rest.len() {
                break;
            }
            if length > 2 {
                out.push(Vsa {
                    vendor_id,
                    vsa_type,
                    value: rest[2..length].to_vec(),
                });
            }
            rest = &rest[length..];
        }
        out
    }

    /// Emit as a complete Vendor-Specific attribute
    pub fn encode(&self) -> Result<Attribute, AttributeError> {
        let mut payload = Vec::with_capacity(4 + 2 + self.value.len());
        payload.extend_from_slice(&self.vendor_id.to_be_bytes());
        payload.push(self.vsa_type);
        payload.push((self.value.len() + 2) as u8);
        payload.extend_from_slice(&self.value);
        Attribute::new(AttributeType::VendorSpecific, payload)
    }

    pub fn as_string(&self) -> Option<String> {
        String::from_utf8(self.value.clone()).ok()
    }
}
