use super::Code;
use crate::attributes::{Attribute, AttributeType, Vsa};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("unknown packet code: {0}")]
    UnknownCode(u8),
    #[error("attribute error: {0}")]
    Attribute(String),
    #[error("packet too large: {0} bytes")]
    TooLarge(usize),
}

/// RADIUS packet (RFC 2865 Section 3)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Authenticator                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// Attributes keep their wire order; scalar lookups take the first match
/// and VSA lookups scan every Vendor-Specific attribute in order.
#[derive(Debug, Clone)]
pub struct Packet {
    pub code: Code,
    /// Identifier for matching a response to its request
    pub identifier: u8,
    /// Request Authenticator on requests, Response Authenticator on replies
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Fixed header size: code + identifier + length + authenticator
    pub const HEADER_LEN: usize = 20;
    /// Maximum packet size per RFC 2865
    pub const MAX_LEN: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Total encoded length of this packet
    pub fn length(&self) -> usize {
        Self::HEADER_LEN
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Encode to wire bytes, filling in the Length field
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let total = self.length();
        if total > Self::MAX_LEN {
            return Err(PacketError::TooLarge(total));
        }

        let mut buf = Vec::with_capacity(total);
        buf.push(self.code.as_u8());
        buf.push(self.identifier);
        buf.extend_from_slice(&(total as u16).to_be_bytes());
        buf.extend_from_slice(&self.authenticator);
        for attr in &self.attributes {
            attr.encode_into(&mut buf)
                .map_err(|e| PacketError::Attribute(e.to_string()))?;
        }
        Ok(buf)
    }

    /// Decode from a received datagram.
    ///
    /// Rejects short headers, a Length field outside [20, datagram size]
    /// and any attribute whose length overruns the packet. The transport
    /// turns every error into a silent drop per RFC 2865 Section 3.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::HEADER_LEN {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::UnknownCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;

        if length < Self::HEADER_LEN || length > Self::MAX_LEN || length > data.len() {
            return Err(PacketError::InvalidLength(length));
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..20]);

        // Trailing bytes beyond Length are padding and ignored (RFC 2865)
        let mut rest = &data[Self::HEADER_LEN..length];
        let mut attributes = Vec::new();
        while !rest.is_empty() {
            let (attr, consumed) =
                Attribute::decode(rest).map_err(|e| PacketError::Attribute(e.to_string()))?;
            attributes.push(attr);
            rest = &rest[consumed..];
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// First attribute of the given type
    pub fn find_attribute(&self, attr_type: AttributeType) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.attr_type == attr_type.as_u8())
    }

    /// All attributes of the given type, in wire order
    pub fn find_all_attributes(&self, attr_type: AttributeType) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type == attr_type.as_u8())
            .collect()
    }

    /// First attribute value interpreted as a UTF-8 string
    pub fn attribute_string(&self, attr_type: AttributeType) -> Option<String> {
        self.find_attribute(attr_type).and_then(|a| a.as_string().ok())
    }

    /// First attribute value interpreted as a big-endian u32
    pub fn attribute_u32(&self, attr_type: AttributeType) -> Option<u32> {
        self.find_attribute(attr_type).and_then(|a| a.as_integer().ok())
    }

    /// First vendor-specific attribute matching (vendor_id, vsa_type),
    /// scanning every Vendor-Specific attribute in wire order.
    pub fn find_vsa(&self, vendor_id: u32, vsa_type: u8) -> Option<Vsa> {
        self.find_all_attributes(AttributeType::VendorSpecific)
            .into_iter()
            .flat_map(|a| Vsa::decode_all(&a.value))
            .find(|v| v.vendor_id == vendor_id && v.vsa_type == vsa_type)
    }
}
