use super::AttributeType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("attribute value too long: {0} bytes (max {max})", max = Attribute::MAX_VALUE_LEN)]
    ValueTooLong(usize),
    #[error("invalid attribute length field: {0}")]
    InvalidLength(usize),
    #[error("attribute overruns packet: need {need}, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("expected {expected} bytes, got {got}")]
    WrongSize { expected: usize, got: usize },
    #[error("invalid UTF-8 in attribute value")]
    InvalidUtf8,
}

/// RADIUS attribute TLV (RFC 2865 Section 5)
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u8,
    pub value: Vec<u8>,
}

impl Attribute {
    /// Type + length header
    pub const HEADER_LEN: usize = 2;
    /// Length field is one byte, so a value holds at most 253 bytes
    pub const MAX_VALUE_LEN: usize = 253;

    pub fn new(attr_type: AttributeType, value: Vec<u8>) -> Result<Self, AttributeError> {
        Self::raw(attr_type.as_u8(), value)
    }

    /// Build from a raw type octet (vendor payloads, unknown attributes)
    pub fn raw(attr_type: u8, value: Vec<u8>) -> Result<Self, AttributeError> {
        if value.len() > Self::MAX_VALUE_LEN {
            return Err(AttributeError::ValueTooLong(value.len()));
        }
        Ok(Attribute { attr_type, value })
    }

    pub fn string(attr_type: AttributeType, value: impl Into<String>) -> Result<Self, AttributeError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// 32-bit big-endian integer value
    pub fn integer(attr_type: AttributeType, value: u32) -> Result<Self, AttributeError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    pub fn ipv4(attr_type: AttributeType, value: [u8; 4]) -> Result<Self, AttributeError> {
        Self::new(attr_type, value.to_vec())
    }

    pub fn encoded_length(&self) -> usize {
        Self::HEADER_LEN + self.value.len()
    }

    /// Append the TLV encoding to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), AttributeError> {
        let len = self.encoded_length();
        if self.value.len() > Self::MAX_VALUE_LEN {
            return Err(AttributeError::ValueTooLong(self.value.len()));
        }
        buf.push(self.attr_type);
        buf.push(len as u8);
        buf.extend_from_slice(&self.value);
        Ok(())
    }

    /// Decode one attribute from the front of `data`; returns the
    /// attribute and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), AttributeError> {
        if data.len() < Self::HEADER_LEN {
            return Err(AttributeError::Truncated {
                need: Self::HEADER_LEN,
                have: data.len(),
            });
        }
        let attr_type = data[0];
        let length = data[1] as usize;
        if length < Self::HEADER_LEN {
            return Err(AttributeError::InvalidLength(length));
        }
        if length > data.len() {
            return Err(AttributeError::Truncated {
                need: length,
                have: data.len(),
            });
        }
        let value = data[Self::HEADER_LEN..length].to_vec();
        Ok((Attribute { attr_type, value }, length))
    }

    pub fn as_string(&self) -> Result<String, AttributeError> {
        String::from_utf8(self.value.clone()).map_err(|_| AttributeError::InvalidUtf8)
    }

    pub fn as_integer(&self) -> Result<u32, AttributeError> {
        let bytes: [u8; 4] = self
            .value
            .as_slice()
            .try_into()
            .map_err(|_| AttributeError::WrongSize {
                expected: 4,
                got: self.value.len(),
            })?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn as_ipv4(&self) -> Result<[u8; 4], AttributeError> {
        self.value
            .as_slice()
            .try_into()
            .map_err(|_| AttributeError::WrongSize {
                expected: 4,
                got: self.value.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_attribute() {
        let attr = Attribute::string(AttributeType::UserName, "testuser").unwrap();
        assert_eq!(attr.attr_type, 1);
        assert_eq!(attr.as_string().unwrap(), "testuser");
    }

    #[test]
    fn integer_attribute() {
        let attr = Attribute::integer(AttributeType::SessionTimeout, 3600).unwrap();
        assert_eq!(attr.as_integer().unwrap(), 3600);
    }

    #[test]
    fn encode_decode() {
        let attr = Attribute::string(AttributeType::UserName, "test").unwrap();
        let mut buf = Vec::new();
        attr.encode_into(&mut buf).unwrap();
        let (decoded, consumed) = Attribute::decode(&buf).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn max_value_len_enforced() {
        assert!(Attribute::raw(1, vec![0u8; 254]).is_err());
        let attr = Attribute::raw(1, vec![0u8; 253]).unwrap();
        let mut buf = Vec::new();
        attr.encode_into(&mut buf).unwrap();
        assert_eq!(buf.len(), 255);
        assert_eq!(buf[1], 255);
    }

    #[test]
    fn truncated_value_rejected() {
        // Claims 10 bytes, only 4 present
        assert!(Attribute::decode(&[1, 10, 0, 0]).is_err());
    }

    #[test]
    fn zero_length_field_rejected() {
        assert!(Attribute::decode(&[1, 0, 0, 0]).is_err());
        assert!(Attribute::decode(&[1, 1, 0, 0]).is_err());
    }
}
