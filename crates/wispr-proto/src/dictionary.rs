//! Attribute dictionary: a read-only table mapping codes to names and
//! wire kinds, plus the vendor tables for the two vendors this server
//! provisions. Immutable after startup; lookups are plain static scans.

use crate::attributes::{Attribute, Vsa, MICROSOFT, MIKROTIK};
use std::net::Ipv4Addr;

/// Wire representation of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    String,
    Binary,
    U32,
    Ipv4,
    Vsa,
}

/// One dictionary row
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    pub code: u8,
    pub name: &'static str,
    pub kind: AttrKind,
    /// `Some(vendor_id)` for vendor sub-attributes, `None` for standard ones
    pub vendor: Option<u32>,
}

const ENTRIES: &[DictEntry] = &[
    DictEntry { code: 1, name: "User-Name", kind: AttrKind::String, vendor: None },
    DictEntry { code: 2, name: "User-Password", kind: AttrKind::Binary, vendor: None },
    DictEntry { code: 3, name: "CHAP-Password", kind: AttrKind::Binary, vendor: None },
    DictEntry { code: 4, name: "NAS-IP-Address", kind: AttrKind::Ipv4, vendor: None },
    DictEntry { code: 5, name: "NAS-Port", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 6, name: "Service-Type", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 7, name: "Framed-Protocol", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 8, name: "Framed-IP-Address", kind: AttrKind::Ipv4, vendor: None },
    DictEntry { code: 11, name: "Filter-Id", kind: AttrKind::String, vendor: None },
    DictEntry { code: 18, name: "Reply-Message", kind: AttrKind::String, vendor: None },
    DictEntry { code: 26, name: "Vendor-Specific", kind: AttrKind::Vsa, vendor: None },
    DictEntry { code: 27, name: "Session-Timeout", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 28, name: "Idle-Timeout", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 30, name: "Called-Station-Id", kind: AttrKind::String, vendor: None },
    DictEntry { code: 31, name: "Calling-Station-Id", kind: AttrKind::String, vendor: None },
    DictEntry { code: 32, name: "NAS-Identifier", kind: AttrKind::String, vendor: None },
    DictEntry { code: 40, name: "Acct-Status-Type", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 42, name: "Acct-Input-Octets", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 43, name: "Acct-Output-Octets", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 44, name: "Acct-Session-Id", kind: AttrKind::String, vendor: None },
    DictEntry { code: 45, name: "Acct-Authentic", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 46, name: "Acct-Session-Time", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 49, name: "Acct-Terminate-Cause", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 52, name: "Acct-Input-Gigawords", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 53, name: "Acct-Output-Gigawords", kind: AttrKind::U32, vendor: None },
    DictEntry { code: 60, name: "CHAP-Challenge", kind: AttrKind::Binary, vendor: None },
    // Microsoft (311), RFC 2548
    DictEntry { code: 1, name: "MS-CHAP-Response", kind: AttrKind::Binary, vendor: Some(MICROSOFT) },
    DictEntry { code: 2, name: "MS-CHAP-Error", kind: AttrKind::String, vendor: Some(MICROSOFT) },
    DictEntry { code: 11, name: "MS-CHAP-Challenge", kind: AttrKind::Binary, vendor: Some(MICROSOFT) },
    DictEntry { code: 25, name: "MS-CHAP2-Response", kind: AttrKind::Binary, vendor: Some(MICROSOFT) },
    DictEntry { code: 26, name: "MS-CHAP2-Success", kind: AttrKind::Binary, vendor: Some(MICROSOFT) },
    // MikroTik (14988)
    DictEntry { code: 3, name: "Mikrotik-Group", kind: AttrKind::String, vendor: Some(MIKROTIK) },
    DictEntry { code: 8, name: "Mikrotik-Rate-Limit", kind: AttrKind::String, vendor: Some(MIKROTIK) },
];

/// Decoded attribute value, typed per the dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Binary(Vec<u8>),
    U32(u32),
    Ipv4(Ipv4Addr),
    Vsa(Vsa),
}

/// Dictionary row for a standard attribute code
pub fn lookup(code: u8) -> Option<&'static DictEntry> {
    ENTRIES.iter().find(|e| e.vendor.is_none() && e.code == code)
}

/// Dictionary row for a vendor sub-attribute
pub fn lookup_vendor(vendor_id: u32, code: u8) -> Option<&'static DictEntry> {
    ENTRIES
        .iter()
        .find(|e| e.vendor == Some(vendor_id) && e.code == code)
}

/// Attribute code for a standard attribute name
pub fn code_of(name: &str) -> Option<u8> {
    ENTRIES
        .iter()
        .find(|e| e.vendor.is_none() && e.name == name)
        .map(|e| e.code)
}

pub fn vendor_name(vendor_id: u32) -> Option<&'static str> {
    match vendor_id {
        MICROSOFT => Some("Microsoft"),
        MIKROTIK => Some("Mikrotik"),
        _ => None,
    }
}

/// Render an attribute with its dictionary kind. Unknown attributes and
/// values that do not fit their declared kind come back as `Binary`.
pub fn decode_value(attr: &Attribute) -> AttributeValue {
    let kind = lookup(attr.attr_type).map(|e| e.kind).unwrap_or(AttrKind::Binary);
    match kind {
        AttrKind::String => match attr.as_string() {
            Ok(s) => AttributeValue::String(s),
            Err(_) => AttributeValue::Binary(attr.value.clone()),
        },
        AttrKind::U32 => match attr.as_integer() {
            Ok(v) => AttributeValue::U32(v),
            Err(_) => AttributeValue::Binary(attr.value.clone()),
        },
        AttrKind::Ipv4 => match attr.as_ipv4() {
            Ok(octets) => AttributeValue::Ipv4(Ipv4Addr::from(octets)),
            Err(_) => AttributeValue::Binary(attr.value.clone()),
        },
        AttrKind::Vsa => match Vsa::decode_all(&attr.value).into_iter().next() {
            Some(vsa) => AttributeValue::Vsa(vsa),
            None => AttributeValue::Binary(attr.value.clone()),
        },
        AttrKind::Binary => AttributeValue::Binary(attr.value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeType;

    #[test]
    fn standard_lookups() {
        assert_eq!(lookup(1).unwrap().name, "User-Name");
        assert_eq!(lookup(44).unwrap().name, "Acct-Session-Id");
        assert_eq!(code_of("CHAP-Challenge"), Some(60));
        assert!(lookup(200).is_none());
    }

    #[test]
    fn vendor_lookups() {
        assert_eq!(
            lookup_vendor(MICROSOFT, 25).unwrap().name,
            "MS-CHAP2-Response"
        );
        assert_eq!(
            lookup_vendor(MIKROTIK, 8).unwrap().name,
            "Mikrotik-Rate-Limit"
        );
        assert_eq!(vendor_name(MICROSOFT), Some("Microsoft"));
        assert!(lookup_vendor(9, 1).is_none());
    }

    #[test]
    fn typed_rendering() {
        let name = Attribute::string(AttributeType::UserName, "alice").unwrap();
        assert_eq!(
            decode_value(&name),
            AttributeValue::String("alice".to_string())
        );

        let timeout = Attribute::integer(AttributeType::SessionTimeout, 600).unwrap();
        assert_eq!(decode_value(&timeout), AttributeValue::U32(600));

        let ip = Attribute::ipv4(AttributeType::FramedIpAddress, [10, 0, 0, 5]).unwrap();
        assert_eq!(
            decode_value(&ip),
            AttributeValue::Ipv4(Ipv4Addr::new(10, 0, 0, 5))
        );
    }

    #[test]
    fn unknown_code_falls_back_to_binary() {
        let attr = Attribute::raw(199, vec![1, 2, 3]).unwrap();
        assert_eq!(decode_value(&attr), AttributeValue::Binary(vec![1, 2, 3]));
    }

    #[test]
    fn malformed_integer_falls_back_to_binary() {
        let attr = Attribute::raw(27, vec![1, 2]).unwrap();
        assert_eq!(decode_value(&attr), AttributeValue::Binary(vec![1, 2]));
    }
}
