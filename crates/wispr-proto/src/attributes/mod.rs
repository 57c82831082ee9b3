mod attribute;
mod types;
mod vsa;

pub use attribute::{Attribute, AttributeError};
pub use types::AttributeType;
pub use vsa::{Vsa, MICROSOFT, MIKROTIK};
pub use vsa::{
    MS_CHAP2_RESPONSE, MS_CHAP2_SUCCESS, MS_CHAP_CHALLENGE, MS_CHAP_ERROR, MS_CHAP_RESPONSE,
    MT_GROUP, MT_RATE_LIMIT,
};
