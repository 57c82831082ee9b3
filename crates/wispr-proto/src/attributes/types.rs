/// RADIUS attribute types used by this server (RFC 2865, RFC 2866, RFC 2869)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1)
    UserName = 1,
    /// User-Password (2)
    UserPassword = 2,
    /// CHAP-Password (3)
    ChapPassword = 3,
    /// NAS-IP-Address (4)
    NasIpAddress = 4,
    /// NAS-Port (5)
    NasPort = 5,
    /// Service-Type (6)
    ServiceType = 6,
    /// Framed-Protocol (7)
    FramedProtocol = 7,
    /// Framed-IP-Address (8)
    FramedIpAddress = 8,
    /// Filter-Id (11)
    FilterId = 11,
    /// Reply-Message (18)
    ReplyMessage = 18,
    /// Vendor-Specific (26)
    VendorSpecific = 26,
    /// Session-Timeout (27)
    SessionTimeout = 27,
    /// Idle-Timeout (28)
    IdleTimeout = 28,
    /// Called-Station-Id (30)
    CalledStationId = 30,
    /// Calling-Station-Id (31)
    CallingStationId = 31,
    /// NAS-Identifier (32)
    NasIdentifier = 32,
    /// Acct-Status-Type (40) - RFC 2866
    AcctStatusType = 40,
    /// Acct-Input-Octets (42) - RFC 2866
    AcctInputOctets = 42,
    /// Acct-Output-Octets (43) - RFC 2866
    AcctOutputOctets = 43,
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId = 44,
    /// Acct-Authentic (45) - RFC 2866
    AcctAuthentic = 45,
    /// Acct-Session-Time (46) - RFC 2866
    AcctSessionTime = 46,
    /// Acct-Terminate-Cause (49) - RFC 2866
    AcctTerminateCause = 49,
    /// Acct-Input-Gigawords (52) - RFC 2869, high 32 bits of the input counter
    AcctInputGigawords = 52,
    /// Acct-Output-Gigawords (53) - RFC 2869, high 32 bits of the output counter
    AcctOutputGigawords = 53,
    /// CHAP-Challenge (60)
    ChapChallenge = 60,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            2 => Some(AttributeType::UserPassword),
            3 => Some(AttributeType::ChapPassword),
            4 => Some(AttributeType::NasIpAddress),
            5 => Some(AttributeType::NasPort),
            6 => Some(AttributeType::ServiceType),
            7 => Some(AttributeType::FramedProtocol),
            8 => Some(AttributeType::FramedIpAddress),
            11 => Some(AttributeType::FilterId),
            18 => Some(AttributeType::ReplyMessage),
            26 => Some(AttributeType::VendorSpecific),
            27 => Some(AttributeType::SessionTimeout),
            28 => Some(AttributeType::IdleTimeout),
            30 => Some(AttributeType::CalledStationId),
            31 => Some(AttributeType::CallingStationId),
            32 => Some(AttributeType::NasIdentifier),
            40 => Some(AttributeType::AcctStatusType),
            42 => Some(AttributeType::AcctInputOctets),
            43 => Some(AttributeType::AcctOutputOctets),
            44 => Some(AttributeType::AcctSessionId),
            45 => Some(AttributeType::AcctAuthentic),
            46 => Some(AttributeType::AcctSessionTime),
            49 => Some(AttributeType::AcctTerminateCause),
            52 => Some(AttributeType::AcctInputGigawords),
            53 => Some(AttributeType::AcctOutputGigawords),
            60 => Some(AttributeType::ChapChallenge),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
