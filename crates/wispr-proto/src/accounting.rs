//! Accounting value types (RFC 2866) and 64-bit counter reconstruction.

/// Acct-Status-Type values (RFC 2866 Section 5.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcctStatusType {
    /// Start (1) - session has begun
    Start = 1,
    /// Stop (2) - session has ended
    Stop = 2,
    /// Interim-Update (3) - periodic counters for a live session
    InterimUpdate = 3,
    /// Accounting-On (7) - NAS came up
    AccountingOn = 7,
    /// Accounting-Off (8) - NAS going down
    AccountingOff = 8,
}

impl AcctStatusType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AcctStatusType::Start),
            2 => Some(AcctStatusType::Stop),
            3 => Some(AcctStatusType::InterimUpdate),
            7 => Some(AcctStatusType::AccountingOn),
            8 => Some(AcctStatusType::AccountingOff),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Start, Stop and Interim-Update mutate a session row; On/Off are
    /// NAS lifecycle notices that are only logged and acknowledged.
    pub fn is_session_status(self) -> bool {
        matches!(
            self,
            AcctStatusType::Start | AcctStatusType::Stop | AcctStatusType::InterimUpdate
        )
    }
}

/// Acct-Terminate-Cause values (RFC 2866 Section 5.10)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcctTerminateCause {
    UserRequest = 1,
    LostCarrier = 2,
    LostService = 3,
    IdleTimeout = 4,
    SessionTimeout = 5,
    AdminReset = 6,
    AdminReboot = 7,
    PortError = 8,
    NasError = 9,
    NasRequest = 10,
    NasReboot = 11,
    PortUnneeded = 12,
    PortPreempted = 13,
    PortSuspended = 14,
    ServiceUnavailable = 15,
    Callback = 16,
    UserError = 17,
    HostRequest = 18,
}

impl AcctTerminateCause {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AcctTerminateCause::UserRequest),
            2 => Some(AcctTerminateCause::LostCarrier),
            3 => Some(AcctTerminateCause::LostService),
            4 => Some(AcctTerminateCause::IdleTimeout),
            5 => Some(AcctTerminateCause::SessionTimeout),
            6 => Some(AcctTerminateCause::AdminReset),
            7 => Some(AcctTerminateCause::AdminReboot),
            8 => Some(AcctTerminateCause::PortError),
            9 => Some(AcctTerminateCause::NasError),
            10 => Some(AcctTerminateCause::NasRequest),
            11 => Some(AcctTerminateCause::NasReboot),
            12 => Some(AcctTerminateCause::PortUnneeded),
            13 => Some(AcctTerminateCause::PortPreempted),
            14 => Some(AcctTerminateCause::PortSuspended),
            15 => Some(AcctTerminateCause::ServiceUnavailable),
            16 => Some(AcctTerminateCause::Callback),
            17 => Some(AcctTerminateCause::UserError),
            18 => Some(AcctTerminateCause::HostRequest),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Dotted name as persisted in session rows
    pub fn as_str(self) -> &'static str {
        match self {
            AcctTerminateCause::UserRequest => "User-Request",
            AcctTerminateCause::LostCarrier => "Lost-Carrier",
            AcctTerminateCause::LostService => "Lost-Service",
            AcctTerminateCause::IdleTimeout => "Idle-Timeout",
            AcctTerminateCause::SessionTimeout => "Session-Timeout",
            AcctTerminateCause::AdminReset => "Admin-Reset",
            AcctTerminateCause::AdminReboot => "Admin-Reboot",
            AcctTerminateCause::PortError => "Port-Error",
            AcctTerminateCause::NasError => "NAS-Error",
            AcctTerminateCause::NasRequest => "NAS-Request",
            AcctTerminateCause::NasReboot => "NAS-Reboot",
            AcctTerminateCause::PortUnneeded => "Port-Unneeded",
            AcctTerminateCause::PortPreempted => "Port-Preempted",
            AcctTerminateCause::PortSuspended => "Port-Suspended",
            AcctTerminateCause::ServiceUnavailable => "Service-Unavailable",
            AcctTerminateCause::Callback => "Callback",
            AcctTerminateCause::UserError => "User-Error",
            AcctTerminateCause::HostRequest => "Host-Request",
        }
    }
}

/// Reassemble a 64-bit byte counter from the 32-bit Acct-*-Octets value
/// and its Acct-*-Gigawords overflow companion (RFC 2869 Section 5.1).
pub fn total_octets(octets: u32, gigawords: u32) -> u64 {
    u64::from(octets) + (u64::from(gigawords) << 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_type_conversion() {
        assert_eq!(AcctStatusType::Start.as_u32(), 1);
        assert_eq!(AcctStatusType::from_u32(2), Some(AcctStatusType::Stop));
        assert_eq!(
            AcctStatusType::from_u32(3),
            Some(AcctStatusType::InterimUpdate)
        );
        assert_eq!(AcctStatusType::from_u32(99), None);
    }

    #[test]
    fn session_status_classification() {
        assert!(AcctStatusType::Start.is_session_status());
        assert!(AcctStatusType::InterimUpdate.is_session_status());
        assert!(!AcctStatusType::AccountingOn.is_session_status());
        assert!(!AcctStatusType::AccountingOff.is_session_status());
    }

    #[test]
    fn terminate_cause_names() {
        assert_eq!(AcctTerminateCause::UserRequest.as_str(), "User-Request");
        assert_eq!(
            AcctTerminateCause::from_u32(4),
            Some(AcctTerminateCause::IdleTimeout)
        );
        assert_eq!(AcctTerminateCause::from_u32(0), None);
    }

    #[test]
    fn gigaword_arithmetic() {
        assert_eq!(total_octets(0, 0), 0);
        assert_eq!(total_octets(1000, 1), 4_294_968_296);
        assert_eq!(total_octets(u32::MAX, 0), 4_294_967_295);
        assert_eq!(
            total_octets(u32::MAX, u32::MAX),
            (u64::from(u32::MAX) << 32) + u64::from(u32::MAX)
        );
    }
}
