//! Packet-level context the encoder reads
//!
//! The encoder never frames packets; it only needs the code (to pick the
//! right authenticator for Tunnel-Password) and the 16-octet authenticator
//! vector feeding the obfuscation keystreams.

/// RADIUS packet codes as defined in RFC 2865 Section 4, RFC 2866 and
/// RFC 5176
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Accounting-Request (4) - RFC 2866
    AccountingRequest = 4,
    /// Accounting-Response (5) - RFC 2866
    AccountingResponse = 5,
    /// Access-Challenge (11)
    AccessChallenge = 11,
    /// Status-Server (12) - RFC 5997
    StatusServer = 12,
    /// Status-Client (13) - RFC 5997
    StatusClient = 13,
    /// Disconnect-Request (40) - RFC 5176
    DisconnectRequest = 40,
    /// CoA-Request (43) - RFC 5176
    CoaRequest = 43,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            4 => Some(Code::AccountingRequest),
            5 => Some(Code::AccountingResponse),
            11 => Some(Code::AccessChallenge),
            12 => Some(Code::StatusServer),
            13 => Some(Code::StatusClient),
            40 => Some(Code::DisconnectRequest),
            43 => Some(Code::CoaRequest),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Read-only packet context for one encode run
///
/// For request packets `authenticator` is the request authenticator; for
/// replies it is whatever the packet builder has staged, and the matching
/// request travels separately as the `original` argument of
/// [`encode_pair`](crate::encode_pair).
#[derive(Debug, Clone)]
pub struct PacketCtx {
    pub code: Code,
    pub authenticator: [u8; 16],
}

impl PacketCtx {
    pub fn new(code: Code, authenticator: [u8; 16]) -> Self {
        PacketCtx {
            code,
            authenticator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in [
            Code::AccessRequest,
            Code::AccountingRequest,
            Code::DisconnectRequest,
            Code::CoaRequest,
        ] {
            assert_eq!(Code::from_u8(code.as_u8()), Some(code));
        }
        assert_eq!(Code::from_u8(99), None);
    }
}
