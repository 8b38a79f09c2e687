//! Status codes carried in bind and error replies.

use std::fmt;

/// Numeric status code, sent as its decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetCode {
    /// 200: request accepted.
    Success,
    /// 209: peer disconnected.
    Disconnected,
    /// 210: pairing code carried no client id.
    QrNoClientId,
    /// 211: app id not received in time.
    AppIdTimeout,
    /// 400: identifier already paired.
    AlreadyBound,
    /// 401: target not found.
    TargetNotFound,
    /// 402: not paired.
    NotBound,
    /// 403: message is not valid JSON or grammar.
    InvalidFormat,
    /// 404: receiver offline or unknown.
    ReceiverOffline,
    /// 405: message too long.
    TooLong,
    /// 500: internal error.
    Internal,
}

impl RetCode {
    /// Numeric value.
    pub const fn code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Disconnected => 209,
            Self::QrNoClientId => 210,
            Self::AppIdTimeout => 211,
            Self::AlreadyBound => 400,
            Self::TargetNotFound => 401,
            Self::NotBound => 402,
            Self::InvalidFormat => 403,
            Self::ReceiverOffline => 404,
            Self::TooLong => 405,
            Self::Internal => 500,
        }
    }

    /// Decimal text as sent on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "200",
            Self::Disconnected => "209",
            Self::QrNoClientId => "210",
            Self::AppIdTimeout => "211",
            Self::AlreadyBound => "400",
            Self::TargetNotFound => "401",
            Self::NotBound => "402",
            Self::InvalidFormat => "403",
            Self::ReceiverOffline => "404",
            Self::TooLong => "405",
            Self::Internal => "500",
        }
    }

    /// Look up a code from its wire text.
    pub fn from_wire(text: &str) -> Option<Self> {
        const ALL: [RetCode; 11] = [
            RetCode::Success,
            RetCode::Disconnected,
            RetCode::QrNoClientId,
            RetCode::AppIdTimeout,
            RetCode::AlreadyBound,
            RetCode::TargetNotFound,
            RetCode::NotBound,
            RetCode::InvalidFormat,
            RetCode::ReceiverOffline,
            RetCode::TooLong,
            RetCode::Internal,
        ];
        ALL.into_iter().find(|c| c.as_str() == text)
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matches_code() {
        for code in [
            RetCode::Success,
            RetCode::AlreadyBound,
            RetCode::InvalidFormat,
            RetCode::Internal,
        ] {
            assert_eq!(code.as_str(), code.code().to_string());
        }
    }

    #[test]
    fn from_wire_roundtrip() {
        assert_eq!(RetCode::from_wire("405"), Some(RetCode::TooLong));
        assert_eq!(RetCode::from_wire("999"), None);
    }
}
