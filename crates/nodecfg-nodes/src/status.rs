//! Remote status codes
//!
//! The top two bits carry the severity: `00` good, `01` uncertain, `1x` bad.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0);
    pub const BAD_UNEXPECTED: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_CONTINUATION_POINT_INVALID: StatusCode = StatusCode(0x804A_0000);
    pub const BAD_NOT_CONNECTED: StatusCode = StatusCode(0x808A_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;
    const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;

    pub fn is_good(&self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    pub fn is_uncertain(&self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_UNCERTAIN
    }

    pub fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            StatusCode::GOOD => Some("Good"),
            StatusCode::BAD_UNEXPECTED => Some("BadUnexpectedError"),
            StatusCode::BAD_TIMEOUT => Some("BadTimeout"),
            StatusCode::BAD_NODE_ID_INVALID => Some("BadNodeIdInvalid"),
            StatusCode::BAD_NODE_ID_UNKNOWN => Some("BadNodeIdUnknown"),
            StatusCode::BAD_ATTRIBUTE_ID_INVALID => Some("BadAttributeIdInvalid"),
            StatusCode::BAD_CONTINUATION_POINT_INVALID => Some("BadContinuationPointInvalid"),
            StatusCode::BAD_NOT_CONNECTED => Some("BadNotConnected"),
            _ => None,
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::GOOD
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
