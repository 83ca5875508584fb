use crate::{command::FormatError, topics};
use serde::Serialize;
use strum::FromRepr;

/// Telemetry categories held by the node's cache registry.
///
/// Categories are mutually exclusive; `All` is only ever used as a request
/// selector and never names a cache entry of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRepr)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
#[repr(u8)]
pub enum CacheCategory {
    Heartbeat = 0,
    Status = 1,
    Temperature = 2,
    Acceleration = 3,
    All = 255,
}

impl CacheCategory {
    /// The kind of message published for this category, `None` for `All`.
    pub fn message_kind(self) -> Option<MessageKind> {
        match self {
            Self::Heartbeat => Some(MessageKind::Heartbeat),
            Self::Status => Some(MessageKind::Status),
            Self::Temperature => Some(MessageKind::TemperatureData),
            Self::Acceleration => Some(MessageKind::AccelerationData),
            Self::All => None,
        }
    }

    /// Heartbeat and status entries exist on every node and are not backed by a sensor.
    pub fn is_builtin(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Status)
    }
}

impl TryFrom<u8> for CacheCategory {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(FormatError::InvalidArgument(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum MessageKind {
    Heartbeat,
    Status,
    TemperatureData,
    AccelerationData,
    /// Anything that is not a cache, e.g. an echoed command payload.
    Other,
}

impl MessageKind {
    pub fn topic(self) -> &'static str {
        match self {
            Self::Heartbeat => topics::HEARTBEAT,
            Self::Status | Self::Other => topics::STATUS,
            Self::TemperatureData => topics::TEMPERATURE,
            Self::AccelerationData => topics::ACCELERATION,
        }
    }

    /// Whether the periodic publish task sends this kind.
    pub fn is_telemetry(self) -> bool {
        !matches!(self, Self::Heartbeat | Self::Other)
    }
}
