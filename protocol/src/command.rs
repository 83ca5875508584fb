//! Remote commands received on the command topics.
//!
//! A command is named either by the last segment of the topic it arrives on,
//! with an optional single argument byte as payload, or by a two byte
//! `[command, argument]` packet sent to any other topic. Anything else is
//! answered with a heartbeat.

use crate::{cache::CacheCategory, topics};
use strum::FromRepr;

pub type ThreadId = u8;

/// Suspending this id disables every task.
pub const ALL_THREADS: ThreadId = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum FormatError {
    #[error("Payload too long, expected {expected} byte(s) but got {actual}")]
    TooLong { expected: usize, actual: usize },
    #[error("Missing argument byte")]
    MissingArgument,
    #[error("Invalid argument {0}")]
    InvalidArgument(u8),
    #[error("Invalid command {0}")]
    InvalidCommand(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandType {
    Disconnect = 0,
    Reboot = 1,
    Status = 2,
    Restart = 3,
    Suspend = 4,
    Selftest = 5,
    Get = 6,
    Echo = 7,
}

impl CommandType {
    /// Commands reachable by topic keyword. `Disconnect` and `Echo` are only
    /// reachable as a packet.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "reboot" => Some(Self::Reboot),
            "restart" => Some(Self::Restart),
            "suspend" => Some(Self::Suspend),
            "selftest" => Some(Self::Selftest),
            "status" => Some(Self::Status),
            "get" => Some(Self::Get),
            _ => None,
        }
    }

    pub fn takes_argument(self) -> bool {
        matches!(
            self,
            Self::Disconnect | Self::Reboot | Self::Suspend | Self::Get
        )
    }
}

impl TryFrom<u8> for CommandType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(FormatError::InvalidCommand(value))
    }
}

/// Subsystem rebuilt by a reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
#[repr(u8)]
pub enum RebootTarget {
    /// Link and publish/subscribe client together.
    Coms = 0,
    /// The publish/subscribe client only.
    TransportProtocol = 1,
    /// The network link only.
    Link = 2,
    /// Halt and wait for an external reset.
    Os = 3,
    SystemHard = 4,
    SystemSoft = 5,
}

impl TryFrom<u8> for RebootTarget {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(FormatError::InvalidArgument(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
#[repr(u8)]
pub enum Interface {
    Link = 0,
    TransportProtocol = 1,
    Both = 2,
}

impl TryFrom<u8> for Interface {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(FormatError::InvalidArgument(value))
    }
}

/// Decoded form of a command and its argument byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct CommandPacket {
    pub command: CommandType,
    pub argument: u8,
}

impl CommandPacket {
    /// Decodes a two byte `[command, argument]` packet.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        match bytes {
            [command, argument] => Ok(Self {
                command: CommandType::try_from(*command)?,
                argument: *argument,
            }),
            [_] | [] => Err(FormatError::MissingArgument),
            _ => Err(FormatError::TooLong {
                expected: 2,
                actual: bytes.len(),
            }),
        }
    }

    /// Builds a packet for a keyword command from its payload.
    ///
    /// Commands with an argument need exactly one byte, the payload of the
    /// others is ignored.
    pub fn with_payload(command: CommandType, payload: &[u8]) -> Result<Self, FormatError> {
        if !command.takes_argument() {
            return Ok(Self {
                command,
                argument: 0,
            });
        }

        match payload {
            [argument] => Ok(Self {
                command,
                argument: *argument,
            }),
            [] => Err(FormatError::MissingArgument),
            _ => Err(FormatError::TooLong {
                expected: 1,
                actual: payload.len(),
            }),
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.command as u8, self.argument]
    }
}

/// A command with its argument validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum Command {
    Disconnect(Interface),
    Reboot(RebootTarget),
    Status,
    Restart,
    Suspend(ThreadId),
    Selftest,
    Get(CacheCategory),
    Echo,
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Disconnect(_) => CommandType::Disconnect,
            Self::Reboot(_) => CommandType::Reboot,
            Self::Status => CommandType::Status,
            Self::Restart => CommandType::Restart,
            Self::Suspend(_) => CommandType::Suspend,
            Self::Selftest => CommandType::Selftest,
            Self::Get(_) => CommandType::Get,
            Self::Echo => CommandType::Echo,
        }
    }
}

impl TryFrom<CommandPacket> for Command {
    type Error = FormatError;

    fn try_from(packet: CommandPacket) -> Result<Self, Self::Error> {
        Ok(match packet.command {
            CommandType::Disconnect => Self::Disconnect(Interface::try_from(packet.argument)?),
            CommandType::Reboot => Self::Reboot(RebootTarget::try_from(packet.argument)?),
            CommandType::Status => Self::Status,
            CommandType::Restart => Self::Restart,
            CommandType::Suspend => Self::Suspend(packet.argument),
            CommandType::Selftest => Self::Selftest,
            CommandType::Get => Self::Get(CacheCategory::try_from(packet.argument)?),
            CommandType::Echo => Self::Echo,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum Request {
    Command(Command),
    /// No command recognised, answer with a heartbeat.
    Heartbeat,
}

impl Request {
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Self, FormatError> {
        if let Some(command) = CommandType::from_keyword(topics::keyword(topic)) {
            let packet = CommandPacket::with_payload(command, payload)?;
            return Ok(Self::Command(Command::try_from(packet)?));
        }

        if payload.len() == 2 {
            let packet = CommandPacket::from_bytes(payload)?;
            return Ok(Self::Command(Command::try_from(packet)?));
        }

        Ok(Self::Heartbeat)
    }
}
