#![cfg_attr(feature = "no-std", no_std)]

pub mod cache;
pub mod command;
pub mod payload;
pub mod state;
pub mod topics;

pub use cache::{CacheCategory, MessageKind};
pub use command::{
    Command, CommandPacket, CommandType, FormatError, Interface, RebootTarget, Request, ThreadId,
    ALL_THREADS,
};
pub use state::{AlertKind, DeviceState};

pub use topics::DEVICE_ID;

/// Revision of the node firmware reported in the status cache.
pub const DEVICE_VERSION: u8 = 1;
