#![cfg_attr(feature = "no-std", no_std)]

#[cfg(feature = "no-std")]
use defmt::{debug, error, info, trace, warn};
#[cfg(feature = "std")]
use log::{debug, error, info, trace, warn};

pub mod cache;
pub mod coms;
pub mod config;
mod dispatch;
pub mod formatter;
pub mod platform;
pub mod scheduler;
pub mod sensor;
pub mod supervisor;
pub mod task;
pub mod tasks;

#[cfg(test)]
mod test;

pub use haligonia_protocol as protocol;

use crate::coms::ComsError;
use haligonia_protocol::{CacheCategory, FormatError};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum Error {
    #[error("The scheduler has no free task slots")]
    SchedulerFull,

    #[error("The task is already owned by a scheduler")]
    TaskAlreadyScheduled,

    #[error("No task with this handle")]
    UnknownTask,

    #[error("The cache registry is full")]
    RegistryFull,

    #[error("A cache for {0:?} is already registered")]
    DuplicateCategory(CacheCategory),

    #[error("{0:?} does not name a single cache")]
    InvalidCategory(CacheCategory),

    #[error("No cache registered for {0:?}")]
    CacheNotFound(CacheCategory),

    #[error("Updating the {0:?} cache failed")]
    UpdateFailed(CacheCategory),

    #[error("The sensor table is full")]
    SensorTableFull,

    #[error("Coms error: {0}")]
    Coms(#[from] ComsError),

    #[error("Command format error: {0}")]
    Format(#[from] FormatError),

    #[error("Serialization error")]
    Serialize,
}
