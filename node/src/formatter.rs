//! Renders caches as JSON for publishing.

use crate::{
    cache::CacheRegistry,
    config::MESSAGE_CAPACITY,
    sensor::{Sensor, SensorHandle},
    Error,
};
use core::fmt::Write;
use haligonia_protocol::{payload::Envelope, CacheCategory};
use serde::Serialize;

/// A formatted message borrowed from the formatter's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    bytes: &'a [u8],
}

impl<'a> Message<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub struct Formatter {
    buffer: [u8; MESSAGE_CAPACITY],
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            buffer: [0; MESSAGE_CAPACITY],
        }
    }
}

impl Formatter {
    /// Formats the cache for `category`. The message is valid until the next
    /// call.
    pub fn format<S: Sensor>(
        &mut self,
        category: CacheCategory,
        registry: &CacheRegistry<S>,
        sensors: &[S],
        uptime_millis: u64,
    ) -> Result<Message<'_>, Error> {
        let entry = registry.lookup(category)?;
        let time = uptime(uptime_millis)?;

        let len = match category {
            CacheCategory::Heartbeat => self.write(&time, &registry.system().heartbeat)?,
            CacheCategory::Status => self.write(&time, &registry.system().status)?,
            _ => {
                let reading = entry
                    .owning_sensor()
                    .and_then(|SensorHandle(index)| sensors.get(index))
                    .and_then(Sensor::reading);
                self.write(&time, &reading)?
            }
        };

        Ok(Message {
            bytes: &self.buffer[..len],
        })
    }

    fn write<T: Serialize>(&mut self, time: &str, data: &T) -> Result<usize, Error> {
        serde_json_core::to_slice(&Envelope { time, data }, &mut self.buffer)
            .map_err(|_| Error::Serialize)
    }
}

/// Uptime as `h:mm:ss`.
fn uptime(millis: u64) -> Result<heapless::String<24>, Error> {
    let seconds = millis / 1000;
    let mut s = heapless::String::new();
    write!(
        s,
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
    .map_err(|_| Error::Serialize)?;
    Ok(s)
}
