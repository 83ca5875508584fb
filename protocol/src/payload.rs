//! Cache contents as they are published.

use crate::{cache::CacheCategory, state::DeviceState};
use serde::Serialize;

/// Status body sent in reply to a malformed command.
pub const ARGUMENT_ERROR: &str = "ARGUMENT ERROR";

/// Every published cache is wrapped with the uptime it was formatted at.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub time: &'a str,
    pub data: &'a T,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct HeartbeatCache {
    pub alive: bool,
    pub state: Option<DeviceState>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct StatusCache {
    pub device: DeviceStatus,
    pub coms: ComsStatus,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct DeviceStatus {
    pub state: Option<DeviceState>,
    pub alive: bool,
    pub runtime_millis: u64,
    pub version: u8,
    pub id: u8,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct ComsStatus {
    pub mqtt: MqttStatus,
    pub link: LinkStatus,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct MqttStatus {
    pub connected: bool,
    pub broker: &'static str,
    pub port: u16,
    pub version: u8,
    pub id: &'static str,
    pub topics: TopicStatus,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct TopicStatus {
    pub temperature: &'static str,
    pub acceleration: &'static str,
    pub status: &'static str,
    pub global: &'static str,
    pub local: &'static str,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct LinkStatus {
    pub connected: bool,
    pub ssid: &'static str,
    pub timeout_millis: u32,
}

/// Thermopile reading in fixed point.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct TemperatureReading {
    pub object_centi_celsius: i32,
    pub die_centi_celsius: i32,
    pub voltage_microvolts: i32,
}

/// Three axis accelerometer reading, raw axis counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct AccelerationReading {
    pub temperature_centi_celsius: i32,
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
#[serde(untagged)]
pub enum SensorReading {
    Temperature(TemperatureReading),
    Acceleration(AccelerationReading),
}

impl SensorReading {
    pub fn category(&self) -> CacheCategory {
        match self {
            Self::Temperature(_) => CacheCategory::Temperature,
            Self::Acceleration(_) => CacheCategory::Acceleration,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reading_category() {
        assert_eq!(
            SensorReading::Temperature(TemperatureReading::default()).category(),
            CacheCategory::Temperature
        );
        assert_eq!(
            SensorReading::Acceleration(AccelerationReading::default()).category(),
            CacheCategory::Acceleration
        );
    }
}
