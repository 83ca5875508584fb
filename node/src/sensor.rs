use haligonia_protocol::{payload::SensorReading, CacheCategory};

/// Index of a sensor in the supervisor's sensor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct SensorHandle(pub(crate) usize);

impl SensorHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

pub trait Sensor {
    /// The cache this sensor feeds. Must not be `All`, a built-in category,
    /// or shared with another sensor on the same node.
    fn category(&self) -> CacheCategory;

    /// Refreshes the sensor's local cache.
    ///
    /// `false` is a fatal failure of the sensor.
    fn update(&mut self) -> bool;

    /// Latest reading, `None` before the first successful update.
    fn reading(&self) -> Option<SensorReading>;
}
