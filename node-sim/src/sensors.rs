use clap::ValueEnum;
use haligonia_node::sensor::Sensor;
use haligonia_protocol::{
    payload::{AccelerationReading, SensorReading, TemperatureReading},
    CacheCategory,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SensorKind {
    Temperature,
    Acceleration,
}

/// Produces slowly drifting readings, optionally failing after a number of
/// samples.
pub(crate) struct SimSensor {
    kind: SensorKind,
    samples: u32,
    fail_after: Option<u32>,
    reading: Option<SensorReading>,
}

impl SimSensor {
    pub(crate) fn new(kind: SensorKind, fail_after: Option<u32>) -> Self {
        Self {
            kind,
            samples: 0,
            fail_after,
            reading: None,
        }
    }

    fn sample(&self) -> SensorReading {
        // Triangle wave, 0..=50..=0
        let step = (self.samples % 100) as i32;
        let wave = if step > 50 { 100 - step } else { step };

        match self.kind {
            SensorKind::Temperature => SensorReading::Temperature(TemperatureReading {
                object_centi_celsius: 2150 + wave * 4,
                die_centi_celsius: 2400 + wave,
                voltage_microvolts: -12 + wave,
            }),
            SensorKind::Acceleration => SensorReading::Acceleration(AccelerationReading {
                temperature_centi_celsius: 2400 + wave,
                x: (wave - 25) as i16,
                y: (25 - wave) as i16,
                z: 1000 + wave as i16,
            }),
        }
    }
}

impl Sensor for SimSensor {
    fn category(&self) -> CacheCategory {
        match self.kind {
            SensorKind::Temperature => CacheCategory::Temperature,
            SensorKind::Acceleration => CacheCategory::Acceleration,
        }
    }

    fn update(&mut self) -> bool {
        if self.fail_after.is_some_and(|limit| self.samples >= limit) {
            return false;
        }

        self.samples += 1;
        self.reading = Some(self.sample());
        true
    }

    fn reading(&self) -> Option<SensorReading> {
        self.reading
    }
}
