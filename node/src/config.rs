//! Static node configuration. Nothing here is persisted, every value is
//! rebuilt at boot.

use haligonia_protocol::{ThreadId, DEVICE_ID, DEVICE_VERSION};

pub const TASK_CAPACITY: usize = 8;
pub const SUSPEND_CAPACITY: usize = 8;
pub const CACHE_CAPACITY: usize = 8;
pub const SENSOR_CAPACITY: usize = 4;
pub const MESSAGE_CAPACITY: usize = 512;
pub const TOPIC_CAPACITY: usize = 64;

/// Network link credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct LinkCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
    pub timeout_millis: u32,
}

impl Default for LinkCredentials {
    fn default() -> Self {
        Self {
            ssid: "Haligonia Sensor Network",
            password: "@Sensor!1!haligonia@",
            timeout_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct BrokerConfig {
    pub host: &'static str,
    pub port: u16,
    pub client_id: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub keep_alive_secs: u16,
    pub protocol_version: u8,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "broker.haligonia.home.com",
            port: 1883,
            client_id: "sensor-01",
            username: "use-token-auth",
            password: "haligonia",
            keep_alive_secs: 10,
            protocol_version: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct TaskTiming {
    pub id: ThreadId,
    pub interval_millis: u64,
    /// `-1` runs forever.
    pub iterations: i64,
}

impl TaskTiming {
    const fn forever(id: ThreadId, interval_millis: u64) -> Self {
        Self {
            id,
            interval_millis,
            iterations: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct TaskTable {
    pub idle: TaskTiming,
    pub daq: TaskTiming,
    pub update: TaskTiming,
    pub publish: TaskTiming,
    pub poll: TaskTiming,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self {
            idle: TaskTiming::forever(0, 500),
            daq: TaskTiming::forever(1, 100),
            update: TaskTiming::forever(2, 500),
            publish: TaskTiming::forever(3, 500),
            poll: TaskTiming::forever(4, 100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct NodeConfig {
    /// Reported in the status cache. Topics always use
    /// [`topics::DEVICE`](haligonia_protocol::topics::DEVICE), so this should
    /// stay at its default.
    pub device_id: u8,
    pub device_version: u8,
    pub link: LinkCredentials,
    pub broker: BrokerConfig,
    pub tasks: TaskTable,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: DEVICE_ID,
            device_version: DEVICE_VERSION,
            link: LinkCredentials::default(),
            broker: BrokerConfig::default(),
            tasks: TaskTable::default(),
        }
    }
}
