use const_format::formatcp;

/// Two digit device number used in every per-device topic.
pub const DEVICE: &str = "01";

/// Numeric form of [`DEVICE`], reported in the status cache.
pub const DEVICE_ID: u8 = device_id(DEVICE);

const fn device_id(device: &str) -> u8 {
    let digits = device.as_bytes();
    assert!(
        digits.len() == 2 && digits[0].is_ascii_digit() && digits[1].is_ascii_digit(),
        "device number must be two decimal digits"
    );
    (digits[0] - b'0') * 10 + (digits[1] - b'0')
}

const SENSOR_PREFIX: &str = formatcp!("sensor/{DEVICE}");

pub const TEMPERATURE: &str = formatcp!("{SENSOR_PREFIX}/data/temp");
pub const ACCELERATION: &str = formatcp!("{SENSOR_PREFIX}/data/acc");
pub const STATUS: &str = formatcp!("{SENSOR_PREFIX}/status");
pub const HEARTBEAT: &str = formatcp!("{SENSOR_PREFIX}/heartbeat");

/// Commands broadcast to every node.
pub const GLOBAL_COMMANDS: &str = "global_cmd/#";

/// Commands addressed to this node only.
pub const DEVICE_COMMANDS: &str = formatcp!("sensor_cmd/{DEVICE}/#");

pub const SUBSCRIPTIONS: [&str; 2] = [GLOBAL_COMMANDS, DEVICE_COMMANDS];

/// Returns the final path segment of a topic, which names the command.
pub fn keyword(topic: &str) -> &str {
    topic.rsplit_once('/').map_or(topic, |(_, last)| last)
}
