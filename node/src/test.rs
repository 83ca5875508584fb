use crate::{
    coms::{ComsError, ComsFactory, Inbound, Link, PubSubClient},
    config::{BrokerConfig, LinkCredentials, NodeConfig},
    platform::{Platform, ResetKind},
    sensor::Sensor,
    supervisor::Supervisor,
};
use haligonia_protocol::{
    payload::{AccelerationReading, SensorReading, TemperatureReading},
    CacheCategory, Interface,
};
use std::collections::VecDeque;

#[ctor::ctor]
fn init_test_logging() {
    env_logger::init();
}

pub(crate) type TestSupervisor = Supervisor<TestPlatform, TestComsFactory, ScriptedSensor>;

pub(crate) fn supervisor() -> TestSupervisor {
    Supervisor::setup(
        NodeConfig::default(),
        TestPlatform::default(),
        TestComsFactory::default(),
    )
}

pub(crate) fn connected_supervisor() -> TestSupervisor {
    let mut supervisor = supervisor();
    supervisor.connect(Interface::Both).unwrap();
    supervisor
}

/// Manual clock that records halts and resets instead of performing them.
#[derive(Debug, Default)]
pub(crate) struct TestPlatform {
    pub(crate) now: u64,
    pub(crate) halts: usize,
    pub(crate) resets: Vec<ResetKind>,
    /// Free counter for test task callbacks.
    pub(crate) ticks: usize,
}

impl TestPlatform {
    pub(crate) fn advance(&mut self, millis: u64) {
        self.now += millis;
    }
}

impl Platform for TestPlatform {
    fn now_millis(&self) -> u64 {
        self.now
    }

    fn halt(&mut self) {
        self.halts += 1;
    }

    fn reset(&mut self, kind: ResetKind) {
        self.resets.push(kind);
    }
}

/// Numbers every link and client it builds. Failure flags are copied into
/// each new instance.
#[derive(Debug, Default)]
pub(crate) struct TestComsFactory {
    pub(crate) next_instance: u32,
    pub(crate) link_connect_fails: bool,
    pub(crate) client_connect_fails: bool,
}

impl TestComsFactory {
    fn instance(&mut self) -> u32 {
        self.next_instance += 1;
        self.next_instance
    }
}

impl ComsFactory for TestComsFactory {
    type Link = TestLink;
    type Client = TestClient;

    fn build_link(&mut self) -> TestLink {
        TestLink {
            instance: self.instance(),
            connected: false,
            connects: 0,
            ssid: None,
            connect_fails: self.link_connect_fails,
            disconnect_fails: false,
        }
    }

    fn build_client(&mut self, link: &TestLink) -> TestClient {
        TestClient {
            instance: self.instance(),
            built_on: link.instance,
            connected: false,
            connects: 0,
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbound: VecDeque::new(),
            connect_fails: self.client_connect_fails,
            disconnect_fails: false,
            publish_fails: false,
            poll_fails: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TestLink {
    pub(crate) instance: u32,
    pub(crate) connected: bool,
    pub(crate) connects: usize,
    pub(crate) ssid: Option<&'static str>,
    pub(crate) connect_fails: bool,
    pub(crate) disconnect_fails: bool,
}

impl Link for TestLink {
    fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), ComsError> {
        if self.connect_fails {
            return Err(ComsError::ConnectFailed);
        }
        self.connected = true;
        self.connects += 1;
        self.ssid = Some(credentials.ssid);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ComsError> {
        if self.disconnect_fails {
            return Err(ComsError::DisconnectFailed);
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[derive(Debug)]
pub(crate) struct TestClient {
    pub(crate) instance: u32,
    /// Instance of the link this client was built against.
    pub(crate) built_on: u32,
    pub(crate) connected: bool,
    pub(crate) connects: usize,
    pub(crate) subscriptions: Vec<String>,
    pub(crate) published: Vec<(String, Vec<u8>)>,
    pub(crate) inbound: VecDeque<Inbound>,
    pub(crate) connect_fails: bool,
    pub(crate) disconnect_fails: bool,
    pub(crate) publish_fails: bool,
    pub(crate) poll_fails: bool,
}

impl TestClient {
    pub(crate) fn push_inbound(&mut self, topic: &str, payload: &[u8]) {
        self.inbound
            .push_back(Inbound::new(topic, payload).unwrap());
    }

    pub(crate) fn published_on(&self, topic: &str) -> Vec<&[u8]> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.as_slice())
            .collect()
    }
}

impl PubSubClient for TestClient {
    fn connect(&mut self, _broker: &BrokerConfig) -> Result<(), ComsError> {
        if self.connect_fails {
            return Err(ComsError::ConnectFailed);
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ComsError> {
        if self.disconnect_fails {
            return Err(ComsError::DisconnectFailed);
        }
        self.connected = false;
        Ok(())
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), ComsError> {
        self.subscriptions.push(filter.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], _retain: bool) -> Result<(), ComsError> {
        if self.publish_fails {
            return Err(ComsError::PublishFailed);
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Inbound>, ComsError> {
        if self.poll_fails {
            return Err(ComsError::PollFailed);
        }
        Ok(self.inbound.pop_front())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Sensor that counts its updates and takes `next_reading` on success.
#[derive(Debug)]
pub(crate) struct ScriptedSensor {
    category: CacheCategory,
    healthy: bool,
    reading: Option<SensorReading>,
    pub(crate) next_reading: Option<SensorReading>,
    pub(crate) updates: usize,
}

impl ScriptedSensor {
    fn new(category: CacheCategory, next_reading: SensorReading) -> Self {
        Self {
            category,
            healthy: true,
            reading: None,
            next_reading: Some(next_reading),
            updates: 0,
        }
    }

    pub(crate) fn temperature() -> Self {
        Self::new(
            CacheCategory::Temperature,
            SensorReading::Temperature(TemperatureReading::default()),
        )
    }

    pub(crate) fn acceleration() -> Self {
        Self::new(
            CacheCategory::Acceleration,
            SensorReading::Acceleration(AccelerationReading::default()),
        )
    }

    pub(crate) fn failing(mut self) -> Self {
        self.healthy = false;
        self
    }
}

impl Sensor for ScriptedSensor {
    fn category(&self) -> CacheCategory {
        self.category
    }

    fn update(&mut self) -> bool {
        self.updates += 1;
        if self.healthy {
            self.reading = self.next_reading;
        }
        self.healthy
    }

    fn reading(&self) -> Option<SensorReading> {
        self.reading
    }
}
