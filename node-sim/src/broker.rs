//! In-process stand-in for the network link and the MQTT broker.

use clap::ValueEnum;
use haligonia_node::{
    coms::{ComsError, ComsFactory, Inbound, Link, PubSubClient},
    config::{BrokerConfig, LinkCredentials},
};
use log::{debug, info, warn};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum PrintFormat {
    Text,
    Hex,
}

struct State {
    format: PrintFormat,
    network_up: bool,
    subscriptions: Vec<String>,
    inbound: VecDeque<Inbound>,
    published: usize,
}

/// Shared broker state. Clones refer to the same broker.
#[derive(Clone)]
pub(crate) struct Broker(Rc<RefCell<State>>);

impl Broker {
    pub(crate) fn new(format: PrintFormat) -> Self {
        Self(Rc::new(RefCell::new(State {
            format,
            network_up: true,
            subscriptions: Vec::new(),
            inbound: VecDeque::new(),
            published: 0,
        })))
    }

    /// Queues a message as if a remote client had published it.
    pub(crate) fn inject(&self, topic: &str, payload: &[u8]) {
        let mut state = self.0.borrow_mut();

        if !state
            .subscriptions
            .iter()
            .any(|filter| matches_filter(filter, topic))
        {
            warn!("Node is not subscribed to {topic}, dropping message");
            return;
        }

        match Inbound::new(topic, payload) {
            Some(inbound) => state.inbound.push_back(inbound),
            None => warn!("Message on {topic} does not fit the node's receive buffers"),
        }
    }

    pub(crate) fn set_network_up(&self, up: bool) {
        info!("Network {}", if up { "up" } else { "down" });
        self.0.borrow_mut().network_up = up;
    }

    pub(crate) fn published(&self) -> usize {
        self.0.borrow().published
    }
}

/// MQTT style topic filter match with `+` and trailing `#` wildcards.
fn matches_filter(filter: &str, topic: &str) -> bool {
    let mut levels = topic.split('/');

    for part in filter.split('/') {
        match (part, levels.next()) {
            ("#", _) => return true,
            ("+", Some(_)) => {}
            (part, Some(level)) if part == level => {}
            _ => return false,
        }
    }

    levels.next().is_none()
}

pub(crate) struct SimComsFactory {
    broker: Broker,
    next_instance: u32,
}

impl SimComsFactory {
    pub(crate) fn new(broker: Broker) -> Self {
        Self {
            broker,
            next_instance: 0,
        }
    }

    fn instance(&mut self) -> u32 {
        self.next_instance += 1;
        self.next_instance
    }
}

impl ComsFactory for SimComsFactory {
    type Link = SimLink;
    type Client = SimClient;

    fn build_link(&mut self) -> SimLink {
        let instance = self.instance();
        debug!("Building link {instance}");
        SimLink {
            broker: self.broker.clone(),
            instance,
            connected: false,
        }
    }

    fn build_client(&mut self, link: &SimLink) -> SimClient {
        let instance = self.instance();
        debug!("Building client {instance} on link {}", link.instance);
        SimClient {
            broker: self.broker.clone(),
            instance,
            connected: false,
        }
    }
}

pub(crate) struct SimLink {
    broker: Broker,
    instance: u32,
    connected: bool,
}

impl Link for SimLink {
    fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), ComsError> {
        if !self.broker.0.borrow().network_up {
            return Err(ComsError::ConnectFailed);
        }

        info!("Link {} joined {}", self.instance, credentials.ssid);
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ComsError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected && self.broker.0.borrow().network_up
    }
}

pub(crate) struct SimClient {
    broker: Broker,
    instance: u32,
    connected: bool,
}

impl PubSubClient for SimClient {
    fn connect(&mut self, broker: &BrokerConfig) -> Result<(), ComsError> {
        if !self.broker.0.borrow().network_up {
            return Err(ComsError::ConnectFailed);
        }

        info!(
            "Client {} connected to {}:{} as {}",
            self.instance, broker.host, broker.port, broker.client_id
        );
        self.connected = true;
        self.broker.0.borrow_mut().subscriptions.clear();
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ComsError> {
        self.connected = false;
        Ok(())
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), ComsError> {
        let mut state = self.broker.0.borrow_mut();
        if !state.network_up {
            return Err(ComsError::SubscribeFailed);
        }

        debug!("Subscribed to {filter}");
        state.subscriptions.push(filter.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ComsError> {
        let mut state = self.broker.0.borrow_mut();
        if !state.network_up {
            return Err(ComsError::PublishFailed);
        }

        state.published += 1;
        let retain = if retain { " (retained)" } else { "" };
        match state.format {
            PrintFormat::Text => info!(
                "{topic}{retain}: {}",
                String::from_utf8_lossy(payload)
            ),
            PrintFormat::Hex => info!("{topic}{retain}: {payload:02x?}"),
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Inbound>, ComsError> {
        let mut state = self.broker.0.borrow_mut();
        if !state.network_up {
            return Err(ComsError::PollFailed);
        }

        Ok(state.inbound.pop_front())
    }

    fn is_connected(&self) -> bool {
        self.connected && self.broker.0.borrow().network_up
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filters() {
        assert!(matches_filter("global_cmd/#", "global_cmd/reboot"));
        assert!(matches_filter("global_cmd/#", "global_cmd"));
        assert!(matches_filter("sensor_cmd/01/#", "sensor_cmd/01/get"));
        assert!(!matches_filter("sensor_cmd/01/#", "sensor_cmd/02/get"));
        assert!(matches_filter("sensor/+/status", "sensor/01/status"));
        assert!(!matches_filter("sensor/+/status", "sensor/01/status/x"));
        assert!(!matches_filter("sensor/01", "sensor"));
    }

    #[test]
    fn inject_needs_subscription() {
        let broker = Broker::new(PrintFormat::Text);
        let mut factory = SimComsFactory::new(broker.clone());
        let mut link = factory.build_link();
        let mut client = factory.build_client(&link);

        broker.inject("global_cmd/status", &[]);
        link.connect(&LinkCredentials::default()).unwrap();
        client.connect(&BrokerConfig::default()).unwrap();
        assert_eq!(client.poll(), Ok(None));

        client.subscribe("global_cmd/#").unwrap();
        broker.inject("global_cmd/status", &[]);
        assert_eq!(
            client.poll().unwrap().map(|inbound| inbound.topic),
            Some("global_cmd/status".try_into().unwrap())
        );
    }

    #[test]
    fn network_down() {
        let broker = Broker::new(PrintFormat::Hex);
        let mut factory = SimComsFactory::new(broker.clone());
        let mut link = factory.build_link();
        let mut client = factory.build_client(&link);
        link.connect(&LinkCredentials::default()).unwrap();
        client.connect(&BrokerConfig::default()).unwrap();

        broker.set_network_up(false);

        assert!(!link.is_connected());
        assert_eq!(client.publish("a", b"b", false), Err(ComsError::PublishFailed));
        assert_eq!(client.poll(), Err(ComsError::PollFailed));
        assert_eq!(broker.published(), 0);
    }
}
