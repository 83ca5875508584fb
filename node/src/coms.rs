//! The network link and the publish/subscribe client riding on it.
//!
//! Both halves are built by a [`ComsFactory`] so that either one can be torn
//! down and rebuilt without touching the other.

use crate::{
    config::{BrokerConfig, LinkCredentials, MESSAGE_CAPACITY, TOPIC_CAPACITY},
    debug,
};
use haligonia_protocol::topics;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum ComsError {
    #[error("The link is down")]
    LinkDown,

    #[error("Failed to connect")]
    ConnectFailed,

    #[error("Failed to disconnect")]
    DisconnectFailed,

    #[error("Failed to subscribe")]
    SubscribeFailed,

    #[error("Failed to publish")]
    PublishFailed,

    #[error("Failed to poll for messages")]
    PollFailed,
}

pub trait Link {
    fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), ComsError>;
    fn disconnect(&mut self) -> Result<(), ComsError>;
    fn is_connected(&self) -> bool;
}

/// A message received on one of the subscribed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: heapless::String<TOPIC_CAPACITY>,
    pub payload: heapless::Vec<u8, MESSAGE_CAPACITY>,
}

impl Inbound {
    /// Returns `None` if either part exceeds the receive buffers.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut inbound = Self {
            topic: heapless::String::new(),
            payload: heapless::Vec::new(),
        };
        inbound.topic.push_str(topic).ok()?;
        inbound.payload.extend_from_slice(payload).ok()?;
        Some(inbound)
    }
}

pub trait PubSubClient {
    fn connect(&mut self, broker: &BrokerConfig) -> Result<(), ComsError>;
    fn disconnect(&mut self) -> Result<(), ComsError>;
    fn subscribe(&mut self, filter: &str) -> Result<(), ComsError>;
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ComsError>;

    /// Takes the next received message, if any.
    fn poll(&mut self) -> Result<Option<Inbound>, ComsError>;

    fn is_connected(&self) -> bool;
}

pub trait ComsFactory {
    type Link: Link;
    type Client: PubSubClient;

    fn build_link(&mut self) -> Self::Link;

    /// Builds a client that talks over `link`.
    fn build_client(&mut self, link: &Self::Link) -> Self::Client;
}

pub struct Coms<F: ComsFactory> {
    factory: F,
    link: F::Link,
    client: F::Client,
}

impl<F: ComsFactory> Coms<F> {
    pub fn new(mut factory: F) -> Self {
        let link = factory.build_link();
        let client = factory.build_client(&link);

        Self {
            factory,
            link,
            client,
        }
    }

    pub fn link(&self) -> &F::Link {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut F::Link {
        &mut self.link
    }

    pub fn client(&self) -> &F::Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut F::Client {
        &mut self.client
    }

    pub fn connect_link(&mut self, credentials: &LinkCredentials) -> Result<(), ComsError> {
        debug!("Connecting link");
        self.link.connect(credentials)
    }

    pub fn disconnect_link(&mut self) -> Result<(), ComsError> {
        debug!("Disconnecting link");
        self.link.disconnect()
    }

    /// Connects the client and subscribes to both command filters.
    pub fn connect_client(&mut self, broker: &BrokerConfig) -> Result<(), ComsError> {
        if !self.link.is_connected() {
            return Err(ComsError::LinkDown);
        }

        debug!("Connecting client");
        self.client.connect(broker)?;

        for filter in topics::SUBSCRIPTIONS {
            self.client.subscribe(filter)?;
        }

        Ok(())
    }

    pub fn disconnect_client(&mut self) -> Result<(), ComsError> {
        debug!("Disconnecting client");
        self.client.disconnect()
    }

    /// Replaces the link. The client is left as it is.
    pub fn rebuild_link(&mut self) {
        self.link = self.factory.build_link();
    }

    /// Replaces the client, built against the current link.
    pub fn rebuild_client(&mut self) {
        self.client = self.factory.build_client(&self.link);
    }

    pub fn rebuild(&mut self) {
        self.rebuild_link();
        self.rebuild_client();
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ComsError> {
        if !self.client.is_connected() {
            return Err(ComsError::PublishFailed);
        }

        self.client.publish(topic, payload, retain)
    }

    pub fn poll(&mut self) -> Result<Option<Inbound>, ComsError> {
        self.client.poll()
    }
}
