//! Executes remote commands.
//!
//! Malformed commands are answered on the status topic and otherwise
//! ignored. A well formed command that cannot be carried out reboots the
//! client, never the node.

use crate::{
    coms::ComsFactory, debug, error, info, platform::Platform, sensor::Sensor,
    supervisor::Supervisor, warn, Error,
};
use haligonia_protocol::{
    payload::ARGUMENT_ERROR, AlertKind, CacheCategory, Command, MessageKind, RebootTarget,
    Request,
};

impl<P, F, S> Supervisor<P, F, S>
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    /// Decodes and executes a message received on a command topic.
    pub fn handle_inbound(&mut self, topic: &str, payload: &[u8]) {
        debug!("Received {} byte(s) on {}", payload.len(), topic);

        let request = match Request::decode(topic, payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed command on {}: {}", topic, e);
                if let Err(e) = self.publish_raw(MessageKind::Status, ARGUMENT_ERROR.as_bytes()) {
                    self.processing_failed(e);
                }
                return;
            }
        };

        if let Err(e) = self.execute(request, payload) {
            self.processing_failed(e);
        }
    }

    fn execute(&mut self, request: Request, payload: &[u8]) -> Result<(), Error> {
        let Request::Command(command) = request else {
            return self.publish_cache(CacheCategory::Heartbeat);
        };

        info!("Executing {:?}", command);

        match command {
            Command::Disconnect(interface) => self
                .disconnect_interface(interface)
                .map_err(|(_, e)| e.into()),
            Command::Reboot(target) => {
                self.reboot(target);
                Ok(())
            }
            Command::Status => self.publish_cache(CacheCategory::Status),
            Command::Restart => {
                self.reboot(RebootTarget::Os);
                Ok(())
            }
            Command::Suspend(id) => self.suspend(id),
            Command::Selftest => {
                self.selftest();
                Ok(())
            }
            Command::Get(category) => self.publish_cache(category),
            Command::Echo => self.publish_raw(MessageKind::Other, payload),
        }
    }

    fn processing_failed(&mut self, e: Error) {
        error!("Command failed: {}", e);
        self.alert(AlertKind::ProcessingFail);
        self.reboot(RebootTarget::TransportProtocol);
    }
}
