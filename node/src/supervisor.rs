//! The supervisor: owner of the scheduler, the cache registry, the sensors and
//! the coms, and the single place faults are signalled and recovered from.
//!
//! Recovery is scoped to the failed component. Rebooting the client never
//! touches the link and rebooting the link never touches the client; only an
//! OS reboot takes the whole node down.

use crate::{
    cache::{CacheEntry, CacheHandle, CacheRegistry, SystemSnapshot},
    coms::{Coms, ComsError, ComsFactory, Link, PubSubClient},
    config::{NodeConfig, SENSOR_CAPACITY},
    debug, error,
    formatter::Formatter,
    info,
    platform::{Platform, ResetKind},
    scheduler::Scheduler,
    sensor::{Sensor, SensorHandle},
    task::Task,
    warn, Error,
};
use haligonia_protocol::{
    topics, AlertKind, CacheCategory, DeviceState, Interface, MessageKind, RebootTarget, ThreadId,
};

/// A task callback. Tasks get the whole supervisor to work with.
pub type TaskFn<P, F, S> = fn(&mut Supervisor<P, F, S>);

pub struct Supervisor<P: Platform, F: ComsFactory, S: Sensor> {
    config: NodeConfig,
    platform: P,
    coms: Coms<F>,
    sensors: heapless::Vec<S, SENSOR_CAPACITY>,
    caches: CacheRegistry<S>,
    scheduler: Scheduler<TaskFn<P, F, S>>,
    formatter: Formatter,
    state: Option<DeviceState>,
    halted: bool,
}

impl<P, F, S> Supervisor<P, F, S>
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    /// Builds the built-in caches, an empty scheduler and the coms.
    ///
    /// The device state stays unset until the first pass.
    pub fn setup(config: NodeConfig, platform: P, factory: F) -> Self {
        info!("Setting up node {}", config.device_id);

        let mut caches = CacheRegistry::new();

        let status = &mut caches.system_mut().status;
        status.device.version = config.device_version;
        status.device.id = config.device_id;
        status.coms.mqtt.broker = config.broker.host;
        status.coms.mqtt.port = config.broker.port;
        status.coms.mqtt.version = config.broker.protocol_version;
        status.coms.mqtt.id = config.broker.client_id;
        status.coms.mqtt.topics.temperature = topics::TEMPERATURE;
        status.coms.mqtt.topics.acceleration = topics::ACCELERATION;
        status.coms.mqtt.topics.status = topics::STATUS;
        status.coms.mqtt.topics.global = topics::GLOBAL_COMMANDS;
        status.coms.mqtt.topics.local = topics::DEVICE_COMMANDS;
        status.coms.link.ssid = config.link.ssid;
        status.coms.link.timeout_millis = config.link.timeout_millis;

        Self {
            config,
            platform,
            coms: Coms::new(factory),
            sensors: heapless::Vec::new(),
            caches,
            scheduler: Scheduler::new(),
            formatter: Formatter::default(),
            state: None,
            halted: false,
        }
    }

    /// Enables and schedules `tasks` in order.
    pub fn boot(
        &mut self,
        tasks: impl IntoIterator<Item = Task<TaskFn<P, F, S>>>,
    ) -> Result<(), Error> {
        let now = self.platform.now_millis();

        for mut task in tasks {
            task.enable(now);
            if let Err(e) = self.scheduler.add_task(task) {
                error!("Failed to schedule task: {}", e);
                self.alert(AlertKind::SchedulerFail);
                return Err(e);
            }
        }

        info!("Booted with {} tasks", self.scheduler.len());
        Ok(())
    }

    /// Runs one scheduler pass.
    pub fn run(&mut self) {
        if self.halted {
            return;
        }

        let mut pass = self.scheduler.begin_pass();
        self.state = Some(DeviceState::Active);

        loop {
            let now = self.platform.now_millis();
            let Some(callback) = self.scheduler.next_due(&mut pass, now) else {
                break;
            };

            callback(self);

            if self.halted {
                break;
            }
        }
    }

    /// Signals a fault. Recovery is up to the caller.
    pub fn alert(&mut self, kind: AlertKind) {
        self.state = Some(DeviceState::Error);
        error!("{}", kind.reason());
    }

    pub fn reboot(&mut self, target: RebootTarget) {
        self.state = Some(DeviceState::Reboot);
        warn!("Rebooting {:?}", target);

        match target {
            RebootTarget::Coms => {
                self.shutdown_client();
                self.shutdown_link();
                self.coms.rebuild();
                self.restore_link();
                self.restore_client();
            }
            RebootTarget::TransportProtocol => {
                self.shutdown_client();
                self.coms.rebuild_client();
                self.restore_client();
            }
            RebootTarget::Link => {
                self.shutdown_link();
                self.coms.rebuild_link();
                self.restore_link();
            }
            RebootTarget::Os => {
                error!("Halted, waiting for reset");
                self.halted = true;
                self.platform.halt();
            }
            RebootTarget::SystemHard => self.platform.reset(ResetKind::Hard),
            RebootTarget::SystemSoft => self.platform.reset(ResetKind::Soft),
        }
    }

    fn shutdown_client(&mut self) {
        if let Err(e) = self.coms.disconnect_client() {
            warn!("Client did not disconnect cleanly: {}", e);
        }
    }

    fn shutdown_link(&mut self) {
        if let Err(e) = self.coms.disconnect_link() {
            warn!("Link did not disconnect cleanly: {}", e);
        }
    }

    fn restore_link(&mut self) {
        if let Err(e) = self.coms.connect_link(&self.config.link) {
            warn!("Link did not come back: {}", e);
            self.alert(AlertKind::ComsFail);
        }
    }

    fn restore_client(&mut self) {
        if let Err(e) = self.coms.connect_client(&self.config.broker) {
            warn!("Client did not come back: {}", e);
            self.alert(AlertKind::ComsFail);
        }
    }

    /// Connects the link, the client, or both. A failure reboots the
    /// component that failed.
    pub fn connect(&mut self, interface: Interface) -> Result<(), Error> {
        if matches!(interface, Interface::Link | Interface::Both) {
            if let Err(e) = self.coms.connect_link(&self.config.link) {
                warn!("Link connect failed: {}", e);
                self.alert(AlertKind::ComsFail);
                self.reboot(RebootTarget::Link);
                return Err(e.into());
            }
        }

        if matches!(interface, Interface::TransportProtocol | Interface::Both) {
            if let Err(e) = self.coms.connect_client(&self.config.broker) {
                warn!("Client connect failed: {}", e);
                self.alert(AlertKind::ComsFail);
                self.reboot(RebootTarget::TransportProtocol);
                return Err(e.into());
            }
        }

        info!("Connected {:?}", interface);
        Ok(())
    }

    pub fn disconnect(&mut self, interface: Interface) -> Result<(), Error> {
        if let Err((target, e)) = self.disconnect_interface(interface) {
            warn!("Disconnect failed: {}", e);
            self.alert(AlertKind::ComsFail);
            self.reboot(target);
            return Err(e.into());
        }

        info!("Disconnected {:?}", interface);
        Ok(())
    }

    /// Disconnects the client before the link. On failure, names the
    /// component that failed.
    pub(crate) fn disconnect_interface(
        &mut self,
        interface: Interface,
    ) -> Result<(), (RebootTarget, ComsError)> {
        if matches!(interface, Interface::TransportProtocol | Interface::Both) {
            self.coms
                .disconnect_client()
                .map_err(|e| (RebootTarget::TransportProtocol, e))?;
        }

        if matches!(interface, Interface::Link | Interface::Both) {
            self.coms
                .disconnect_link()
                .map_err(|e| (RebootTarget::Link, e))?;
        }

        Ok(())
    }

    /// Takes ownership of a sensor and registers its cache.
    ///
    /// A second sensor for an already registered category is fatal: the
    /// registry is left untouched and the node is rebooted.
    pub fn register(&mut self, sensor: S) -> Result<CacheHandle, Error> {
        let category = sensor.category();

        match self.try_register(sensor) {
            Ok(handle) => {
                info!("Registered {:?} sensor", category);
                Ok(handle)
            }
            Err(e) => {
                error!("Failed to register {:?} sensor: {}", category, e);
                self.alert(AlertKind::RegisterFail);
                self.reboot(RebootTarget::Os);
                Err(e)
            }
        }
    }

    fn try_register(&mut self, sensor: S) -> Result<CacheHandle, Error> {
        let category = sensor.category();
        if category.message_kind().is_none() {
            return Err(Error::InvalidCategory(category));
        }
        if self.caches.contains(category) {
            return Err(Error::DuplicateCategory(category));
        }

        let handle = SensorHandle(self.sensors.len());
        self.sensors
            .push(sensor)
            .map_err(|_| Error::SensorTableFull)?;

        match self.caches.register(category, handle, S::update) {
            Ok(cache) => Ok(cache),
            Err(e) => {
                self.sensors.pop();
                Err(e)
            }
        }
    }

    /// Refreshes one cache, or all of them. A failed refresh reboots the
    /// node; an unknown category is only reported.
    pub fn update(&mut self, category: CacheCategory) -> Result<(), Error> {
        let snapshot = self.snapshot();

        match self.caches.update(category, &mut self.sensors, &snapshot) {
            Ok(()) => Ok(()),
            Err(e @ Error::UpdateFailed(_)) => {
                error!("{}", e);
                self.alert(AlertKind::UpdateFail);
                self.reboot(RebootTarget::Os);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// The cache for a single category, `None` for `All` or an unregistered
    /// category.
    pub fn cache(&self, category: CacheCategory) -> Option<&CacheEntry<S>> {
        self.caches.lookup(category).ok()
    }

    /// Formats a cache and publishes it on its topic.
    pub fn publish_cache(&mut self, category: CacheCategory) -> Result<(), Error> {
        let kind = category
            .message_kind()
            .ok_or(Error::CacheNotFound(category))?;

        if category.is_builtin() {
            self.update(category)?;
        }

        let now = self.platform.now_millis();
        let message = self
            .formatter
            .format(category, &self.caches, &self.sensors, now)?;
        self.coms.publish(kind.topic(), message.bytes(), false)?;

        debug!("Published {:?} ({} bytes)", kind, message.len());
        Ok(())
    }

    /// Publishes bytes as they are on the topic for `kind`.
    pub fn publish_raw(&mut self, kind: MessageKind, payload: &[u8]) -> Result<(), Error> {
        self.coms.publish(kind.topic(), payload, false)?;
        Ok(())
    }

    /// Disables every task with `id` when the next pass starts.
    pub fn suspend(&mut self, id: ThreadId) -> Result<(), Error> {
        self.scheduler.suspend(id)
    }

    pub fn selftest(&mut self) {
        warn!("Selftest not supported");
    }

    pub fn set_state(&mut self, state: DeviceState) {
        self.state = Some(state);
    }

    /// `None` until the first pass.
    pub fn state(&self) -> Option<DeviceState> {
        self.state
    }

    /// Whether an OS reboot has been requested. No pass runs once halted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn now_millis(&self) -> u64 {
        self.platform.now_millis()
    }

    fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            state: self.state,
            uptime_millis: self.platform.now_millis(),
            link_connected: self.coms.link().is_connected(),
            client_connected: self.coms.client().is_connected(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn coms(&self) -> &Coms<F> {
        &self.coms
    }

    pub fn coms_mut(&mut self) -> &mut Coms<F> {
        &mut self.coms
    }

    pub fn sensors(&self) -> &[S] {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut [S] {
        &mut self.sensors
    }

    pub fn caches(&self) -> &CacheRegistry<S> {
        &self.caches
    }

    pub fn scheduler(&self) -> &Scheduler<TaskFn<P, F, S>> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<TaskFn<P, F, S>> {
        &mut self.scheduler
    }
}
