//! The cache registry.
//!
//! Entries are kept in registration order, with heartbeat and status always
//! first. Each category appears at most once, enforced through a category to
//! handle map. Entries are never removed.

use crate::{
    config::CACHE_CAPACITY,
    debug,
    sensor::{Sensor, SensorHandle},
    warn, Error,
};
use haligonia_protocol::{
    payload::{HeartbeatCache, StatusCache},
    CacheCategory, DeviceState, MessageKind,
};

const _: () = assert!(CACHE_CAPACITY >= 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct CacheHandle(usize);

/// Live values the built-in caches are refreshed from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemSnapshot {
    pub state: Option<DeviceState>,
    pub uptime_millis: u64,
    pub link_connected: bool,
    pub client_connected: bool,
}

/// Contents of the heartbeat and status caches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SystemCaches {
    pub heartbeat: HeartbeatCache,
    pub status: StatusCache,
}

pub type SystemUpdate = fn(&mut SystemCaches, &SystemSnapshot) -> bool;
pub type SensorUpdate<S> = fn(&mut S) -> bool;

/// How an entry is refreshed. Built-in entries read the system snapshot,
/// sensor entries ask their sensor.
pub enum Update<S> {
    System(SystemUpdate),
    Sensor {
        sensor: SensorHandle,
        update: SensorUpdate<S>,
    },
}

pub struct CacheEntry<S> {
    category: CacheCategory,
    message_kind: MessageKind,
    update: Update<S>,
}

impl<S> CacheEntry<S> {
    pub fn category(&self) -> CacheCategory {
        self.category
    }

    pub fn message_kind(&self) -> MessageKind {
        self.message_kind
    }

    pub fn update(&self) -> &Update<S> {
        &self.update
    }

    pub fn owning_sensor(&self) -> Option<SensorHandle> {
        match self.update {
            Update::System(_) => None,
            Update::Sensor { sensor, .. } => Some(sensor),
        }
    }
}

pub struct CacheRegistry<S> {
    entries: heapless::Vec<CacheEntry<S>, CACHE_CAPACITY>,
    index: heapless::LinearMap<CacheCategory, CacheHandle, CACHE_CAPACITY>,
    system: SystemCaches,
}

impl<S: Sensor> Default for CacheRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sensor> CacheRegistry<S> {
    /// A registry holding only the heartbeat and status entries.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: heapless::Vec::new(),
            index: heapless::LinearMap::new(),
            system: SystemCaches::default(),
        };

        let builtins: [(CacheCategory, SystemUpdate); 2] = [
            (CacheCategory::Heartbeat, update_heartbeat),
            (CacheCategory::Status, update_status),
        ];
        // Cannot fail: the registry is empty and holds at least two entries.
        for (category, update) in builtins {
            let inserted = registry.insert(category, Update::System(update));
            debug_assert!(inserted.is_ok());
        }

        registry
    }

    /// Appends a sensor backed entry.
    pub fn register(
        &mut self,
        category: CacheCategory,
        sensor: SensorHandle,
        update: SensorUpdate<S>,
    ) -> Result<CacheHandle, Error> {
        self.insert(category, Update::Sensor { sensor, update })
    }

    fn insert(&mut self, category: CacheCategory, update: Update<S>) -> Result<CacheHandle, Error> {
        let message_kind = category
            .message_kind()
            .ok_or(Error::InvalidCategory(category))?;

        if self.index.contains_key(&category) {
            return Err(Error::DuplicateCategory(category));
        }

        let handle = CacheHandle(self.entries.len());
        self.entries
            .push(CacheEntry {
                category,
                message_kind,
                update,
            })
            .map_err(|_| Error::RegistryFull)?;
        self.index
            .insert(category, handle)
            .map_err(|_| Error::RegistryFull)?;

        debug!("Registered {:?} cache", category);
        Ok(handle)
    }

    pub fn contains(&self, category: CacheCategory) -> bool {
        self.index.contains_key(&category)
    }

    /// Finds the entry for a single category. `All` is never found.
    pub fn lookup(&self, category: CacheCategory) -> Result<&CacheEntry<S>, Error> {
        match self.index.get(&category) {
            Some(handle) => Ok(&self.entries[handle.0]),
            None => {
                warn!("Invalid cache {:?}", category);
                Err(Error::CacheNotFound(category))
            }
        }
    }

    pub fn get(&self, handle: CacheHandle) -> Option<&CacheEntry<S>> {
        self.entries.get(handle.0)
    }

    /// Refreshes one entry, or every entry in order for `All`, stopping at
    /// the first failure.
    pub fn update(
        &mut self,
        category: CacheCategory,
        sensors: &mut [S],
        snapshot: &SystemSnapshot,
    ) -> Result<(), Error> {
        if category == CacheCategory::All {
            for entry in &self.entries {
                Self::refresh(entry, &mut self.system, sensors, snapshot)?;
            }
            return Ok(());
        }

        let Some(handle) = self.index.get(&category) else {
            warn!("Invalid cache {:?}", category);
            return Err(Error::CacheNotFound(category));
        };

        Self::refresh(&self.entries[handle.0], &mut self.system, sensors, snapshot)
    }

    fn refresh(
        entry: &CacheEntry<S>,
        system: &mut SystemCaches,
        sensors: &mut [S],
        snapshot: &SystemSnapshot,
    ) -> Result<(), Error> {
        let updated = match &entry.update {
            Update::System(update) => update(system, snapshot),
            Update::Sensor { sensor, update } => {
                sensors.get_mut(sensor.0).is_some_and(|sensor| update(sensor))
            }
        };

        if updated {
            Ok(())
        } else {
            Err(Error::UpdateFailed(entry.category))
        }
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<S>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn system(&self) -> &SystemCaches {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut SystemCaches {
        &mut self.system
    }
}

fn update_heartbeat(caches: &mut SystemCaches, snapshot: &SystemSnapshot) -> bool {
    caches.heartbeat = HeartbeatCache {
        alive: snapshot.state.map_or(true, DeviceState::is_alive),
        state: snapshot.state,
    };
    true
}

fn update_status(caches: &mut SystemCaches, snapshot: &SystemSnapshot) -> bool {
    let status = &mut caches.status;
    status.device.state = snapshot.state;
    status.device.alive = snapshot.state.map_or(true, DeviceState::is_alive);
    status.device.runtime_millis = snapshot.uptime_millis;
    status.coms.mqtt.connected = snapshot.client_connected;
    status.coms.link.connected = snapshot.link_connected;
    true
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::ScriptedSensor;

    fn categories(registry: &CacheRegistry<ScriptedSensor>) -> Vec<CacheCategory> {
        registry.iter().map(CacheEntry::category).collect()
    }

    #[test]
    fn builtins_first() {
        let registry = CacheRegistry::<ScriptedSensor>::new();

        assert_eq!(
            categories(&registry),
            [CacheCategory::Heartbeat, CacheCategory::Status]
        );
        assert!(registry.iter().all(|entry| entry.owning_sensor().is_none()));
    }

    #[test]
    fn sensors_append_in_order() {
        let mut registry = CacheRegistry::<ScriptedSensor>::new();
        registry
            .register(CacheCategory::Temperature, SensorHandle(0), ScriptedSensor::update)
            .unwrap();
        let acc = registry
            .register(CacheCategory::Acceleration, SensorHandle(1), ScriptedSensor::update)
            .unwrap();

        assert_eq!(
            categories(&registry),
            [
                CacheCategory::Heartbeat,
                CacheCategory::Status,
                CacheCategory::Temperature,
                CacheCategory::Acceleration
            ]
        );

        let entry = registry.get(acc).unwrap();
        assert_eq!(entry.owning_sensor(), Some(SensorHandle(1)));
        assert_eq!(entry.message_kind(), MessageKind::AccelerationData);
    }

    #[test]
    fn duplicate_category_rejected() {
        let mut registry = CacheRegistry::<ScriptedSensor>::new();
        registry
            .register(CacheCategory::Temperature, SensorHandle(0), ScriptedSensor::update)
            .unwrap();

        assert_eq!(
            registry
                .register(CacheCategory::Temperature, SensorHandle(1), ScriptedSensor::update)
                .err(),
            Some(Error::DuplicateCategory(CacheCategory::Temperature))
        );
        assert_eq!(
            registry
                .register(CacheCategory::Status, SensorHandle(1), ScriptedSensor::update)
                .err(),
            Some(Error::DuplicateCategory(CacheCategory::Status))
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn all_cannot_be_registered() {
        let mut registry = CacheRegistry::<ScriptedSensor>::new();

        assert_eq!(
            registry
                .register(CacheCategory::All, SensorHandle(0), ScriptedSensor::update)
                .err(),
            Some(Error::InvalidCategory(CacheCategory::All))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup() {
        let registry = CacheRegistry::<ScriptedSensor>::new();

        assert_eq!(
            registry.lookup(CacheCategory::Status).unwrap().category(),
            CacheCategory::Status
        );
        assert_eq!(
            registry.lookup(CacheCategory::All).err(),
            Some(Error::CacheNotFound(CacheCategory::All))
        );
        assert_eq!(
            registry.lookup(CacheCategory::Temperature).err(),
            Some(Error::CacheNotFound(CacheCategory::Temperature))
        );
    }

    #[test]
    fn update_all_stops_at_first_failure() {
        let mut registry = CacheRegistry::new();
        let mut sensors = [
            ScriptedSensor::temperature().failing(),
            ScriptedSensor::acceleration(),
        ];
        registry
            .register(CacheCategory::Temperature, SensorHandle(0), ScriptedSensor::update)
            .unwrap();
        registry
            .register(CacheCategory::Acceleration, SensorHandle(1), ScriptedSensor::update)
            .unwrap();

        assert_eq!(
            registry.update(CacheCategory::All, &mut sensors, &SystemSnapshot::default()),
            Err(Error::UpdateFailed(CacheCategory::Temperature))
        );
        assert_eq!(sensors[0].updates, 1);
        assert_eq!(sensors[1].updates, 0);
    }

    #[test]
    fn update_single_category() {
        let mut registry = CacheRegistry::new();
        let mut sensors = [ScriptedSensor::temperature(), ScriptedSensor::acceleration()];
        registry
            .register(CacheCategory::Temperature, SensorHandle(0), ScriptedSensor::update)
            .unwrap();
        registry
            .register(CacheCategory::Acceleration, SensorHandle(1), ScriptedSensor::update)
            .unwrap();

        registry
            .update(CacheCategory::Acceleration, &mut sensors, &SystemSnapshot::default())
            .unwrap();
        assert_eq!(sensors[0].updates, 0);
        assert_eq!(sensors[1].updates, 1);

        assert_eq!(
            registry.update(CacheCategory::All, &mut [], &SystemSnapshot::default()),
            Err(Error::UpdateFailed(CacheCategory::Temperature))
        );
    }

    #[test]
    fn builtins_follow_snapshot() {
        let mut registry = CacheRegistry::<ScriptedSensor>::new();
        let snapshot = SystemSnapshot {
            state: Some(DeviceState::Error),
            uptime_millis: 1234,
            link_connected: true,
            client_connected: false,
        };

        registry
            .update(CacheCategory::All, &mut [], &snapshot)
            .unwrap();

        let system = registry.system();
        assert_eq!(
            system.heartbeat,
            HeartbeatCache {
                alive: false,
                state: Some(DeviceState::Error)
            }
        );
        assert_eq!(system.status.device.runtime_millis, 1234);
        assert!(system.status.coms.link.connected);
        assert!(!system.status.coms.mqtt.connected);
    }

    #[test]
    fn alive_before_first_pass() {
        let mut registry = CacheRegistry::<ScriptedSensor>::new();
        registry
            .update(CacheCategory::Heartbeat, &mut [], &SystemSnapshot::default())
            .unwrap();

        assert!(registry.system().heartbeat.alive);
        assert_eq!(registry.system().heartbeat.state, None);
    }
}
