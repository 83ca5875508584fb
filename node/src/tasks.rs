//! The node's standard task set.

use crate::{
    cache::CacheEntry,
    config::{NodeConfig, TaskTiming, CACHE_CAPACITY},
    coms::ComsFactory,
    debug, error,
    platform::Platform,
    sensor::Sensor,
    supervisor::{Supervisor, TaskFn},
    task::Task,
    warn,
};
use haligonia_protocol::{AlertKind, CacheCategory, DeviceState, RebootTarget};

/// Idle, DAQ, update, publish and coms poll, in that order.
pub fn standard_tasks<P, F, S>(config: &NodeConfig) -> [Task<TaskFn<P, F, S>>; 5]
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    let tasks = &config.tasks;
    [
        task(&tasks.idle, idle::<P, F, S>),
        task(&tasks.daq, daq::<P, F, S>),
        task(&tasks.update, update::<P, F, S>),
        task(&tasks.publish, publish::<P, F, S>),
        task(&tasks.poll, poll::<P, F, S>),
    ]
}

fn task<P, F, S>(timing: &TaskTiming, callback: TaskFn<P, F, S>) -> Task<TaskFn<P, F, S>>
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    Task::new(
        timing.id,
        timing.interval_millis,
        timing.iterations,
        callback,
    )
}

/// Publishes a heartbeat while marked idle.
pub fn idle<P, F, S>(supervisor: &mut Supervisor<P, F, S>)
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    supervisor.set_state(DeviceState::Idle);

    if let Err(e) = supervisor.publish_cache(CacheCategory::Heartbeat) {
        warn!("Heartbeat failed: {}", e);
        supervisor.alert(AlertKind::ComsFail);
        supervisor.reboot(RebootTarget::Coms);
        return;
    }

    supervisor.set_state(DeviceState::Active);
}

/// Samples every sensor.
pub fn daq<P, F, S>(supervisor: &mut Supervisor<P, F, S>)
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    let failed = supervisor
        .sensors_mut()
        .iter_mut()
        .position(|sensor| !sensor.update());

    if let Some(index) = failed {
        error!("{:?} sensor failed", supervisor.sensors()[index].category());
        supervisor.alert(AlertKind::TaskFail);
        supervisor.reboot(RebootTarget::Os);
    }
}

/// Refreshes every cache.
pub fn update<P, F, S>(supervisor: &mut Supervisor<P, F, S>)
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    if let Err(e) = supervisor.update(CacheCategory::All) {
        debug!("Cache update failed: {}", e);
    }
}

/// Publishes status and every sensor cache.
pub fn publish<P, F, S>(supervisor: &mut Supervisor<P, F, S>)
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    let categories: heapless::Vec<CacheCategory, CACHE_CAPACITY> = supervisor
        .caches()
        .iter()
        .filter(|entry| entry.message_kind().is_telemetry())
        .map(CacheEntry::category)
        .collect();

    for category in categories {
        if let Err(e) = supervisor.publish_cache(category) {
            warn!("Publishing {:?} failed: {}", category, e);
            supervisor.alert(AlertKind::ComsFail);
            supervisor.reboot(RebootTarget::TransportProtocol);
            return;
        }
    }
}

/// Hands every waiting command to the dispatcher.
pub fn poll<P, F, S>(supervisor: &mut Supervisor<P, F, S>)
where
    P: Platform,
    F: ComsFactory,
    S: Sensor,
{
    loop {
        match supervisor.coms_mut().poll() {
            Ok(Some(inbound)) => {
                supervisor.handle_inbound(&inbound.topic, &inbound.payload);
                if supervisor.is_halted() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!("Poll failed: {}", e);
                supervisor.alert(AlertKind::ComsFail);
                supervisor.reboot(RebootTarget::TransportProtocol);
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{connected_supervisor, ScriptedSensor, TestSupervisor};
    use haligonia_protocol::topics;

    fn booted() -> TestSupervisor {
        let mut supervisor = connected_supervisor();
        supervisor.register(ScriptedSensor::temperature()).unwrap();
        supervisor.register(ScriptedSensor::acceleration()).unwrap();
        let tasks = standard_tasks(supervisor.config());
        supervisor.boot(tasks).unwrap();
        supervisor
    }

    fn published(supervisor: &TestSupervisor, topic: &str) -> usize {
        supervisor.coms().client().published_on(topic).len()
    }

    #[test]
    fn order_and_timing() {
        let supervisor = booted();
        let tasks: Vec<_> = supervisor
            .scheduler()
            .tasks()
            .map(|task| (task.id(), task.interval(), task.iterations_remaining()))
            .collect();

        assert_eq!(
            tasks,
            [(0, 500, -1), (1, 100, -1), (2, 500, -1), (3, 500, -1), (4, 100, -1)]
        );
    }

    #[test]
    fn first_pass_runs_everything() {
        let mut supervisor = booted();
        supervisor.run();

        assert_eq!(published(&supervisor, topics::HEARTBEAT), 1);
        assert_eq!(published(&supervisor, topics::STATUS), 1);
        assert_eq!(published(&supervisor, topics::TEMPERATURE), 1);
        assert_eq!(published(&supervisor, topics::ACCELERATION), 1);
        assert_eq!(supervisor.state(), Some(DeviceState::Active));

        // DAQ and the cache update both refresh the sensors.
        assert_eq!(supervisor.sensors()[0].updates, 2);
    }

    #[test]
    fn heartbeat_reports_idle() {
        let mut supervisor = booted();
        supervisor.run();

        let heartbeat = supervisor.coms().client().published_on(topics::HEARTBEAT);
        assert!(heartbeat[0].ends_with(br#""data":{"alive":true,"state":"Idle"}}"#));
    }

    #[test]
    fn fast_tasks_between_slow_ones() {
        let mut supervisor = booted();
        supervisor.run();

        supervisor.platform_mut().advance(100);
        supervisor.run();

        assert_eq!(supervisor.sensors()[0].updates, 3);
        assert_eq!(published(&supervisor, topics::HEARTBEAT), 1);
    }

    #[test]
    fn sensor_failure_halts() {
        let mut supervisor = connected_supervisor();
        supervisor
            .register(ScriptedSensor::temperature().failing())
            .unwrap();
        let tasks = standard_tasks(supervisor.config());
        supervisor.boot(tasks).unwrap();

        supervisor.run();

        assert!(supervisor.is_halted());
        assert_eq!(supervisor.platform().halts, 1);
        assert_eq!(published(&supervisor, topics::TEMPERATURE), 0);
    }

    #[test]
    fn heartbeat_failure_reboots_coms() {
        let mut supervisor = booted();
        supervisor.coms_mut().client_mut().publish_fails = true;
        let link = supervisor.coms().link().instance;

        idle(&mut supervisor);

        assert_ne!(supervisor.coms().link().instance, link);
        assert_eq!(supervisor.state(), Some(DeviceState::Reboot));
    }

    #[test]
    fn publish_failure_reboots_client() {
        let mut supervisor = booted();
        supervisor.coms_mut().client_mut().publish_fails = true;
        let link = supervisor.coms().link().instance;
        let client = supervisor.coms().client().instance;

        publish(&mut supervisor);

        assert_eq!(supervisor.coms().link().instance, link);
        assert_ne!(supervisor.coms().client().instance, client);
    }

    #[test]
    fn poll_dispatches_commands() {
        let mut supervisor = booted();
        let client = supervisor.coms_mut().client_mut();
        client.push_inbound("sensor_cmd/01/get", &[3]);
        client.push_inbound("global_cmd/ping", &[]);

        poll(&mut supervisor);

        assert_eq!(published(&supervisor, topics::ACCELERATION), 1);
        assert_eq!(published(&supervisor, topics::HEARTBEAT), 1);
        assert!(supervisor.coms().client().inbound.is_empty());
    }

    #[test]
    fn poll_stops_after_restart() {
        let mut supervisor = booted();
        let client = supervisor.coms_mut().client_mut();
        client.push_inbound("global_cmd/restart", &[]);
        client.push_inbound("global_cmd/ping", &[]);

        poll(&mut supervisor);

        assert!(supervisor.is_halted());
        assert_eq!(supervisor.coms().client().inbound.len(), 1);
    }

    #[test]
    fn poll_failure_reboots_client() {
        let mut supervisor = booted();
        supervisor.coms_mut().client_mut().poll_fails = true;
        let client = supervisor.coms().client().instance;

        poll(&mut supervisor);

        assert_ne!(supervisor.coms().client().instance, client);
    }

    #[test]
    fn remote_suspend_stops_daq() {
        let mut supervisor = booted();
        supervisor.run();
        let updates = supervisor.sensors()[0].updates;

        supervisor
            .coms_mut()
            .client_mut()
            .push_inbound("sensor_cmd/01/suspend", &[1]);
        supervisor.platform_mut().advance(100);
        // Poll runs last in the pass; the suspension lands on the next one.
        supervisor.run();
        assert_eq!(supervisor.sensors()[0].updates, updates + 1);

        supervisor.platform_mut().advance(100);
        supervisor.run();
        assert_eq!(supervisor.sensors()[0].updates, updates + 1);
    }
}
