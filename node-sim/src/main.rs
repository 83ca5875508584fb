mod broker;
mod console;
mod platform;
mod sensors;

use crate::{
    broker::{Broker, PrintFormat, SimComsFactory},
    console::Action,
    platform::HostPlatform,
    sensors::{SensorKind, SimSensor},
};
use clap::Parser;
use haligonia_node::{config::NodeConfig, supervisor::Supervisor, tasks::standard_tasks};
use haligonia_protocol::Interface;
use log::{error, info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Runs a sensor node against an in-process broker.
///
/// Commands are read from stdin as `<topic> [hex payload]`, or `net up` and
/// `net down` to drop the network.
#[derive(Parser)]
struct Cli {
    /// Scheduler pass period in milliseconds
    #[arg(short, long, default_value_t = 10)]
    tick: u64,

    /// Stop after this many scheduler passes
    #[arg(short, long)]
    passes: Option<u64>,

    /// Sensor that should start failing
    #[arg(long, requires = "fail_after")]
    fail_sensor: Option<SensorKind>,

    /// Number of good samples before the failing sensor fails
    #[arg(long, requires = "fail_sensor")]
    fail_after: Option<u32>,

    /// Format to print published messages in
    #[arg(short, long, default_value = "text")]
    format: PrintFormat,
}

impl Cli {
    fn sensor(&self, kind: SensorKind) -> SimSensor {
        let fail_after = if self.fail_sensor == Some(kind) {
            self.fail_after
        } else {
            None
        };
        SimSensor::new(kind, fail_after)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let broker = Broker::new(cli.format);
    let mut supervisor = Supervisor::setup(
        NodeConfig::default(),
        HostPlatform::default(),
        SimComsFactory::new(broker.clone()),
    );

    for kind in [SensorKind::Temperature, SensorKind::Acceleration] {
        if let Err(e) = supervisor.register(cli.sensor(kind)) {
            error!("Failed to register {kind:?} sensor: {e}");
        }
    }

    if let Err(e) = supervisor.connect(Interface::Both) {
        warn!("Initial connection failed: {e}");
    }

    let tasks = standard_tasks(supervisor.config());
    if let Err(e) = supervisor.boot(tasks) {
        error!("Boot failed: {e}");
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut passes = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                supervisor.run();
                passes += 1;

                if supervisor.is_halted() {
                    break;
                }
                if let Some(kind) = supervisor.platform().reset_requested() {
                    info!("Stopping on {kind:?} reset");
                    break;
                }
                if cli.passes.is_some_and(|limit| passes >= limit) {
                    info!("Completed {passes} passes");
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<Action>() {
                        Ok(Action::Network(up)) => broker.set_network_up(up),
                        Ok(Action::Publish { topic, payload }) => broker.inject(&topic, &payload),
                        Err(e) => warn!("Cannot parse {line:?}: {e}"),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read stdin: {e}");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    info!(
        "Published {} message(s) in {} ms",
        broker.published(),
        supervisor.now_millis()
    );
}
