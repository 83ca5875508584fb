use haligonia_node::platform::{Platform, ResetKind};
use log::{error, warn};
use std::time::{Duration, Instant};

/// Wall clock uptime. Halting and resetting only stop the simulation.
pub(crate) struct HostPlatform {
    boot: Instant,
    reset: Option<ResetKind>,
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self {
            boot: Instant::now(),
            reset: None,
        }
    }
}

impl HostPlatform {
    pub(crate) fn reset_requested(&self) -> Option<ResetKind> {
        self.reset
    }
}

impl Platform for HostPlatform {
    fn now_millis(&self) -> u64 {
        millis(self.boot.elapsed())
    }

    fn halt(&mut self) {
        error!("Node halted, waiting for an external reset");
    }

    fn reset(&mut self, kind: ResetKind) {
        warn!("{kind:?} reset requested");
        self.reset = Some(kind);
    }
}

/// Saturates instead of truncating.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn elapsed_millis() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn reset_is_recorded() {
        let mut platform = HostPlatform::default();
        assert_eq!(platform.reset_requested(), None);

        platform.reset(ResetKind::Soft);
        assert_eq!(platform.reset_requested(), Some(ResetKind::Soft));
    }
}
