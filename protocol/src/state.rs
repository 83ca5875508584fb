use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum DeviceState {
    Idle,
    Sleep,
    Active,
    Reboot,
    Error,
}

impl DeviceState {
    /// A node is alive unless it is recovering from a fault.
    pub fn is_alive(self) -> bool {
        !matches!(self, Self::Reboot | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum AlertKind {
    ComsFail,
    SensorFail,
    SystemFail,
    ProcessingFail,
    RegisterFail,
    UpdateFail,
    SchedulerFail,
    TaskFail,
    Reboot,
}

impl AlertKind {
    pub fn reason(self) -> &'static str {
        match self {
            Self::ComsFail => "Coms failure",
            Self::SensorFail => "Sensor failure",
            Self::SystemFail => "System failure",
            Self::ProcessingFail => "Processing failure",
            Self::RegisterFail => "Register failure",
            Self::UpdateFail => "Update failure",
            Self::SchedulerFail => "Scheduler failure",
            Self::TaskFail => "Task failure",
            Self::Reboot => "Rebooting",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alive() {
        assert!(DeviceState::Active.is_alive());
        assert!(DeviceState::Idle.is_alive());
        assert!(!DeviceState::Reboot.is_alive());
        assert!(!DeviceState::Error.is_alive());
    }
}
