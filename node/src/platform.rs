/// Which reset vector to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub enum ResetKind {
    Hard,
    Soft,
}

/// Board services the supervisor depends on.
pub trait Platform {
    /// Milliseconds since boot.
    fn now_millis(&self) -> u64;

    /// Parks the node until it is reset externally.
    ///
    /// On hardware this never returns. Implementations that do return (host
    /// builds, tests) leave the supervisor halted: no further passes run.
    fn halt(&mut self);

    fn reset(&mut self, kind: ResetKind);
}
