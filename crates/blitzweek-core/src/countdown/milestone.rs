use super::phase::Phase;

/// Side effect run when the event goes live.
pub type MilestoneEffect = Box<dyn FnOnce() + Send>;

/// One-shot latch guarding the go-live effect.
///
/// Fires on the first observed transition into [`Phase::Live`] and never
/// again, no matter how many later ticks report `Live` or in what order
/// they arrive.
#[derive(Default)]
pub struct MilestoneLatch {
    fired: bool,
    effect: Option<MilestoneEffect>,
}

impl MilestoneLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(effect: MilestoneEffect) -> Self {
        Self {
            fired: false,
            effect: Some(effect),
        }
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Set the latch if this transition enters `Live` for the first time.
    ///
    /// The returned firing carries the effect so the caller can run it after
    /// releasing its own locks. `previous` is `None` for the first
    /// observation after start-up, so an engine started mid-event still
    /// fires once.
    pub fn trip(&mut self, previous: Option<Phase>, current: Phase) -> Option<MilestoneFiring> {
        if self.fired || current != Phase::Live || previous == Some(Phase::Live) {
            return None;
        }
        self.fired = true;
        Some(MilestoneFiring(self.effect.take()))
    }

    /// [`trip`](Self::trip) and run the effect immediately.
    ///
    /// Returns `true` if this call fired the latch.
    pub fn on_phase_change(&mut self, previous: Option<Phase>, current: Phase) -> bool {
        match self.trip(previous, current) {
            Some(firing) => {
                firing.run();
                true
            }
            None => false,
        }
    }
}

/// A tripped latch whose effect has not run yet.
#[must_use = "the milestone effect only runs when `run` is called"]
pub struct MilestoneFiring(Option<MilestoneEffect>);

impl MilestoneFiring {
    pub fn run(self) {
        if let Some(effect) = self.0 {
            effect();
        }
    }
}

impl std::fmt::Debug for MilestoneLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilestoneLatch")
            .field("fired", &self.fired)
            .field("has_effect", &self.effect.is_some())
            .finish()
    }
}
