mod clock;
mod engine;
mod milestone;
mod phase;
mod scheduler;
mod window;

pub use clock::{Clock, ClockState, ManualClock, SystemClock, TimeSource};
pub use engine::{CountdownEngine, EngineBuilder, Snapshot, Subscription};
pub use milestone::{MilestoneEffect, MilestoneFiring, MilestoneLatch};
pub use phase::{
    compute_phase, compute_phase_ms, notice_at_ms, secs_until, CountdownNotice, Phase,
    RemainingDuration,
};
pub use scheduler::{delay_until_next_second, TickScheduler, DEFAULT_TICK_EPSILON};
pub use window::EventWindow;
