//! # Blitzweek Core Library
//!
//! Core logic for the ScaleUp Blitz Week event companion: a second-accurate
//! countdown to a fixed event window, corrected against the backend's clock,
//! plus the registration and live-stats calls the event site makes.
//!
//! ## Architecture
//!
//! - **Countdown**: Phase calculator, boundary-aligned tick scheduler,
//!   server-offset time source and a fire-once milestone latch, tied
//!   together by [`CountdownEngine`]
//! - **API**: Async HTTP client for the event backend
//! - **Registration**: Form validation, normalization and submission
//! - **Stats**: Live registration counts with per-refresh deltas
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Explicitly constructed countdown handle
//! - [`ApiClient`]: Backend client
//! - [`Config`]: Application configuration management
//! - [`Event`]: Engine state changes

pub mod api;
pub mod countdown;
pub mod error;
pub mod events;
pub mod registration;
pub mod stats;
pub mod storage;

pub use api::{ApiClient, LiveCount, RegistrationStatus};
pub use countdown::{
    compute_phase, CountdownEngine, CountdownNotice, EventWindow, Phase, RemainingDuration,
    Snapshot,
};
pub use error::{ApiError, ConfigError, CoreError, FieldError, ValidationError};
pub use events::Event;
pub use registration::{RegistrationForm, RegistrationPayload, RegistrationReceipt, Track};
pub use stats::{LiveStats, StatsDelta, StatsHistory};
pub use storage::Config;
