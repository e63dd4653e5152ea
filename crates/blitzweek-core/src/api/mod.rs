mod client;

pub use client::{
    ApiClient, LiveCount, RegistrationStatus, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
