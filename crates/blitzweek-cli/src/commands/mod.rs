pub mod config;
pub mod countdown;
pub mod register;
pub mod stats;
