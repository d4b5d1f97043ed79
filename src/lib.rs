pub mod accumulator;
pub mod api;
pub mod clock;
pub mod configuration;
pub mod server;
pub mod sweep;
