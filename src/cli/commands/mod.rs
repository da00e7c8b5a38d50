pub mod config;
pub mod onboard;
pub mod state;
