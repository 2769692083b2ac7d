pub mod config;
pub mod economics;
pub mod engine;
pub mod report;
pub mod state;
