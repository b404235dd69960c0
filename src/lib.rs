pub mod browse;
pub mod capture;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod guided;
pub mod logging;
pub mod manifest_store;
pub mod preview;
pub mod storage;
pub mod ui;
