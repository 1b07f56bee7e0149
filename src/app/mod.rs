//! Application module: composition root for the demo kiosk binary

pub mod args;
pub mod config;
pub mod flow;
pub mod startup;
