//! deskqueue: front-desk visitor queue core
//!
//! Gap-free date-scoped queue-number issuance under concurrent kiosk
//! submissions, atomic dual-write record commits, a retry/backoff
//! submission pipeline with a device-local emergency fallback, and live
//! ordered queue snapshots for waiting-room displays.

pub mod app;
pub mod core;
pub mod queue;
pub mod storage;
pub mod store;
