//! Offline-first synchronization between the local cache and the sheet.

pub mod connectivity;
mod engine;
mod replay;

pub use connectivity::{probe, Connectivity};
pub use engine::{SyncEngine, SyncError};
pub use replay::ReplayReport;
