//! 基础设施层

pub mod cleanup;
pub mod delivery;
pub mod persistence;

pub use cleanup::CleanupTask;
