//! Authentication plugin configuration
//!
//! This module handles:
//! * The shared plugin configuration guard and its lock protocol
//! * Routing of plugin messages to per-driver callbacks

mod callback;
mod lock;

pub use callback::{required_target, AuthMessageCallback, CallbackTarget, DriverId, PluginValue};
pub use lock::{Hold, LockRequest, PluginConfigGuard, PluginLock, PluginLockState};
