//! Authentication message callback routing
//!
//! The WebAuthn client plugin prints prompts ("touch your device") through a
//! single process wide callback. Each driver may supply its own; the plugin
//! can only reach one of them at a time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback receiving authentication plugin messages
pub type AuthMessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Identity of one driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(u64);

static NEXT_DRIVER_ID: AtomicU64 = AtomicU64::new(1);

impl DriverId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver-{}", self.0)
    }
}

/// Who the plugin's message callback currently reaches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackTarget {
    /// Never configured in this process
    #[default]
    Unconfigured,
    /// Plugin's own default output
    PluginDefault,
    /// A driver supplied callback
    Caller(DriverId),
}

/// Target the plugin must be switched to for `driver`, if any.
///
/// A driver without a callback only resets a callback installed by some
/// driver. A driver with one installs it unless that very callback is already
/// in place; a replaced callback or a clone carrying another one reinstalls.
pub fn required_target(
    current: CallbackTarget,
    installed: Option<&AuthMessageCallback>,
    driver: DriverId,
    callback: Option<&AuthMessageCallback>,
) -> Option<CallbackTarget> {
    match (callback, current) {
        (None, CallbackTarget::Caller(_)) => Some(CallbackTarget::PluginDefault),
        (None, _) => None,
        (Some(cb), CallbackTarget::Caller(id))
            if id == driver && installed.is_some_and(|i| Arc::ptr_eq(i, cb)) =>
        {
            None
        }
        (Some(_), _) => Some(CallbackTarget::Caller(driver)),
    }
}

/// Value set on an authentication plugin option
#[derive(Clone)]
pub enum PluginValue {
    Str(String),
    Int(i64),
    /// Restore the plugin default
    Reset,
    /// Message callback; `None` restores the plugin default
    Callback(Option<AuthMessageCallback>),
}

impl fmt::Debug for PluginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Reset => f.write_str("Reset"),
            Self::Callback(cb) => f
                .debug_tuple("Callback")
                .field(&cb.as_ref().map(|_| "<fn>"))
                .finish(),
        }
    }
}
