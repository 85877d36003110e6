//! Plugin configuration lock
//!
//! Authentication plugins are loaded once per process, so their options and
//! callbacks are shared by every connection. [`PluginConfigGuard`] is the one
//! shared service object; each establishment attempt takes a [`PluginLock`]
//! handle from it and drives the lock protocol through [`LockRequest`]s.
//!
//! Lock table updates happen under a short `parking_lot` mutex. Waiters park on
//! a `Notify` that is signalled on every release, so release from `Drop` stays
//! synchronous and waiting stays cancel safe.

use super::callback::{AuthMessageCallback, CallbackTarget};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

/// Lock protocol request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRequest {
    /// Shared hold; no-op when anything is already held
    Shared,
    /// Shared hold that ignores `Unlock` until `Unguard`
    Guard,
    /// Exclusive hold, upgrading any shared hold
    Exclusive,
    /// Release, unless guarded
    Unlock,
    /// Release everything, including the guard
    Unguard,
}

/// Observable global lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginLockState {
    Unlocked,
    /// Shared holders, none guarded
    Shared(usize),
    /// Shared holders while at least one handle is guarded
    Guarded(usize),
    Exclusive,
}

/// What one handle currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    None,
    Shared,
    Exclusive,
}

#[derive(Debug, Default)]
struct LockTable {
    readers: usize,
    guarded: usize,
    exclusive: bool,
}

#[derive(Default)]
struct PluginConfig {
    target: CallbackTarget,
    callback: Option<AuthMessageCallback>,
}

/// Process wide authentication plugin configuration
///
/// Create one and share it (`Arc`) with every driver.
#[derive(Default)]
pub struct PluginConfigGuard {
    table: Mutex<LockTable>,
    released: Notify,
    config: Mutex<PluginConfig>,
}

impl fmt::Debug for PluginConfigGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfigGuard")
            .field("state", &self.state())
            .field("target", &self.config.lock().target)
            .finish()
    }
}

impl PluginConfigGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// New lock handle holding nothing
    pub fn handle(self: &Arc<Self>) -> PluginLock {
        PluginLock {
            guard: Arc::clone(self),
            hold: Hold::None,
            guarded: false,
        }
    }

    /// Current global lock state
    pub fn state(&self) -> PluginLockState {
        let t = self.table.lock();
        if t.exclusive {
            PluginLockState::Exclusive
        } else if t.readers == 0 {
            // a guarded handle whose exclusive upgrade was cancelled holds nothing
            PluginLockState::Unlocked
        } else if t.guarded > 0 {
            PluginLockState::Guarded(t.readers)
        } else if t.readers > 0 {
            PluginLockState::Shared(t.readers)
        } else {
            PluginLockState::Unlocked
        }
    }

    /// Who the plugin callback currently reaches
    pub fn callback_target(&self) -> CallbackTarget {
        self.config.lock().target
    }

    /// Current target together with the callback installed for it
    pub fn routing(&self) -> (CallbackTarget, Option<AuthMessageCallback>) {
        let config = self.config.lock();
        (config.target, config.callback.clone())
    }

    /// Deliver a plugin message to the installed callback, if any.
    ///
    /// Returns whether a callback was invoked.
    pub fn dispatch(&self, message: &str) -> bool {
        let callback = self.config.lock().callback.clone();
        match callback {
            Some(cb) => {
                cb(message);
                true
            }
            None => false,
        }
    }

    fn try_shared(&self) -> bool {
        let mut t = self.table.lock();
        if t.exclusive {
            return false;
        }
        t.readers += 1;
        true
    }

    fn try_exclusive(&self) -> bool {
        let mut t = self.table.lock();
        if t.exclusive || t.readers > 0 {
            return false;
        }
        t.exclusive = true;
        true
    }

    fn release(&self, hold: Hold) {
        {
            let mut t = self.table.lock();
            match hold {
                Hold::None => return,
                Hold::Shared => t.readers = t.readers.saturating_sub(1),
                Hold::Exclusive => t.exclusive = false,
            }
        }
        self.released.notify_waiters();
    }

    fn set_guarded(&self, on: bool) {
        let mut t = self.table.lock();
        if on {
            t.guarded += 1;
        } else {
            t.guarded = t.guarded.saturating_sub(1);
        }
    }
}

/// One holder's view of the plugin lock
///
/// Dropping the handle releases whatever it holds, guard included.
pub struct PluginLock {
    guard: Arc<PluginConfigGuard>,
    hold: Hold,
    guarded: bool,
}

impl fmt::Debug for PluginLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLock")
            .field("hold", &self.hold)
            .field("guarded", &self.guarded)
            .finish()
    }
}

impl PluginLock {
    pub fn hold(&self) -> Hold {
        self.hold
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    pub fn guard(&self) -> &Arc<PluginConfigGuard> {
        &self.guard
    }

    /// Apply one lock protocol request
    ///
    /// Only `Shared`, `Guard` and `Exclusive` can wait.
    pub async fn request(&mut self, request: LockRequest) {
        tracing::trace!(?request, hold = ?self.hold, guarded = self.guarded, "plugin lock request");
        match request {
            LockRequest::Shared => {
                if self.hold == Hold::None {
                    self.acquire_shared().await;
                }
            }
            LockRequest::Guard => {
                if self.hold == Hold::None {
                    self.acquire_shared().await;
                }
                if !self.guarded {
                    self.guarded = true;
                    self.guard.set_guarded(true);
                }
            }
            LockRequest::Exclusive => self.acquire_exclusive().await,
            LockRequest::Unlock => {
                if !self.guarded {
                    self.release();
                }
            }
            LockRequest::Unguard => {
                self.release();
                if self.guarded {
                    self.guarded = false;
                    self.guard.set_guarded(false);
                }
            }
        }
    }

    /// Install a new callback target; requires the exclusive hold
    pub fn set_callback_target(
        &self,
        target: CallbackTarget,
        callback: Option<AuthMessageCallback>,
    ) -> Result<()> {
        if self.hold != Hold::Exclusive {
            return Err(Error::InvalidState {
                expected: "exclusive plugin lock".into(),
                actual: format!("{:?}", self.hold),
            });
        }
        let mut config = self.guard.config.lock();
        config.target = target;
        config.callback = callback;
        Ok(())
    }

    async fn acquire_shared(&mut self) {
        loop {
            let released = self.guard.released.notified();
            if self.guard.try_shared() {
                self.hold = Hold::Shared;
                return;
            }
            released.await;
        }
    }

    async fn acquire_exclusive(&mut self) {
        match self.hold {
            Hold::Exclusive => return,
            // Upgrading gives up the shared hold first; callers re-read shared
            // state once exclusive.
            Hold::Shared => self.release(),
            Hold::None => {}
        }
        loop {
            let released = self.guard.released.notified();
            if self.guard.try_exclusive() {
                self.hold = Hold::Exclusive;
                return;
            }
            released.await;
        }
    }

    fn release(&mut self) {
        let hold = std::mem::replace(&mut self.hold, Hold::None);
        self.guard.release(hold);
    }
}

impl Drop for PluginLock {
    fn drop(&mut self) {
        self.release();
        if self.guarded {
            self.guard.set_guarded(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    fn guard() -> Arc<PluginConfigGuard> {
        Arc::new(PluginConfigGuard::new())
    }

    #[tokio::test]
    async fn test_shared_holders_coexist() {
        let g = guard();
        let mut a = g.handle();
        let mut b = g.handle();
        a.request(LockRequest::Shared).await;
        b.request(LockRequest::Shared).await;
        assert_eq!(g.state(), PluginLockState::Shared(2));
        drop(a);
        drop(b);
        assert_eq!(g.state(), PluginLockState::Unlocked);
    }

    #[tokio::test]
    async fn test_repeated_shared_is_noop() {
        let g = guard();
        let mut a = g.handle();
        a.request(LockRequest::Shared).await;
        a.request(LockRequest::Shared).await;
        assert_eq!(g.state(), PluginLockState::Shared(1));
    }

    #[tokio::test]
    async fn test_guard_survives_unlock() {
        let g = guard();
        let mut a = g.handle();
        a.request(LockRequest::Guard).await;
        a.request(LockRequest::Unlock).await;
        a.request(LockRequest::Unlock).await;
        assert_eq!(a.hold(), Hold::Shared);
        assert_eq!(g.state(), PluginLockState::Guarded(1));

        a.request(LockRequest::Unguard).await;
        assert_eq!(a.hold(), Hold::None);
        assert_eq!(g.state(), PluginLockState::Unlocked);
    }

    #[tokio::test]
    async fn test_guard_extends_existing_shared_hold() {
        let g = guard();
        let mut a = g.handle();
        a.request(LockRequest::Shared).await;
        a.request(LockRequest::Guard).await;
        assert_eq!(g.state(), PluginLockState::Guarded(1));
        a.request(LockRequest::Unlock).await;
        assert_eq!(a.hold(), Hold::Shared);
    }

    #[tokio::test]
    async fn test_cancelled_guarded_upgrade_reports_unlocked() {
        let g = guard();
        let mut a = g.handle();
        let mut b = g.handle();
        a.request(LockRequest::Guard).await;
        b.request(LockRequest::Shared).await;

        let mut upgrade = task::spawn(a.request(LockRequest::Exclusive));
        assert_pending!(upgrade.poll());
        assert_eq!(g.state(), PluginLockState::Guarded(1));
        drop(upgrade);

        b.request(LockRequest::Unlock).await;
        assert_eq!(a.hold(), Hold::None);
        assert!(a.is_guarded());
        assert_eq!(g.state(), PluginLockState::Unlocked);

        a.request(LockRequest::Shared).await;
        assert_eq!(g.state(), PluginLockState::Guarded(1));
        a.request(LockRequest::Unguard).await;
        assert_eq!(g.state(), PluginLockState::Unlocked);
    }

    #[tokio::test]
    async fn test_exclusive_waits_for_readers() {
        let g = guard();
        let mut a = g.handle();
        let mut b = g.handle();
        a.request(LockRequest::Shared).await;
        b.request(LockRequest::Shared).await;

        let mut w = g.handle();
        let mut fut = task::spawn(w.request(LockRequest::Exclusive));
        assert_pending!(fut.poll());

        a.request(LockRequest::Unlock).await;
        assert!(fut.is_woken());
        assert_pending!(fut.poll());

        b.request(LockRequest::Unlock).await;
        assert!(fut.is_woken());
        assert_ready!(fut.poll());
        drop(fut);

        assert_eq!(w.hold(), Hold::Exclusive);
        assert_eq!(g.state(), PluginLockState::Exclusive);
    }

    #[tokio::test]
    async fn test_shared_waits_for_exclusive() {
        let g = guard();
        let mut w = g.handle();
        w.request(LockRequest::Exclusive).await;

        let mut r = g.handle();
        let mut fut = task::spawn(r.request(LockRequest::Shared));
        assert_pending!(fut.poll());

        drop(w);
        assert!(fut.is_woken());
        assert_ready!(fut.poll());
        drop(fut);
        assert_eq!(r.hold(), Hold::Shared);
    }

    #[tokio::test]
    async fn test_upgrade_from_guard() {
        let g = guard();
        let mut a = g.handle();
        a.request(LockRequest::Guard).await;
        a.request(LockRequest::Exclusive).await;
        assert_eq!(a.hold(), Hold::Exclusive);
        assert!(a.is_guarded());

        // still guarded: unlock leaves the exclusive hold in place
        a.request(LockRequest::Unlock).await;
        assert_eq!(g.state(), PluginLockState::Exclusive);

        a.request(LockRequest::Unguard).await;
        assert_eq!(g.state(), PluginLockState::Unlocked);
    }

    #[tokio::test]
    async fn test_cancelled_exclusive_wait_holds_nothing() {
        let g = guard();
        let mut reader = g.handle();
        reader.request(LockRequest::Shared).await;

        let mut a = g.handle();
        a.request(LockRequest::Shared).await;
        {
            let mut fut = task::spawn(a.request(LockRequest::Exclusive));
            assert_pending!(fut.poll());
        }
        assert_eq!(a.hold(), Hold::None);
        assert_eq!(g.state(), PluginLockState::Shared(1));
    }

    #[tokio::test]
    async fn test_drop_releases_guard() {
        let g = guard();
        {
            let mut a = g.handle();
            a.request(LockRequest::Guard).await;
            a.request(LockRequest::Exclusive).await;
        }
        assert_eq!(g.state(), PluginLockState::Unlocked);
    }

    #[tokio::test]
    async fn test_set_callback_target_requires_exclusive() {
        let g = guard();
        let mut a = g.handle();
        a.request(LockRequest::Shared).await;
        assert!(a
            .set_callback_target(CallbackTarget::PluginDefault, None)
            .is_err());

        a.request(LockRequest::Exclusive).await;
        a.set_callback_target(CallbackTarget::PluginDefault, None)
            .unwrap();
        assert_eq!(g.callback_target(), CallbackTarget::PluginDefault);
    }

    #[tokio::test]
    async fn test_dispatch_reaches_installed_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let g = guard();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let cb: AuthMessageCallback = Arc::new(move |_msg: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!g.dispatch("touch"));
        let mut a = g.handle();
        a.request(LockRequest::Exclusive).await;
        a.set_callback_target(CallbackTarget::PluginDefault, Some(cb))
            .unwrap();
        assert!(g.dispatch("touch"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
