//! Process-wide session flags shared with the host.

use crate::types::Identity;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of the current session's credentials.
pub trait IdentityProvider: Send + Sync {
    fn identity(&self) -> Identity;
}

/// Credentials held in memory, replaceable when the host re-authenticates.
#[derive(Debug)]
pub struct SessionIdentity {
    identity: RwLock<Identity>,
}

impl SessionIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: RwLock::new(identity),
        }
    }

    pub fn set(&self, identity: Identity) {
        *self.identity.write() = identity;
    }
}

impl IdentityProvider for SessionIdentity {
    fn identity(&self) -> Identity {
        self.identity.read().clone()
    }
}

/// Injected state holder for the global error slot and the readiness gate.
///
/// The error slot holds a single code; each write replaces the previous
/// one. Only [`SessionFlags::reset`] clears it.
#[derive(Debug, Default)]
pub struct SessionFlags {
    error: RwLock<Option<String>>,
    subscriptions_ready: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_code(&self) -> Option<String> {
        self.error.read().clone()
    }

    pub fn has_error(&self) -> bool {
        self.error.read().is_some()
    }

    pub fn set_error(&self, code: impl Into<String>) {
        *self.error.write() = Some(code.into());
    }

    /// Latch the readiness gate. Returns true if this call flipped it.
    pub fn mark_subscriptions_ready(&self) -> bool {
        !self.subscriptions_ready.swap(true, Ordering::SeqCst)
    }

    pub fn subscriptions_ready(&self) -> bool {
        self.subscriptions_ready.load(Ordering::SeqCst)
    }

    /// Full reset, used when the host tears the session down.
    pub fn reset(&self) {
        *self.error.write() = None;
        self.subscriptions_ready.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_wins() {
        let flags = SessionFlags::new();
        flags.set_error("403");
        flags.set_error("500");
        assert_eq!(flags.error_code().as_deref(), Some("500"));

        flags.reset();
        assert!(!flags.has_error());
    }

    #[test]
    fn test_identity_can_be_replaced() {
        let identity = SessionIdentity::new(Identity::new("m1", "w_1"));
        identity.set(Identity::new("m1", "w_2"));
        assert_eq!(identity.identity().actor_id.0, "w_2");
    }

    #[test]
    fn test_ready_latch_flips_once() {
        let flags = SessionFlags::new();
        assert!(flags.mark_subscriptions_ready());
        assert!(!flags.mark_subscriptions_ready());
        assert!(flags.subscriptions_ready());
    }
}
