use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

/// Process-wide flag telling the request layer whether to admit mutations.
///
/// Clones share the same flag. Only the maintenance run may raise it.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    raised: Arc<AtomicBool>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_admitting(&self) -> bool {
        !self.raised.load(Ordering::Acquire)
    }

    /// Raise the gate until the returned guard is dropped.
    pub(crate) fn raise(&self) -> GateGuard {
        self.raised.store(true, Ordering::Release);
        info!("Admission gate raised");
        GateGuard { gate: self.clone() }
    }
}

/// Lowers the gate on drop, including during unwinding.
#[must_use = "the gate is lowered as soon as the guard is dropped"]
pub struct GateGuard {
    gate: AdmissionGate,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.raised.store(false, Ordering::Release);
        info!("Admission gate lowered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_by_default() {
        assert!(AdmissionGate::new().is_admitting());
    }

    #[test]
    fn guard_scopes_the_raise() {
        let gate = AdmissionGate::new();
        let reader = gate.clone();
        {
            let _guard = gate.raise();
            assert!(!reader.is_admitting());
        }
        assert!(reader.is_admitting());
    }

    #[test]
    fn panic_inside_the_scope_still_lowers() {
        let gate = AdmissionGate::new();
        let inner = gate.clone();

        let outcome = std::panic::catch_unwind(move || {
            let _guard = inner.raise();
            panic!("recompute blew up");
        });

        assert!(outcome.is_err());
        assert!(gate.is_admitting());
    }
}
