use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tracing::debug;

/// Admits one request at a time across the whole process.
#[derive(Debug, Default)]
pub struct RequestGate {
    busy: AtomicBool,
}

/// Proof of holding the gate. Dropping it releases the gate, so every exit path releases exactly once.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct GatePermit {
    gate: Arc<RequestGate>,
}

impl RequestGate {
    pub fn new() -> Arc<Self> {
        Arc::new(RequestGate::default())
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<GatePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit { gate: Arc::clone(self) })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl GatePermit {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
        debug!("gate released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let gate = RequestGate::new();

        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());

        permit.release();
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn dropping_permit_releases() {
        let gate = RequestGate::new();
        {
            let _permit = gate.try_acquire().unwrap();
            assert!(gate.is_busy());
        }
        assert!(!gate.is_busy());
    }

    #[test]
    fn panicking_holder_releases() {
        let gate = RequestGate::new();
        let cloned = Arc::clone(&gate);
        let result = thread::spawn(move || {
            let _permit = cloned.try_acquire().unwrap();
            panic!("worker died");
        })
        .join();

        assert!(result.is_err());
        assert!(!gate.is_busy());
    }

    #[test]
    fn only_one_of_many_concurrent_callers_acquires() {
        let gate = RequestGate::new();
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    gate.try_acquire()
                })
            })
            .collect();

        let permits: Vec<GatePermit> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(permits.len(), 1);
        assert!(gate.is_busy());
    }
}
