//! State shared between the interrupt and main-loop contexts.

use core::cell::RefCell;

use critical_section::Mutex;

/// A value updated from both execution contexts.
///
/// Access happens inside a critical section held only for the closure
/// body; keep the closures to a single logical update, never a
/// blocking or unbounded operation.
#[derive(Debug)]
pub struct Shared<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the shared value inside a critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Recover the inner value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn updates_are_visible() {
        let shared = Shared::new(0u32);
        shared.with(|v| *v += 5);
        assert_eq!(shared.with(|v| *v), 5);
        assert_eq!(shared.into_inner(), 5);
    }

    #[test]
    fn ring_across_contexts() {
        use crate::ring::{Sample, SampleRing};
        use tcslib::ColorReading;

        // the completion handler writes, the dispatcher reads
        let shared = Shared::new(SampleRing::<4>::new());
        shared.with(|ring| {
            ring.put(Sample {
                reading: ColorReading::default(),
                timestamp_ms: 42,
            })
        });
        assert_eq!(shared.with(|ring| ring.latest().map(|s| s.timestamp_ms)), Some(42));
    }
}
