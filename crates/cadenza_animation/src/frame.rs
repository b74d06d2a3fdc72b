//! Frame driving
//!
//! The host owns the real "run before next paint" facility and exposes it
//! through [`FrameRequester`]. [`FrameDriver`] wraps it so that any number
//! of logical requests within one frame collapse into a single host
//! request.

use std::cell::Cell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a callback scheduled for the next frame
    pub struct FrameHandle;
}

/// Host capability: ask for one frame to be delivered later
///
/// The host answers by calling `Scheduler::frame` once.
pub trait FrameRequester {
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameRequester for F {
    fn request_frame(&mut self) {
        self()
    }
}

/// Requester that only records requests
///
/// Used by headless hosts that poll for work instead of waiting on a
/// display link. Clones share their counters.
#[derive(Clone, Debug, Default)]
pub struct FrameCounter {
    total: Rc<Cell<u64>>,
    requested: Rc<Cell<bool>>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of host requests made so far
    pub fn total(&self) -> u64 {
        self.total.get()
    }

    /// Check if a frame was requested and clear the flag
    pub fn take_request(&self) -> bool {
        self.requested.replace(false)
    }
}

impl FrameRequester for FrameCounter {
    fn request_frame(&mut self) {
        self.total.set(self.total.get() + 1);
        self.requested.set(true);
    }
}

/// De-duplicating wrapper around a [`FrameRequester`]
///
/// Also holds the one-shot callbacks to run in the next frame. A cancelled
/// callback is neutered in place rather than removed, so the frame it was
/// scheduled for still happens.
pub struct FrameDriver<C> {
    requester: Box<dyn FrameRequester>,
    /// A host request is outstanding
    ticking: bool,
    has_restarted_this_frame: bool,
    callbacks: SlotMap<FrameHandle, Option<C>>,
    order: Vec<FrameHandle>,
}

impl<C> FrameDriver<C> {
    pub fn new(requester: Box<dyn FrameRequester>) -> Self {
        Self {
            requester,
            ticking: false,
            has_restarted_this_frame: false,
            callbacks: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Make sure a host frame is outstanding
    ///
    /// Returns whether this call made the host request.
    pub fn ensure_frame(&mut self) -> bool {
        if self.ticking {
            return false;
        }
        self.ticking = true;
        self.requester.request_frame();
        tracing::debug!("requested host frame");
        true
    }

    /// Ensure a frame and report whether one was newly scheduled this turn
    pub fn restart(&mut self) -> bool {
        if self.ensure_frame() {
            self.has_restarted_this_frame = true;
        }
        self.has_restarted_this_frame
    }

    /// Called when the host delivers the frame
    pub fn begin_frame(&mut self) {
        self.ticking = false;
        self.has_restarted_this_frame = false;
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn set_ticking(&mut self, ticking: bool) {
        self.ticking = ticking;
    }

    pub fn has_restarted_this_frame(&self) -> bool {
        self.has_restarted_this_frame
    }

    /// Schedule `callback` for the next frame
    pub fn request(&mut self, callback: C) -> FrameHandle {
        let handle = self.callbacks.insert(Some(callback));
        self.order.push(handle);
        self.ensure_frame();
        handle
    }

    /// Neuter a scheduled callback
    ///
    /// Returns false when the handle already ran or was never issued.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        match self.callbacks.get_mut(handle) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Number of callbacks waiting for the next frame, neutered ones included
    pub fn pending_callbacks(&self) -> usize {
        self.order.len()
    }

    /// Remove the callbacks scheduled so far, in request order
    ///
    /// Callbacks requested while the returned ones run belong to the next
    /// frame.
    pub fn take_callbacks(&mut self) -> Vec<C> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|handle| self.callbacks.remove(handle).flatten())
            .collect()
    }
}

impl<C> std::fmt::Debug for FrameDriver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("ticking", &self.ticking)
            .field("has_restarted_this_frame", &self.has_restarted_this_frame)
            .field("pending_callbacks", &self.order.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> (FrameDriver<u32>, FrameCounter) {
        let counter = FrameCounter::new();
        (FrameDriver::new(Box::new(counter.clone())), counter)
    }

    #[test]
    fn test_requests_collapse_until_frame() {
        let (mut driver, counter) = driver();
        assert!(driver.ensure_frame());
        assert!(!driver.ensure_frame());
        driver.request(1);
        driver.request(2);
        assert_eq!(counter.total(), 1);
        assert!(counter.take_request());
        assert!(!counter.take_request());

        driver.begin_frame();
        assert!(!driver.is_ticking());
        assert!(driver.ensure_frame());
        assert_eq!(counter.total(), 2);
    }

    #[test]
    fn test_restart_reports_whether_this_turn_scheduled() {
        let (mut driver, counter) = driver();
        assert!(driver.restart());
        // Piggy-backs on the request made above
        assert!(driver.restart());
        assert_eq!(counter.total(), 1);

        driver.begin_frame();
        driver.ensure_frame();
        assert!(!driver.restart());
        assert!(!driver.has_restarted_this_frame());
    }

    #[test]
    fn test_cancel_neuters_callback() {
        let (mut driver, _) = driver();
        let a = driver.request(1);
        let b = driver.request(2);
        driver.request(3);

        assert!(driver.cancel(b));
        assert!(!driver.cancel(b));
        assert_eq!(driver.pending_callbacks(), 3);
        assert_eq!(driver.take_callbacks(), vec![1, 3]);

        assert!(!driver.cancel(a));
        assert!(driver.take_callbacks().is_empty());
    }

    #[test]
    fn test_closure_requester() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut driver: FrameDriver<()> =
            FrameDriver::new(Box::new(move || seen.set(seen.get() + 1)));
        driver.ensure_frame();
        driver.ensure_frame();
        assert_eq!(calls.get(), 1);
    }
}
