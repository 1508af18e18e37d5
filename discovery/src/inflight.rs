//! A slot holding at most one call in flight, checked without blocking.

use futures::{
    future::BoxFuture,
    task::{noop_waker_ref, Context, Poll},
    Future, FutureExt,
};

/// Either empty or holding one pending call.
///
/// The call is polled with a no-op waker: completion is discovered the next time the owner
/// checks, never through a callback.
pub(crate) struct InFlight<T> {
    call: Option<BoxFuture<'static, T>>,
}

impl<T> InFlight<T> {
    pub(crate) fn new() -> Self {
        Self { call: None }
    }

    /// Returns whether no call is in flight.
    pub(crate) fn is_idle(&self) -> bool {
        self.call.is_none()
    }

    /// Start tracking `call`.
    ///
    /// # Panics
    ///
    /// Panics if a call is already in flight.
    pub(crate) fn start<F>(&mut self, call: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        assert!(self.call.is_none(), "call already in flight");
        self.call = Some(call.boxed());
    }

    /// Returns the result of the call if it has completed, emptying the slot.
    pub(crate) fn check(&mut self) -> Option<T> {
        let call = self.call.as_mut()?;
        let mut cx = Context::from_waker(noop_waker_ref());
        match call.poll_unpin(&mut cx) {
            Poll::Ready(result) => {
                self.call = None;
                Some(result)
            }
            Poll::Pending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;

    #[test]
    fn test_check_without_blocking() {
        let mut slot = InFlight::new();
        assert!(slot.is_idle());
        assert!(slot.check().is_none());

        // Pending until the result is delivered
        let (sender, receiver) = oneshot::channel::<u32>();
        slot.start(receiver);
        assert!(!slot.is_idle());
        assert!(slot.check().is_none());
        assert!(!slot.is_idle());

        // Ready once delivered, then empty again
        sender.send(7).unwrap();
        assert_eq!(slot.check(), Some(Ok(7)));
        assert!(slot.is_idle());
    }

    #[test]
    #[should_panic(expected = "call already in flight")]
    fn test_single_call() {
        let mut slot = InFlight::new();
        slot.start(futures::future::pending::<()>());
        slot.start(futures::future::pending::<()>());
    }
}
