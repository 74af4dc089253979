//! Key event handler contracts
//!
//! Two traits cooperate here:
//!
//! - [`KeyEventHandler`] is the capability any type opts into. It is used as a
//!   generic bound, so the event pump calls it without dynamic dispatch.
//! - [`KeyHandler`] is the object-safe form stored in heterogeneous
//!   collections. [`KeyHandlerAdapter`] bridges a capability implementor to it.
//!
//! Adapters are owned by an [`EventManager`](super::EventManager); callers keep
//! a [`HandlerId`](super::HandlerId) instead of a reference, so a removed
//! handler is detected rather than dangling.

use std::any::Any;

use super::key_event::KeyEvent;

/// Capability: the type can handle key events
pub trait KeyEventHandler {
    /// Handle a single key event
    fn handle_key_event(&mut self, event: &KeyEvent);
}

/// Runtime-dispatchable key handler
pub trait KeyHandler {
    /// Handle a single key event
    fn handle_event(&mut self, event: &KeyEvent);

    /// Get access to the concrete type for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Get mutable access to the concrete type for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert the boxed handler into a boxed `Any` for downcasting by value
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Adapts a [`KeyEventHandler`] to the [`KeyHandler`] interface
///
/// The downcasting accessors expose the wrapped handler, not the adapter.
#[derive(Debug, Default)]
pub struct KeyHandlerAdapter<H> {
    inner: H,
}

impl<H> KeyHandlerAdapter<H> {
    /// Wrap a handler
    pub const fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: KeyEventHandler + 'static> KeyHandler for KeyHandlerAdapter<H> {
    fn handle_event(&mut self, event: &KeyEvent) {
        self.inner.handle_key_event(event);
    }

    fn as_any(&self) -> &dyn Any {
        &self.inner
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.inner
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.inner)
    }
}

/// Closure-backed handler, see [`from_fn`]
pub struct FnHandler<F> {
    f: F,
}

/// Build a handler from a closure
pub const fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&KeyEvent),
{
    FnHandler { f }
}

impl<F> KeyEventHandler for FnHandler<F>
where
    F: FnMut(&KeyEvent),
{
    fn handle_key_event(&mut self, event: &KeyEvent) {
        (self.f)(event);
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Records every event in arrival order
impl KeyEventHandler for Vec<KeyEvent> {
    fn handle_key_event(&mut self, event: &KeyEvent) {
        self.push(*event);
    }
}

impl<H: KeyEventHandler + ?Sized> KeyEventHandler for &mut H {
    fn handle_key_event(&mut self, event: &KeyEvent) {
        (**self).handle_key_event(event);
    }
}

/// Deliver `events` to `handler` in order, statically dispatched
pub fn dispatch_all<H, I>(handler: &mut H, events: I)
where
    H: KeyEventHandler + ?Sized,
    I: IntoIterator<Item = KeyEvent>,
{
    for event in events {
        handler.handle_key_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::KeyAction;

    #[derive(Default)]
    struct PressCounter {
        presses: usize,
    }

    impl KeyEventHandler for PressCounter {
        fn handle_key_event(&mut self, event: &KeyEvent) {
            if event.is_press() {
                self.presses += 1;
            }
        }
    }

    fn sample() -> [KeyEvent; 3] {
        [
            KeyEvent::with_value(KeyAction::Press, 0x26),
            KeyEvent::with_value(KeyAction::Release, 0x26),
            KeyEvent::with_value(KeyAction::Press, 0x27),
        ]
    }

    #[test]
    fn test_static_dispatch() {
        let mut counter = PressCounter::default();
        dispatch_all(&mut counter, sample());
        assert_eq!(counter.presses, 2);
    }

    #[test]
    fn test_adapter_forwards_to_wrapped_handler() {
        let mut adapter: Box<dyn KeyHandler> =
            Box::new(KeyHandlerAdapter::new(PressCounter::default()));
        for event in sample() {
            adapter.handle_event(&event);
        }

        let counter = adapter.as_any().downcast_ref::<PressCounter>();
        assert_eq!(counter.map(|c| c.presses), Some(2));

        let counter = adapter.into_any().downcast::<PressCounter>().ok();
        assert_eq!(counter.map(|c| c.presses), Some(2));
    }

    #[test]
    fn test_closure_and_recording_handlers() {
        let mut seen = 0;
        dispatch_all(&mut from_fn(|_: &KeyEvent| seen += 1), sample());
        assert_eq!(seen, 3);

        let mut recorded: Vec<KeyEvent> = Vec::new();
        dispatch_all(&mut recorded, sample());
        assert_eq!(recorded, sample());
    }

    #[test]
    fn test_dispatch_through_trait_object() {
        let mut recorded: Vec<KeyEvent> = Vec::new();
        {
            let handler: &mut dyn KeyEventHandler = &mut recorded;
            dispatch_all(handler, sample());
        }
        assert_eq!(recorded.len(), 3);
    }
}
