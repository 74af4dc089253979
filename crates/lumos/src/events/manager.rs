//! Handler registry
//!
//! The [`EventManager`] owns every registered handler and hands out
//! generation-checked [`HandlerId`]s. Handlers are notified in registration
//! order, synchronously, on the thread that pumps events.

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use super::handler::{KeyEventHandler, KeyHandler, KeyHandlerAdapter};
use super::key_event::KeyEvent;

new_key_type! {
    /// Handle to a handler owned by an [`EventManager`]
    ///
    /// Copying the id refers to the same handler; it never clones the handler
    /// itself. An id outlives its handler safely: once the handler is
    /// unregistered every lookup through the id fails with
    /// [`DispatchError::StaleHandler`].
    pub struct HandlerId;
}

/// Errors from handler lookup and dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The handler behind the id has been unregistered
    #[error("handler {0:?} is no longer registered")]
    StaleHandler(HandlerId),

    /// The handler exists but has a different concrete type
    #[error("handler {id:?} is not a {expected}")]
    TypeMismatch {
        /// Id that was looked up
        id: HandlerId,
        /// Requested type name
        expected: &'static str,
    },
}

/// Owning registry of key handlers
#[derive(Default)]
pub struct EventManager {
    handlers: SlotMap<HandlerId, Box<dyn KeyHandler>>,
    order: Vec<HandlerId>,
}

impl EventManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            handlers: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Register a handler, taking ownership of it
    pub fn register<H>(&mut self, handler: H) -> HandlerId
    where
        H: KeyEventHandler + 'static,
    {
        self.register_boxed(Box::new(KeyHandlerAdapter::new(handler)))
    }

    /// Register an already type-erased handler
    pub fn register_boxed(&mut self, handler: Box<dyn KeyHandler>) -> HandlerId {
        let id = self.handlers.insert(handler);
        self.order.push(id);
        log::debug!("Registered key handler {id:?} ({} total)", self.order.len());
        id
    }

    /// Remove a handler, returning it type-erased
    pub fn unregister(&mut self, id: HandlerId) -> Option<Box<dyn KeyHandler>> {
        let handler = self.handlers.remove(id)?;
        self.order.retain(|registered| *registered != id);
        log::debug!("Unregistered key handler {id:?}");
        Some(handler)
    }

    /// Remove a handler and recover its concrete type
    ///
    /// On a type mismatch the handler stays registered.
    pub fn take<H: 'static>(&mut self, id: HandlerId) -> Result<H, DispatchError> {
        let handler = self
            .handlers
            .get(id)
            .ok_or(DispatchError::StaleHandler(id))?;
        if !handler.as_any().is::<H>() {
            return Err(Self::mismatch::<H>(id));
        }

        self.unregister(id)
            .ok_or(DispatchError::StaleHandler(id))?
            .into_any()
            .downcast::<H>()
            .map(|handler| *handler)
            .map_err(|_| Self::mismatch::<H>(id))
    }

    /// Whether `id` still refers to a registered handler
    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.contains_key(id)
    }

    /// Borrow a handler as its concrete type
    pub fn handler<H: 'static>(&self, id: HandlerId) -> Result<&H, DispatchError> {
        self.handlers
            .get(id)
            .ok_or(DispatchError::StaleHandler(id))?
            .as_any()
            .downcast_ref::<H>()
            .ok_or_else(|| Self::mismatch::<H>(id))
    }

    /// Mutably borrow a handler as its concrete type
    pub fn handler_mut<H: 'static>(&mut self, id: HandlerId) -> Result<&mut H, DispatchError> {
        self.handlers
            .get_mut(id)
            .ok_or(DispatchError::StaleHandler(id))?
            .as_any_mut()
            .downcast_mut::<H>()
            .ok_or_else(|| Self::mismatch::<H>(id))
    }

    /// Deliver one event to a single handler
    pub fn dispatch_to(&mut self, id: HandlerId, event: &KeyEvent) -> Result<(), DispatchError> {
        let handler = self
            .handlers
            .get_mut(id)
            .ok_or(DispatchError::StaleHandler(id))?;
        handler.handle_event(event);
        Ok(())
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.order.clear();
    }

    fn mismatch<H>(id: HandlerId) -> DispatchError {
        DispatchError::TypeMismatch {
            id,
            expected: std::any::type_name::<H>(),
        }
    }
}

/// Broadcasts each event to every registered handler in registration order
impl KeyEventHandler for EventManager {
    fn handle_key_event(&mut self, event: &KeyEvent) {
        for id in &self.order {
            if let Some(handler) = self.handlers.get_mut(*id) {
                handler.handle_event(event);
            }
        }
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("handlers", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{dispatch_all, from_fn, KeyAction};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        events: Vec<KeyEvent>,
    }

    impl KeyEventHandler for Recorder {
        fn handle_key_event(&mut self, event: &KeyEvent) {
            self.events.push(*event);
        }
    }

    struct Tagged {
        tag: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl KeyEventHandler for Tagged {
        fn handle_key_event(&mut self, _event: &KeyEvent) {
            self.log.borrow_mut().push(self.tag);
        }
    }

    fn press(code: u16) -> KeyEvent {
        KeyEvent::with_value(KeyAction::Press, code)
    }

    #[test]
    fn test_broadcast_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = EventManager::new();
        for tag in ["first", "second", "third"] {
            manager.register(Tagged {
                tag,
                log: Rc::clone(&log),
            });
        }

        manager.handle_key_event(&press(0x26));
        assert_eq!(*log.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn test_typed_access() {
        let mut manager = EventManager::new();
        let id = manager.register(Recorder::default());
        dispatch_all(&mut manager, [press(0x26), press(0x27)]);

        let recorder = manager.handler::<Recorder>(id).map(|r| r.events.len());
        assert_eq!(recorder, Ok(2));

        manager.handler_mut::<Recorder>(id).map(|r| r.events.clear()).ok();
        assert_eq!(manager.handler::<Recorder>(id).map(|r| r.events.len()), Ok(0));
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let mut manager = EventManager::new();
        let id = manager.register(Recorder::default());

        assert!(matches!(
            manager.handler::<Vec<KeyEvent>>(id),
            Err(DispatchError::TypeMismatch { .. })
        ));
        assert!(matches!(
            manager.take::<Vec<KeyEvent>>(id),
            Err(DispatchError::TypeMismatch { .. })
        ));
        assert!(manager.contains(id));
    }

    #[test]
    fn test_stale_handle_is_detected() {
        let mut manager = EventManager::new();
        let id = manager.register(Recorder::default());
        let copy = id;

        assert!(manager.unregister(id).is_some());
        assert!(!manager.contains(copy));
        assert_eq!(
            manager.dispatch_to(copy, &press(0x09)),
            Err(DispatchError::StaleHandler(copy))
        );
        assert!(matches!(
            manager.handler::<Recorder>(copy),
            Err(DispatchError::StaleHandler(_))
        ));
        assert!(manager.unregister(copy).is_none());
    }

    #[test]
    fn test_reused_slot_does_not_revive_old_id() {
        let mut manager = EventManager::new();
        let old = manager.register(Recorder::default());
        manager.unregister(old);
        let new = manager.register(Recorder::default());

        assert_ne!(old, new);
        assert!(!manager.contains(old));
        assert!(manager.contains(new));
    }

    #[test]
    fn test_take_returns_concrete_handler() {
        let mut manager = EventManager::new();
        let id = manager.register(Recorder::default());
        manager.dispatch_to(id, &press(0x41)).ok();

        let recorder = manager.take::<Recorder>(id).map(|r| r.events);
        assert_eq!(recorder, Ok(vec![press(0x41)]));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_unregistered_handler_no_longer_notified() {
        let count = Rc::new(RefCell::new(0));
        let mut manager = EventManager::new();
        let counter = Rc::clone(&count);
        let id = manager.register(from_fn(move |_: &KeyEvent| *counter.borrow_mut() += 1));

        manager.handle_key_event(&press(0x19));
        manager.unregister(id);
        manager.handle_key_event(&press(0x19));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(manager.len(), 0);
    }
}
