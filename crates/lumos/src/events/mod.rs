//! Key events and their dispatch
//!
//! - [`KeyEvent`]: action and key value packed into a `u16`
//! - [`Key`]: the platform key-code table
//! - [`KeyEventHandler`] / [`KeyHandler`]: static and runtime handler contracts
//! - [`EventManager`]: owning registry that broadcasts to registered handlers

pub mod handler;
pub mod key_event;
pub mod keycodes;
pub mod manager;

pub use handler::{dispatch_all, from_fn, FnHandler, KeyEventHandler, KeyHandler, KeyHandlerAdapter};
pub use key_event::{KeyAction, KeyEvent};
pub use keycodes::Key;
pub use manager::{DispatchError, EventManager, HandlerId};
