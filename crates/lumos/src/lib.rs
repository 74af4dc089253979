//! # Lumos
//!
//! Minimal window and rendering-context creation with a compact key-event
//! representation for real-time graphics.
//!
//! ## Features
//!
//! - **Packed key events**: action and key code in a single `u16`
//! - **Static backend selection**: one window backend per build, no virtual dispatch
//! - **Scoped native resources**: every failed creation step unwinds cleanly
//! - **Non-blocking event pump**: drains the native queue once per tick
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumos::prelude::*;
//!
//! fn main() -> Result<(), WindowError> {
//!     let mut window = PlatformWindow::create(
//!         DefaultPlatform::default(),
//!         Extent2d::new(1280, 720),
//!         b"Lumos",
//!     )?;
//!
//!     let mut events = EventManager::new();
//!     events.register(from_fn(|event: &KeyEvent| log::info!("{event}")));
//!
//!     loop {
//!         window.poll_events(&mut events)?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod geometry;
pub mod window;

/// Common imports for users of the crate
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, LumosConfig, WindowConfig},
        events::{
            dispatch_all, from_fn, DispatchError, EventManager, HandlerId, Key, KeyAction,
            KeyEvent, KeyEventHandler, KeyHandler,
        },
        geometry::{Extent, Extent2d, Extent3d},
        window::{
            BackendState, DefaultPlatform, NativeWindow, Platform, PlatformWindow, Window,
            WindowError,
        },
    };
}
