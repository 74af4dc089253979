//! Native platform boundary
//!
//! [`Platform`] is the narrow set of primitives a window backend needs from a
//! display server and its GL binding. The calls mirror the two native
//! subsystems involved: display-level calls (rendering context, context-bound
//! window) take the display, connection-level calls (colormap, window, event
//! queue) take the connection.
//!
//! Handles are plain ids. Their lifetime is managed by
//! [`NativeWindow`](super::NativeWindow), never by the platform.
//!
//! # Threading
//!
//! Platforms are used from a single thread by a single owner. Implementations
//! need no internal locking.

use bitflags::bitflags;
use thiserror::Error;

/// Error reported by the native layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlatformError {
    message: String,
}

impl PlatformError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of a native call
pub type PlatformResult<T> = Result<T, PlatformError>;

macro_rules! native_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// The raw native id
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

native_id!(
    /// Native window id
    WindowId
);
native_id!(
    /// Visual id
    VisualId
);
native_id!(
    /// Colormap id
    ColormapId
);
native_id!(
    /// Framebuffer configuration id
    FbConfigId
);
native_id!(
    /// Rendering context id
    ContextId
);
native_id!(
    /// Context-bound window id, the drawable the context renders into
    SurfaceId
);

/// Description of one screen of the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    /// Root window of the screen
    pub root: WindowId,
    /// Default visual of the root window
    pub root_visual: VisualId,
    /// Screen width in pixels
    pub width_px: u16,
    /// Screen height in pixels
    pub height_px: u16,
}

/// One framebuffer configuration offered by the GL binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferConfig {
    /// Configuration id
    pub id: FbConfigId,
    /// Associated visual, `None` if the configuration has no visual
    pub visual: Option<VisualId>,
    /// Supports window drawables
    pub window_capable: bool,
    /// Supports RGBA rendering
    pub rgba: bool,
}

impl FramebufferConfig {
    /// Whether a window with a rendering context can be built on this configuration
    pub const fn is_compatible(&self) -> bool {
        self.visual.is_some() && self.window_capable && self.rgba
    }
}

bitflags! {
    /// Categories of native events a window asks to receive
    ///
    /// Bit values follow the X11 core protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// Key press notifications
        const KEY_PRESS = 1 << 0;
        /// Key release notifications
        const KEY_RELEASE = 1 << 1;
        /// Pointer button presses
        const BUTTON_PRESS = 1 << 2;
        /// Pointer button releases
        const BUTTON_RELEASE = 1 << 3;
        /// Exposure (redraw) notifications
        const EXPOSURE = 1 << 15;
        /// Size, position and mapping changes
        const STRUCTURE_NOTIFY = 1 << 17;
    }
}

impl EventMask {
    /// The minimum set every window created by this crate requests
    pub const WINDOW_DEFAULT: Self = Self::EXPOSURE
        .union(Self::KEY_PRESS)
        .union(Self::KEY_RELEASE);
}

/// Parameters for native window creation
#[derive(Debug, Clone, Copy)]
pub struct WindowParams<'a> {
    /// Parent window, the screen root
    pub parent: WindowId,
    /// Visual of the chosen framebuffer configuration
    pub visual: VisualId,
    /// Colormap created for `visual`
    pub colormap: ColormapId,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Requested event categories
    pub event_mask: EventMask,
    /// Window title, opaque bytes
    pub title: &'a [u8],
}

/// Native event category codes (X11 core protocol)
pub mod category {
    /// Key pressed
    pub const KEY_PRESS: u8 = 2;
    /// Key released
    pub const KEY_RELEASE: u8 = 3;
    /// Pointer button pressed
    pub const BUTTON_PRESS: u8 = 4;
    /// Region needs redrawing
    pub const EXPOSE: u8 = 12;
    /// Window configuration changed
    pub const CONFIGURE_NOTIFY: u8 = 22;
    /// Low bits of the event type that carry the category; the high bit marks
    /// events sent by another client
    pub const MASK: u8 = 0x7f;
}

/// An event as read from the native queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEvent {
    /// Raw event type field, including the sent-event bit
    pub response_type: u8,
    /// Event detail; the key code for key events
    pub detail: u8,
}

impl NativeEvent {
    /// Create a native event
    pub const fn new(response_type: u8, detail: u8) -> Self {
        Self {
            response_type,
            detail,
        }
    }

    /// The event category with the sent-event bit removed
    pub const fn category(self) -> u8 {
        self.response_type & category::MASK
    }
}

/// Primitives a window backend consumes from the native display server
pub trait Platform {
    /// Open display handle
    type Display;
    /// Connection handle obtained from the display
    type Connection;

    /// Open a connection to the display server
    fn open_display(&mut self) -> PlatformResult<Self::Display>;

    /// Index of the display's default screen
    fn default_screen(&self, display: &Self::Display) -> usize;

    /// Obtain the lower-level connection handle from an open display
    fn connection(&mut self, display: &Self::Display) -> PlatformResult<Self::Connection>;

    /// Release a connection handle. Called before the display is closed.
    fn release_connection(&mut self, connection: Self::Connection);

    /// Close the display
    fn close_display(&mut self, display: Self::Display);

    /// Screens of the display, in server order
    fn screens(&self, connection: &Self::Connection) -> Vec<ScreenInfo>;

    /// Framebuffer configurations available on `screen`
    fn framebuffer_configs(
        &mut self,
        display: &Self::Display,
        screen: usize,
    ) -> PlatformResult<Vec<FramebufferConfig>>;

    /// Create a rendering context for `config`
    fn create_context(
        &mut self,
        display: &Self::Display,
        screen: usize,
        config: &FramebufferConfig,
    ) -> PlatformResult<ContextId>;

    /// Destroy a rendering context
    fn destroy_context(&mut self, display: &Self::Display, context: ContextId);

    /// Create a colormap for `visual` on the screen of `root`
    fn create_colormap(
        &mut self,
        connection: &Self::Connection,
        root: WindowId,
        visual: VisualId,
    ) -> PlatformResult<ColormapId>;

    /// Free a colormap
    fn free_colormap(&mut self, connection: &Self::Connection, colormap: ColormapId);

    /// Create a native window
    fn create_window(
        &mut self,
        connection: &Self::Connection,
        params: &WindowParams<'_>,
    ) -> PlatformResult<WindowId>;

    /// Map a window for display
    fn map_window(&mut self, connection: &Self::Connection, window: WindowId) -> PlatformResult<()>;

    /// Destroy a native window
    fn destroy_window(&mut self, connection: &Self::Connection, window: WindowId);

    /// Create the context-bound window for `window`
    fn create_surface(
        &mut self,
        display: &Self::Display,
        screen: usize,
        config: &FramebufferConfig,
        window: WindowId,
    ) -> PlatformResult<SurfaceId>;

    /// Destroy a context-bound window
    fn destroy_surface(&mut self, display: &Self::Display, surface: SurfaceId);

    /// Bind `context` to `drawable` and make it current
    fn make_current(
        &mut self,
        display: &Self::Display,
        drawable: SurfaceId,
        context: ContextId,
    ) -> PlatformResult<()>;

    /// Flush pending requests to the server
    fn flush(&mut self, connection: &Self::Connection) -> PlatformResult<()>;

    /// Next pending event, `None` if the queue is empty. Never blocks.
    fn poll_event(&mut self, connection: &Self::Connection) -> PlatformResult<Option<NativeEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_strips_sent_event_bit() {
        assert_eq!(NativeEvent::new(category::KEY_PRESS, 0x26).category(), category::KEY_PRESS);
        assert_eq!(NativeEvent::new(0x80 | category::KEY_RELEASE, 0).category(), category::KEY_RELEASE);
    }

    #[test]
    fn test_default_event_mask() {
        let mask = EventMask::WINDOW_DEFAULT;
        assert!(mask.contains(EventMask::EXPOSURE));
        assert!(mask.contains(EventMask::KEY_PRESS | EventMask::KEY_RELEASE));
        assert!(!mask.contains(EventMask::BUTTON_PRESS));
        assert_eq!(mask.bits(), 0x8003);
    }

    #[test]
    fn test_framebuffer_compatibility() {
        let config = FramebufferConfig {
            id: FbConfigId(1),
            visual: Some(VisualId(0x21)),
            window_capable: true,
            rgba: true,
        };
        assert!(config.is_compatible());
        assert!(!FramebufferConfig { visual: None, ..config }.is_compatible());
        assert!(!FramebufferConfig { window_capable: false, ..config }.is_compatible());
        assert!(!FramebufferConfig { rgba: false, ..config }.is_compatible());
    }
}
