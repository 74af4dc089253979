//! X11 platform
//!
//! Core protocol for the screen list, colormap, window and event queue; the GLX
//! extension for framebuffer configurations, the rendering context and the
//! context-bound window. All requests go over the wire through `x11rb`, and
//! every failable request is checked so errors surface at the step that
//! caused them.
//!
//! The rendering context is created over the wire, which makes it an indirect
//! GLX context. Xorg disables indirect GLX unless the server runs with
//! `+iglx` (the default since 1.17), so on a stock server context creation
//! fails with [`WindowError::ContextCreation`](super::WindowError::ContextCreation).
//! Such a context also cannot serve GL calls made from this process.

use std::rc::Rc;

use x11rb::connection::{Connection as _, RequestConnection as _};
use x11rb::protocol::glx::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, AtomEnum, ColormapAlloc, ConnectionExt as _, CreateWindowAux, PropMode, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::platform::{
    ColormapId, ContextId, FbConfigId, FramebufferConfig, NativeEvent, Platform, PlatformError,
    PlatformResult, ScreenInfo, SurfaceId, VisualId, WindowId, WindowParams,
};

const GLX_VISUAL_ID: u32 = 0x800B;
const GLX_DRAWABLE_TYPE: u32 = 0x8010;
const GLX_RENDER_TYPE: u32 = 0x8011;
const GLX_FBCONFIG_ID: u32 = 0x8013;
const GLX_WINDOW_BIT: u32 = 0x0001;
const GLX_RGBA_BIT: u32 = 0x0001;
const GLX_RGBA_TYPE: u32 = 0x8014;

/// Framebuffer configurations need GLX 1.3
const GLX_MIN_VERSION: (u32, u32) = (1, 3);

fn native_error(err: impl std::fmt::Display) -> PlatformError {
    PlatformError::new(err.to_string())
}

fn screen_number(screen: usize) -> PlatformResult<u32> {
    u32::try_from(screen).map_err(|_| PlatformError::new(format!("screen {screen} out of range")))
}

/// Decode a `GetFBConfigs` property list
///
/// The list holds `num_properties` (attribute, value) pairs per configuration.
fn parse_configs(properties: &[u32], num_properties: u32) -> Vec<FramebufferConfig> {
    let stride = usize::try_from(num_properties).unwrap_or(0) * 2;
    if stride == 0 {
        return Vec::new();
    }

    properties
        .chunks_exact(stride)
        .filter_map(|config| {
            let mut id = None;
            let mut visual = None;
            let mut window_capable = false;
            let mut rgba = false;
            for pair in config.chunks_exact(2) {
                match (pair[0], pair[1]) {
                    (GLX_FBCONFIG_ID, value) => id = Some(FbConfigId(value)),
                    (GLX_VISUAL_ID, 0) => visual = None,
                    (GLX_VISUAL_ID, value) => visual = Some(VisualId(value)),
                    (GLX_DRAWABLE_TYPE, value) => window_capable = value & GLX_WINDOW_BIT != 0,
                    (GLX_RENDER_TYPE, value) => rgba = value & GLX_RGBA_BIT != 0,
                    _ => {}
                }
            }
            Some(FramebufferConfig {
                id: id?,
                visual,
                window_capable,
                rgba,
            })
        })
        .collect()
}

/// X11 server reached through `x11rb`
#[derive(Debug, Clone, Default)]
pub struct X11Platform {
    display_name: Option<String>,
}

impl X11Platform {
    /// Connect to `display_name`, or to `$DISPLAY` when `None`
    pub const fn new(display_name: Option<String>) -> Self {
        Self { display_name }
    }
}

/// Open X11 display
pub struct X11Display {
    connection: Rc<RustConnection>,
    default_screen: usize,
}

/// Connection handle shared with the display
pub struct X11Connection {
    connection: Rc<RustConnection>,
}

impl Platform for X11Platform {
    type Display = X11Display;
    type Connection = X11Connection;

    fn open_display(&mut self) -> PlatformResult<X11Display> {
        let (connection, default_screen) =
            x11rb::connect(self.display_name.as_deref()).map_err(native_error)?;
        Ok(X11Display {
            connection: Rc::new(connection),
            default_screen,
        })
    }

    fn default_screen(&self, display: &X11Display) -> usize {
        display.default_screen
    }

    fn connection(&mut self, display: &X11Display) -> PlatformResult<X11Connection> {
        let connection = &display.connection;
        if connection
            .extension_information(glx::X11_EXTENSION_NAME)
            .map_err(native_error)?
            .is_none()
        {
            return Err(PlatformError::new("GLX extension not available"));
        }

        let version = connection
            .glx_query_version(GLX_MIN_VERSION.0, GLX_MIN_VERSION.1)
            .map_err(native_error)?
            .reply()
            .map_err(native_error)?;
        if (version.major_version, version.minor_version) < GLX_MIN_VERSION {
            return Err(PlatformError::new(format!(
                "GLX {}.{} is too old",
                version.major_version, version.minor_version
            )));
        }

        Ok(X11Connection {
            connection: Rc::clone(connection),
        })
    }

    fn release_connection(&mut self, connection: X11Connection) {
        drop(connection);
    }

    fn close_display(&mut self, display: X11Display) {
        if let Err(err) = display.connection.flush() {
            log::warn!("Flush before closing display failed: {err}");
        }
        drop(display);
    }

    fn screens(&self, connection: &X11Connection) -> Vec<ScreenInfo> {
        connection
            .connection
            .setup()
            .roots
            .iter()
            .map(|screen| ScreenInfo {
                root: WindowId(screen.root),
                root_visual: VisualId(screen.root_visual),
                width_px: screen.width_in_pixels,
                height_px: screen.height_in_pixels,
            })
            .collect()
    }

    fn framebuffer_configs(
        &mut self,
        display: &X11Display,
        screen: usize,
    ) -> PlatformResult<Vec<FramebufferConfig>> {
        let reply = display
            .connection
            .glx_get_fb_configs(screen_number(screen)?)
            .map_err(native_error)?
            .reply()
            .map_err(native_error)?;
        Ok(parse_configs(&reply.property_list, reply.num_properties))
    }

    fn create_context(
        &mut self,
        display: &X11Display,
        screen: usize,
        config: &FramebufferConfig,
    ) -> PlatformResult<ContextId> {
        let connection = &display.connection;
        let context = connection.generate_id().map_err(native_error)?;
        connection
            .glx_create_new_context(
                context,
                config.id.raw(),
                screen_number(screen)?,
                GLX_RGBA_TYPE,
                0,
                false,
            )
            .map_err(native_error)?
            .check()
            .map_err(native_error)?;
        Ok(ContextId(context))
    }

    fn destroy_context(&mut self, display: &X11Display, context: ContextId) {
        if let Err(err) = display.connection.glx_destroy_context(context.raw()) {
            log::warn!("Failed to destroy GLX context {context:?}: {err}");
        }
    }

    fn create_colormap(
        &mut self,
        connection: &X11Connection,
        root: WindowId,
        visual: VisualId,
    ) -> PlatformResult<ColormapId> {
        let connection = &connection.connection;
        let colormap = connection.generate_id().map_err(native_error)?;
        connection
            .create_colormap(ColormapAlloc::NONE, colormap, root.raw(), visual.raw())
            .map_err(native_error)?
            .check()
            .map_err(native_error)?;
        Ok(ColormapId(colormap))
    }

    fn free_colormap(&mut self, connection: &X11Connection, colormap: ColormapId) {
        if let Err(err) = connection.connection.free_colormap(colormap.raw()) {
            log::warn!("Failed to free colormap {colormap:?}: {err}");
        }
    }

    fn create_window(
        &mut self,
        connection: &X11Connection,
        params: &WindowParams<'_>,
    ) -> PlatformResult<WindowId> {
        let connection = &connection.connection;
        let window = connection.generate_id().map_err(native_error)?;
        let aux = CreateWindowAux::new()
            .event_mask(xproto::EventMask::from(params.event_mask.bits()))
            .colormap(params.colormap.raw())
            .border_pixel(0);
        connection
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                params.parent.raw(),
                0,
                0,
                params.width,
                params.height,
                0,
                WindowClass::INPUT_OUTPUT,
                params.visual.raw(),
                &aux,
            )
            .map_err(native_error)?
            .check()
            .map_err(native_error)?;

        if let Err(err) = connection.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            params.title,
        ) {
            log::warn!("Failed to set window title: {err}");
        }
        Ok(WindowId(window))
    }

    fn map_window(&mut self, connection: &X11Connection, window: WindowId) -> PlatformResult<()> {
        connection
            .connection
            .map_window(window.raw())
            .map_err(native_error)?
            .check()
            .map_err(native_error)
    }

    fn destroy_window(&mut self, connection: &X11Connection, window: WindowId) {
        if let Err(err) = connection.connection.destroy_window(window.raw()) {
            log::warn!("Failed to destroy window {window:?}: {err}");
        }
    }

    fn create_surface(
        &mut self,
        display: &X11Display,
        screen: usize,
        config: &FramebufferConfig,
        window: WindowId,
    ) -> PlatformResult<SurfaceId> {
        let connection = &display.connection;
        let surface = connection.generate_id().map_err(native_error)?;
        connection
            .glx_create_window(
                screen_number(screen)?,
                config.id.raw(),
                window.raw(),
                surface,
                &[],
            )
            .map_err(native_error)?
            .check()
            .map_err(native_error)?;
        Ok(SurfaceId(surface))
    }

    fn destroy_surface(&mut self, display: &X11Display, surface: SurfaceId) {
        if let Err(err) = display.connection.glx_delete_window(surface.raw()) {
            log::warn!("Failed to destroy GLX window {surface:?}: {err}");
        }
    }

    fn make_current(
        &mut self,
        display: &X11Display,
        drawable: SurfaceId,
        context: ContextId,
    ) -> PlatformResult<()> {
        display
            .connection
            .glx_make_context_current(0, drawable.raw(), drawable.raw(), context.raw())
            .map_err(native_error)?
            .reply()
            .map_err(native_error)?;
        Ok(())
    }

    fn flush(&mut self, connection: &X11Connection) -> PlatformResult<()> {
        connection.connection.flush().map_err(native_error)
    }

    fn poll_event(&mut self, connection: &X11Connection) -> PlatformResult<Option<NativeEvent>> {
        let raw = connection
            .connection
            .poll_for_raw_event()
            .map_err(native_error)?;
        Ok(raw.map(|bytes| {
            let bytes: &[u8] = bytes.as_ref();
            NativeEvent::new(
                bytes.first().copied().unwrap_or(0),
                bytes.get(1).copied().unwrap_or(0),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Extent2d;
    use crate::window::{NativeWindow, Window, WindowResult};

    #[test]
    fn test_parse_configs() {
        let properties = [
            GLX_FBCONFIG_ID, 0x70, GLX_VISUAL_ID, 0, GLX_DRAWABLE_TYPE, 0x4, GLX_RENDER_TYPE, 1,
            GLX_FBCONFIG_ID, 0x71, GLX_VISUAL_ID, 0x21, GLX_DRAWABLE_TYPE, 0x7, GLX_RENDER_TYPE, 1,
        ];
        let configs = parse_configs(&properties, 4);

        assert_eq!(configs.len(), 2);
        assert!(!configs[0].is_compatible());
        assert!(configs[1].is_compatible());
        assert_eq!(configs[1].id, FbConfigId(0x71));
        assert_eq!(configs[1].visual, Some(VisualId(0x21)));
    }

    #[test]
    fn test_x11_backend_builds_a_window_type() {
        fn create_fn<W: Window>() -> fn(W::Platform, Extent2d, &[u8]) -> WindowResult<W> {
            W::create
        }
        let _create = create_fn::<NativeWindow<X11Platform>>();
        assert_eq!(X11Platform::default().display_name, None);
        assert_eq!(X11Platform::new(Some(":1".into())).display_name.as_deref(), Some(":1"));
    }

    #[test]
    fn test_parse_configs_without_properties() {
        assert!(parse_configs(&[1, 2, 3], 0).is_empty());
    }

    #[test]
    fn test_config_without_id_is_skipped() {
        let properties = [GLX_VISUAL_ID, 0x21, GLX_RENDER_TYPE, 1];
        assert!(parse_configs(&properties, 2).is_empty());
    }
}
