//! Event pump
//!
//! Each tick flushes the connection, then drains the native queue without
//! blocking. Key press/release events become [`KeyEvent`]s and are forwarded in
//! queue order; every other category is skipped.

use crate::events::{KeyAction, KeyEvent, KeyEventHandler};

use super::platform::{category, NativeEvent, Platform, PlatformResult};

/// Turn a native event into a key event, `None` for non-key categories
pub fn classify(event: NativeEvent) -> Option<KeyEvent> {
    let action = match event.category() {
        category::KEY_PRESS => KeyAction::Press,
        category::KEY_RELEASE => KeyAction::Release,
        _ => return None,
    };

    let mut key_event = KeyEvent::new(action);
    key_event.set_value(u16::from(event.detail));
    Some(key_event)
}

/// Drain all pending events, forwarding key events to `handler`
///
/// Returns the number of key events forwarded.
pub fn drain<P, H>(
    platform: &mut P,
    connection: &P::Connection,
    handler: &mut H,
) -> PlatformResult<usize>
where
    P: Platform,
    H: KeyEventHandler + ?Sized,
{
    platform.flush(connection)?;

    let mut forwarded = 0;
    while let Some(event) = platform.poll_event(connection)? {
        match classify(event) {
            Some(key_event) => {
                log::trace!("Key event: {key_event}");
                handler.handle_key_event(&key_event);
                forwarded += 1;
            }
            None => log::trace!("Ignoring native event category {}", event.category()),
        }
    }
    Ok(forwarded)
}
