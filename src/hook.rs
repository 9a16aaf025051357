//! Process-wide keyboard hook feeding the shared [`KeyHub`].
//!
//! The platform hook can only be installed once per process and cannot be
//! torn down, so it lives on its own detached thread for the whole run and
//! listeners come and go by subscribing to the hub.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::hotkey::KeyHub;

static HUB: Lazy<Arc<KeyHub>> = Lazy::new(|| {
    let hub = Arc::new(KeyHub::new());
    install(&hub);
    hub
});

/// The hub fed by the global keyboard hook. Installs the hook on first use.
pub fn global_hub() -> Arc<KeyHub> {
    Arc::clone(&HUB)
}

#[cfg(feature = "hooks")]
fn install(hub: &Arc<KeyHub>) {
    use std::thread;
    use tracing::error;

    let hub = Arc::clone(hub);
    let spawned = thread::Builder::new()
        .name("key-hook".into())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                if let rdev::EventType::KeyPress(key) = event.event_type {
                    if let Some(key) = key_from_rdev(key, event.name.as_deref()) {
                        hub.publish(key);
                    }
                }
            });
            if let Err(err) = result {
                error!(?err, "global key hook stopped");
            }
        });
    if let Err(err) = spawned {
        error!(%err, "failed to spawn global key hook");
    }
}

#[cfg(not(feature = "hooks"))]
fn install(_hub: &Arc<KeyHub>) {
    tracing::info!("built without the `hooks` feature, toggle key only works from the panel");
}

/// Map a raw key press to a [`ToggleKey`].
///
/// Non-character keys (function keys, navigation, Space, Enter...) come from
/// the key code. For everything else the character the press produced wins,
/// so shifted symbols and non-US layouts match what the user typed. The
/// physical key only decides when the platform reported no character.
#[cfg(feature = "hooks")]
fn key_from_rdev(key: rdev::Key, name: Option<&str>) -> Option<crate::key::ToggleKey> {
    named_key(key)
        .or_else(|| name.and_then(typed_char))
        .or_else(|| char_key(key))
}

#[cfg(feature = "hooks")]
fn typed_char(name: &str) -> Option<crate::key::ToggleKey> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => crate::key::ToggleKey::from_char(c),
        _ => None,
    }
}

#[cfg(feature = "hooks")]
fn named_key(key: rdev::Key) -> Option<crate::key::ToggleKey> {
    use crate::key::ToggleKey as K;
    use rdev::Key;

    let mapped = match key {
        Key::F1 => K::Function(1),
        Key::F2 => K::Function(2),
        Key::F3 => K::Function(3),
        Key::F4 => K::Function(4),
        Key::F5 => K::Function(5),
        Key::F6 => K::Function(6),
        Key::F7 => K::Function(7),
        Key::F8 => K::Function(8),
        Key::F9 => K::Function(9),
        Key::F10 => K::Function(10),
        Key::F11 => K::Function(11),
        Key::F12 => K::Function(12),
        Key::Space => K::Space,
        Key::Tab => K::Tab,
        Key::Escape => K::Escape,
        Key::Return | Key::KpReturn => K::Enter,
        Key::Backspace => K::Backspace,
        Key::Insert => K::Insert,
        Key::Delete => K::Delete,
        Key::Home => K::Home,
        Key::End => K::End,
        Key::PageUp => K::PageUp,
        Key::PageDown => K::PageDown,
        Key::UpArrow => K::Up,
        Key::DownArrow => K::Down,
        Key::LeftArrow => K::Left,
        Key::RightArrow => K::Right,
        Key::CapsLock => K::CapsLock,
        Key::Pause => K::Pause,
        Key::PrintScreen => K::PrintScreen,
        Key::ScrollLock => K::ScrollLock,
        _ => return None,
    };
    Some(mapped)
}

/// Unshifted US-layout character printed on `key`.
#[cfg(feature = "hooks")]
fn char_key(key: rdev::Key) -> Option<crate::key::ToggleKey> {
    use crate::key::ToggleKey as K;
    use rdev::Key;

    let mapped = match key {
        Key::KeyA => K::Char('a'),
        Key::KeyB => K::Char('b'),
        Key::KeyC => K::Char('c'),
        Key::KeyD => K::Char('d'),
        Key::KeyE => K::Char('e'),
        Key::KeyF => K::Char('f'),
        Key::KeyG => K::Char('g'),
        Key::KeyH => K::Char('h'),
        Key::KeyI => K::Char('i'),
        Key::KeyJ => K::Char('j'),
        Key::KeyK => K::Char('k'),
        Key::KeyL => K::Char('l'),
        Key::KeyM => K::Char('m'),
        Key::KeyN => K::Char('n'),
        Key::KeyO => K::Char('o'),
        Key::KeyP => K::Char('p'),
        Key::KeyQ => K::Char('q'),
        Key::KeyR => K::Char('r'),
        Key::KeyS => K::Char('s'),
        Key::KeyT => K::Char('t'),
        Key::KeyU => K::Char('u'),
        Key::KeyV => K::Char('v'),
        Key::KeyW => K::Char('w'),
        Key::KeyX => K::Char('x'),
        Key::KeyY => K::Char('y'),
        Key::KeyZ => K::Char('z'),
        Key::Num0 => K::Char('0'),
        Key::Num1 => K::Char('1'),
        Key::Num2 => K::Char('2'),
        Key::Num3 => K::Char('3'),
        Key::Num4 => K::Char('4'),
        Key::Num5 => K::Char('5'),
        Key::Num6 => K::Char('6'),
        Key::Num7 => K::Char('7'),
        Key::Num8 => K::Char('8'),
        Key::Num9 => K::Char('9'),
        Key::Minus => K::Char('-'),
        Key::Equal => K::Char('='),
        Key::LeftBracket => K::Char('['),
        Key::RightBracket => K::Char(']'),
        Key::SemiColon => K::Char(';'),
        Key::Quote => K::Char('\''),
        Key::BackSlash => K::Char('\\'),
        Key::Comma => K::Char(','),
        Key::Dot => K::Char('.'),
        Key::Slash => K::Char('/'),
        Key::BackQuote => K::Char('`'),
        _ => return None,
    };
    Some(mapped)
}
