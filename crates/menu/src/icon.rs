//! Embedded default tray icon.

/// Default icon bytes (PNG), used when a menu is constructed with
/// empty icon data.
pub const DEFAULT_ICON: &[u8] = include_bytes!("assets/icon.png");
