// src/effects/mod.rs

//! Fire-and-forget side effects: desktop notifications and sound playback.
//!
//! The core never talks to an OS notification or audio subsystem directly;
//! it goes through the [`Notifier`] capability so tests can inject fakes and
//! failures stay contained (logged, never escalated).

pub mod desktop;

pub use desktop::DesktopNotifier;

/// One desktop notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub icon: Option<String>,
    /// Attention-seeking delivery (used for error notifications).
    pub attention: bool,
}

/// Injected side-effect capability.
///
/// Both methods are fire-and-forget: implementations must not block the
/// caller and must swallow (but may log) their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, note: Notification);

    fn play_sound(&self, source: &str);
}

/// A notifier that only logs. A harmless stand-in where delivering real
/// desktop notifications is unwanted.
#[derive(Debug, Clone, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, note: Notification) {
        tracing::debug!(title = %note.title, message = %note.message, "notification suppressed");
    }

    fn play_sound(&self, source: &str) {
        tracing::debug!(sound = %source, "sound suppressed");
    }
}
