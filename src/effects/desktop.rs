// src/effects/desktop.rs

//! Production [`Notifier`] that shells out to the platform's notification
//! and audio tools via `tokio::process`.
//!
//! - Linux: `notify-send` / `paplay`
//! - macOS: `osascript` / `afplay`
//!
//! Every spawn is detached into its own task; a missing tool or non-zero
//! exit is logged at warn and otherwise ignored.

use tokio::process::Command;
use tracing::warn;

use super::{Notification, Notifier};

#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, note: Notification) {
        let mut cmd = if cfg!(target_os = "macos") {
            let mut c = Command::new("osascript");
            c.arg("-e").arg(format!(
                "display notification {} with title {}",
                applescript_quote(&note.message),
                applescript_quote(&note.title),
            ));
            c
        } else {
            let mut c = Command::new("notify-send");
            if note.attention {
                c.arg("--urgency=critical");
            }
            if let Some(icon) = &note.icon {
                c.arg("--icon").arg(icon);
            }
            c.arg(&note.title).arg(&note.message);
            c
        };

        tokio::spawn(async move {
            match cmd.output().await {
                Ok(out) if !out.status.success() => {
                    warn!(status = ?out.status, "notification tool exited non-zero");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "failed to deliver notification"),
            }
        });
    }

    fn play_sound(&self, source: &str) {
        let player = if cfg!(target_os = "macos") {
            "afplay"
        } else {
            "paplay"
        };

        let mut cmd = Command::new(player);
        cmd.arg(source);

        let source = source.to_string();
        tokio::spawn(async move {
            match cmd.output().await {
                Ok(out) if !out.status.success() => {
                    warn!(sound = %source, status = ?out.status, "sound player exited non-zero");
                }
                Ok(_) => {}
                Err(err) => warn!(sound = %source, error = %err, "failed to play sound"),
            }
        });
    }
}

/// AppleScript string literal: double quotes, backslash-escaped.
fn applescript_quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
