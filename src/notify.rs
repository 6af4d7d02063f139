//! Notification sink.
//!
//! The engine never renders UI; outcomes worth telling the user about go
//! through a [`Notifier`]. A front end maps these onto toasts.

use std::fmt;

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information ("promo code removed").
    Info,

    /// A completed action ("order placed").
    Success,

    /// Something worth attention but not a failure.
    Warning,

    /// A recoverable failure the user should act on.
    Error,
}

/// Receives user-facing outcome messages from the engine.
pub trait Notifier: fmt::Debug {
    /// Deliver one message.
    fn notify(&self, severity: Severity, message: &str);
}

/// Drops every message. For tests and headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}

/// Forwards messages to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info | Severity::Success => tracing::info!(?severity, "{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}
