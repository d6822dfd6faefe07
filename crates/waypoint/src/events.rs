// File: src/events.rs
// Purpose: Navigation lifecycle notifications exposed to the rendering layer

use serde_json::Value;

/// A navigation lifecycle notification
///
/// Cancellation and abort ride on their own variants, distinct from data
/// failures: they describe lifecycle outcomes, not errors.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A navigation has been accepted and scheduling has begun
    NavigateStart { url: String },
    /// A navigation committed its results; accessors now reflect it
    Navigate { url: String },
    /// A navigation finished; fired after `Navigate` on success
    NavigateEnd { url: String },
    /// A pending navigation was superseded by a newer one
    Cancel { url: String },
    /// A caller explicitly aborted a pending navigation, with its reason
    Abort { url: String, reason: Value },
}

impl RouterEvent {
    /// The navigation URL this event describes
    pub fn url(&self) -> &str {
        match self {
            RouterEvent::NavigateStart { url }
            | RouterEvent::Navigate { url }
            | RouterEvent::NavigateEnd { url }
            | RouterEvent::Cancel { url }
            | RouterEvent::Abort { url, .. } => url,
        }
    }
}
