//! Boundary audit logging
//!
//! Records every crossing of the foreign boundary (context acquisition,
//! reference-count traffic, ownership hand-offs, entry-point calls) through a
//! pluggable logger attached to the entry-point table. The default logger is
//! a no-op.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Boundary event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    /// The execution context was acquired
    ContextAcquired,
    /// The execution context was released
    ContextReleased,
    /// A foreign object's reference count was incremented
    ObjectRetained,
    /// A foreign object's reference count was decremented
    ObjectReleased,
    /// Release responsibility was handed back to the foreign runtime
    ObjectHandedOff,
    /// A named entry point was invoked
    EntryCall { name: &'static str },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::ContextAcquired => write!(f, "context acquired"),
            AuditEvent::ContextReleased => write!(f, "context released"),
            AuditEvent::ObjectRetained => write!(f, "object retained"),
            AuditEvent::ObjectReleased => write!(f, "object released"),
            AuditEvent::ObjectHandedOff => write!(f, "object handed off"),
            AuditEvent::EntryCall { name } => write!(f, "entry call: {}", name),
        }
    }
}

/// Audit logger trait for customizable logging backends
pub trait AuditLogger: Send + Sync {
    /// Record a boundary event
    fn record(&self, event: AuditEvent);

    /// Get all recorded events (for testing)
    fn events(&self) -> Vec<AuditEvent>;

    /// Clear all recorded events (for testing)
    fn clear(&self);
}

/// In-memory audit logger
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLogger {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditLogger {
    /// Create a new in-memory audit logger
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Count recorded events matching a predicate
    pub fn count(&self, pred: impl Fn(&AuditEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Null audit logger (no-op)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLogger;

impl NullAuditLogger {
    /// Create a new null audit logger
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NullAuditLogger {
    fn record(&self, _event: AuditEvent) {
        // No-op
    }

    fn events(&self) -> Vec<AuditEvent> {
        Vec::new()
    }

    fn clear(&self) {
        // No-op
    }
}
