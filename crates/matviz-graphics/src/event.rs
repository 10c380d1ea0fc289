//! Deferred work: the event queue drained by `drawnow`.
//!
//! Any component may post an event; nothing runs until the context
//! drains the queue at an explicit processing point. Draining is FIFO.
//! Admission of new callback events is gated by the interruptibility of
//! the callback currently executing (see `GraphicsContext`).

use std::collections::VecDeque;

use matviz_values::Value;

use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::GraphicsContext;

/// Native deferred-function signature.
pub type EventFunction = fn(&mut GraphicsContext, &Value) -> Result<(), GraphicsError>;

/// One unit of deferred work.
#[derive(Debug, Clone)]
pub enum Event {
    /// Run the named callback property of `handle`.
    Callback {
        handle: Handle,
        name: String,
        data: Value,
    },
    /// Run a native function.
    Function { function: EventFunction, data: Value },
    /// Assign a property value.
    Set {
        handle: Handle,
        name: String,
        value: Value,
    },
}

/// Callbacks on the always-delivered allow-list: these are admitted
/// even while a non-interruptible callback is running, regardless of
/// the target's busyaction.
pub fn is_protected_callback(name: &str) -> bool {
    matches!(
        name,
        "deletefcn" | "createfcn" | "closerequestfcn" | "resizefcn"
    )
}

/// FIFO queue of deferred events.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all pending events targeting `handle`; used during object
    /// teardown so stale events never fire on a recycled handle.
    pub fn discard_for(&mut self, handle: Handle) {
        self.queue.retain(|e| match e {
            Event::Callback { handle: h, .. } | Event::Set { handle: h, .. } => *h != handle,
            Event::Function { .. } => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let mut q = EventQueue::new();
        for i in 0..3 {
            q.push(Event::Set {
                handle: Handle::new(-1.5),
                name: format!("p{i}"),
                value: Value::Num(i as f64),
            });
        }
        let mut seen = Vec::new();
        while let Some(Event::Set { name, .. }) = q.pop() {
            seen.push(name);
        }
        assert_eq!(seen, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn teardown_discards_only_the_target_handle() {
        let mut q = EventQueue::new();
        let (a, b) = (Handle::new(-1.5), Handle::new(-2.5));
        q.push(Event::Callback {
            handle: a,
            name: "buttondownfcn".into(),
            data: Value::empty(),
        });
        q.push(Event::Callback {
            handle: b,
            name: "buttondownfcn".into(),
            data: Value::empty(),
        });
        q.discard_for(a);
        assert_eq!(q.len(), 1);
        match q.pop() {
            Some(Event::Callback { handle, .. }) => assert_eq!(handle, b),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lifecycle_callbacks_are_protected() {
        for name in ["deletefcn", "createfcn", "closerequestfcn", "resizefcn"] {
            assert!(is_protected_callback(name));
        }
        assert!(!is_protected_callback("buttondownfcn"));
    }
}
