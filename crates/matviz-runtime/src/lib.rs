//! Builtin-function surface of the graphics engine.
//!
//! The host language interpreter calls graphics functionality through
//! named builtins (`set`, `get`, `drawnow`, the `__go_*__`
//! constructors). This crate owns the process-wide
//! [`GraphicsContext`] and registers every builtin through
//! `inventory` so the interpreter can enumerate and dispatch them.

use std::sync::Mutex;

use matviz_graphics::GraphicsContext;
use once_cell::sync::Lazy;

pub mod builtins;

static CONTEXT: Lazy<Mutex<GraphicsContext>> = Lazy::new(|| Mutex::new(GraphicsContext::new()));

/// Run `f` with exclusive access to the process-wide graphics context.
///
/// The lock is advisory: the engine is single threaded by design and
/// the mutex only guards against accidental reentry from unrelated
/// host threads. A poisoned lock is recovered rather than propagated
/// so one panicking callback cannot disable graphics for the session.
pub fn with_context<R>(f: impl FnOnce(&mut GraphicsContext) -> R) -> R {
    let mut guard = CONTEXT.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}
