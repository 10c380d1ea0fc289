//! Handle-based graphics object system: typed properties, an object
//! registry keyed by numeric handles, a deferred event queue with
//! reentrancy control, and the axes transform and auto-limit engine.
//!
//! The crate is a library core with no rendering of its own; a
//! [`toolkit::GraphicsToolkit`] implementation supplies the drawing
//! backend and a [`callback::Interpreter`] runs user callbacks written
//! in the host language.

pub mod axes;
pub mod callback;
pub mod context;
pub mod defaults;
pub mod error;
pub mod event;
pub mod handle;
pub mod limits;
pub mod object;
pub mod properties;
pub mod property;
pub mod toolkit;
pub mod units;

pub use callback::{Callback, Interpreter, NativeCallback};
pub use context::GraphicsContext;
pub use error::GraphicsError;
pub use event::{Event, EventQueue};
pub use handle::Handle;
pub use limits::{calc_tick_sep, get_axis_limits, DataLimits};
pub use object::{GraphicsObject, ObjectKind};
pub use properties::PropertySet;
pub use property::{Property, PropertyValue};
pub use toolkit::{GraphicsToolkit, NullToolkit, RecordingToolkit};
