//! Callback values and the interpreter collaborator.
//!
//! Graphics callbacks arrive in several shapes: native function pointers
//! registered by the host process, strings to be evaluated by the
//! language interpreter, named functions (possibly with bound extra
//! arguments, the cell-array form), or nothing at all. The engine
//! normalizes all of them into [`Callback`] and funnels execution
//! through `GraphicsContext::invoke_callback`.

use matviz_values::Value;

use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::GraphicsContext;

/// Native callback signature. The final slice carries extra bound
/// arguments (empty for plain native callbacks).
pub type NativeCallback =
    fn(&mut GraphicsContext, Handle, &Value, &[Value]) -> Result<(), GraphicsError>;

/// A normalized callback value.
#[derive(Debug, Clone)]
pub enum Callback {
    /// Host-process function pointer.
    Native(NativeCallback),
    /// Host-process function pointer with bound extra arguments.
    Bound(NativeCallback, Vec<Value>),
    /// Source text evaluated by the interpreter collaborator.
    Interpreted(String),
    /// Named function in the host runtime, with bound extra arguments.
    Named(String, Vec<Value>),
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callback::Native(a), Callback::Native(b)) => *a as usize == *b as usize,
            (Callback::Bound(a, x), Callback::Bound(b, y)) => {
                *a as usize == *b as usize && x == y
            }
            (Callback::Interpreted(a), Callback::Interpreted(b)) => a == b,
            (Callback::Named(a, x), Callback::Named(b, y)) => a == b && x == y,
            _ => false,
        }
    }
}

impl Callback {
    /// Normalize a stored property value into a callback.
    ///
    /// Accepted forms mirror the language surface: a function handle, an
    /// evaluatable string, or a cell whose first element is a function
    /// handle followed by extra arguments. Empty values mean "no
    /// callback" and yield `None`.
    pub fn from_value(value: &Value) -> Result<Option<Callback>, GraphicsError> {
        match value {
            v if v.is_empty() => Ok(None),
            Value::FunctionHandle(name) => Ok(Some(Callback::Named(name.clone(), Vec::new()))),
            Value::Str(source) => Ok(Some(Callback::Interpreted(source.clone()))),
            Value::Cell(cell) => {
                if cell.rows != 1 && cell.cols != 1 {
                    return Err(GraphicsError::Callback(
                        "cell callback must be a vector".to_string(),
                    ));
                }
                match cell.data.first() {
                    Some(Value::FunctionHandle(name)) => Ok(Some(Callback::Named(
                        name.clone(),
                        cell.data[1..].to_vec(),
                    ))),
                    _ => Err(GraphicsError::Callback(
                        "first element of a cell callback must be a function handle".to_string(),
                    )),
                }
            }
            other => Err(GraphicsError::Callback(format!(
                "trying to execute non-executable object (class = {})",
                other.class_name()
            ))),
        }
    }

    /// Validate a value destined for a callback property without
    /// normalizing it. Complete validation of strings happens at
    /// execution time.
    pub fn validate(value: &Value) -> bool {
        match value {
            v if v.is_empty() => true,
            Value::FunctionHandle(_) | Value::Str(_) => true,
            Value::Cell(cell) => {
                (cell.rows == 1 || cell.cols == 1)
                    && matches!(cell.data.first(), Some(Value::FunctionHandle(_)))
            }
            _ => false,
        }
    }
}

/// Interpreter collaborator used to run non-native callbacks.
///
/// The graphics core never parses or evaluates language source itself;
/// it hands strings and named functions to this trait. Implementations
/// receive the context back so the callback can reenter the graphics
/// API.
pub trait Interpreter: Send {
    /// Evaluate a source string.
    fn eval(&mut self, ctx: &mut GraphicsContext, source: &str) -> Result<(), GraphicsError>;

    /// Call a named function with the given arguments. The first two
    /// arguments are always the owning handle and the event data.
    fn call(
        &mut self,
        ctx: &mut GraphicsContext,
        name: &str,
        args: &[Value],
    ) -> Result<(), GraphicsError>;
}
