//! Dynamically-typed values exchanged between the graphics core and the
//! host language runtime.
//!
//! The graphics engine stores property values, callback payloads and
//! builtin-function arguments as [`Value`]. Numeric data is carried in
//! column-major [`Matrix`] form to match the host language's array
//! semantics.

pub use inventory;

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
    Str(String),
    Matrix(Matrix),
    Cell(CellArray),
    Struct(StructValue),
    // Function handle pointing to a named function (builtin or user)
    FunctionHandle(String),
}

impl Value {
    /// Empty 0x0 numeric matrix, the host language's `[]`.
    pub fn empty() -> Self {
        Value::Matrix(Matrix::empty())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Matrix(m) => m.is_empty(),
            Value::Str(s) => s.is_empty(),
            Value::Cell(c) => c.data.is_empty(),
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Scalar numeric view; `Bool` and 1x1 matrices coerce.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Num(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Matrix(m) if m.numel() == 1 => Some(m.data[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Row-vector view of anything numeric.
    pub fn as_row_vector(&self) -> Option<Vec<f64>> {
        match self {
            Value::Num(v) => Some(vec![*v]),
            Value::Bool(b) => Some(vec![if *b { 1.0 } else { 0.0 }]),
            Value::Matrix(m) => Some(m.data.clone()),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Matrix view, promoting scalars to 1x1.
    pub fn to_matrix(&self) -> Option<Matrix> {
        match self {
            Value::Num(v) => Some(Matrix::scalar(*v)),
            Value::Bool(b) => Some(Matrix::scalar(if *b { 1.0 } else { 0.0 })),
            Value::Matrix(m) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Value::Num(_) | Value::Matrix(_) => "double",
            Value::Bool(_) => "logical",
            Value::Str(_) => "char",
            Value::Cell(_) => "cell",
            Value::Struct(_) => "struct",
            Value::FunctionHandle(_) => "function_handle",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Matrix> for Value {
    fn from(v: Matrix) -> Self {
        Value::Matrix(v)
    }
}

impl TryFrom<&Value> for f64 {
    type Error = String;

    fn try_from(value: &Value) -> Result<f64, String> {
        value
            .as_scalar()
            .ok_or_else(|| format!("expected numeric scalar, got {}", value.class_name()))
    }
}

/// 2-D numeric array in column-major layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
}

impl Matrix {
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, String> {
        if rows * cols != data.len() {
            return Err(format!(
                "matrix data length {} doesn't match dimensions {}x{}",
                data.len(),
                rows,
                cols
            ));
        }
        Ok(Matrix { data, rows, cols })
    }

    pub fn empty() -> Self {
        Matrix {
            data: Vec::new(),
            rows: 0,
            cols: 0,
        }
    }

    pub fn scalar(v: f64) -> Self {
        Matrix {
            data: vec![v],
            rows: 1,
            cols: 1,
        }
    }

    pub fn row_vector(data: Vec<f64>) -> Self {
        let cols = data.len();
        Matrix {
            data,
            rows: 1,
            cols,
        }
    }

    pub fn filled(rows: usize, cols: usize, v: f64) -> Self {
        Matrix {
            data: vec![v; rows * cols],
            rows,
            cols,
        }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get2(&self, row: usize, col: usize) -> Result<f64, String> {
        if row >= self.rows || col >= self.cols {
            return Err(format!(
                "index ({}, {}) out of bounds for {}x{} matrix",
                row, col, self.rows, self.cols
            ));
        }
        // Column-major linearization: lin = row + col*rows
        Ok(self.data[row + col * self.rows])
    }

    pub fn set2(&mut self, row: usize, col: usize, value: f64) -> Result<(), String> {
        if row >= self.rows || col >= self.cols {
            return Err(format!(
                "index ({}, {}) out of bounds for {}x{} matrix",
                row, col, self.rows, self.cols
            ));
        }
        self.data[row + col * self.rows] = value;
        Ok(())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.data[r + c * self.rows])?;
            }
            if r + 1 < self.rows {
                write!(f, "; ")?;
            }
        }
        write!(f, "]")
    }
}

/// Cell array; shape is tracked as rows x cols like [`Matrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    pub data: Vec<Value>,
    pub rows: usize,
    pub cols: usize,
}

impl CellArray {
    pub fn new(data: Vec<Value>, rows: usize, cols: usize) -> Result<Self, String> {
        if rows * cols != data.len() {
            return Err(format!(
                "cell data length {} doesn't match dimensions {}x{}",
                data.len(),
                rows,
                cols
            ));
        }
        Ok(CellArray { data, rows, cols })
    }

    pub fn row(data: Vec<Value>) -> Self {
        let cols = data.len();
        CellArray {
            data,
            rows: if cols == 0 { 0 } else { 1 },
            cols,
        }
    }

    /// True for 1xN / Nx1 cells whose elements are all strings.
    pub fn is_cellstr(&self) -> bool {
        (self.rows <= 1 || self.cols <= 1) && self.data.iter().all(Value::is_string)
    }
}

/// Scalar struct; fields enumerate in sorted name order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    fields: BTreeMap<String, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            Value::Str(s) => write!(f, "{s}"),
            Value::Matrix(m) => write!(f, "{m}"),
            Value::Cell(c) => {
                write!(f, "{{")?;
                for (i, v) in c.data.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => write!(f, "struct with {} fields", s.len()),
            Value::FunctionHandle(name) => write!(f, "@{name}"),
        }
    }
}

/// Registration record for a graphics builtin function.
///
/// Builtins are collected through `inventory` so the host runtime can
/// enumerate and dispatch them without a hand-maintained table.
pub struct BuiltinFunction {
    pub name: &'static str,
    pub summary: &'static str,
    pub implementation: fn(&[Value]) -> Result<Value, String>,
}

inventory::collect!(BuiltinFunction);

pub fn builtin_functions() -> Vec<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().collect()
}

pub fn lookup_builtin(name: &str) -> Option<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().find(|b| b.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_roundtrips_column_major_indices() {
        let mut m = Matrix::zeros(2, 3);
        m.set2(1, 2, 7.0).unwrap();
        assert_eq!(m.get2(1, 2).unwrap(), 7.0);
        assert_eq!(m.data[1 + 2 * 2], 7.0);
        assert!(m.get2(2, 0).is_err());
    }

    #[test]
    fn matrix_rejects_mismatched_shape() {
        assert!(Matrix::new(vec![1.0, 2.0, 3.0], 2, 2).is_err());
    }

    #[test]
    fn scalar_coercions() {
        assert_eq!(Value::Bool(true).as_scalar(), Some(1.0));
        assert_eq!(Value::Matrix(Matrix::scalar(4.0)).as_scalar(), Some(4.0));
        assert_eq!(Value::Str("x".into()).as_scalar(), None);
    }

    #[test]
    fn empty_matrix_is_empty_value() {
        assert!(Value::empty().is_empty());
        assert!(!Value::Num(0.0).is_empty());
    }

    #[test]
    fn cellstr_detection() {
        let c = CellArray::row(vec![Value::from("a"), Value::from("b")]);
        assert!(c.is_cellstr());
        let c = CellArray::row(vec![Value::from("a"), Value::Num(1.0)]);
        assert!(!c.is_cellstr());
    }
}
