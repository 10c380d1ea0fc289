//! Typed property slots.
//!
//! Every graphics object is a bag of named [`Property`] values. A
//! property is a tagged union over the kinds the language surface
//! understands (string, any, radio, boolean, double, handle, data
//! array, color, callback), validated on every assignment: a rejected
//! value raises an error and leaves the slot untouched.

use std::collections::BTreeSet;

use matviz_values::{Matrix, Value};

use crate::callback::Callback;
use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::limits::DataLimits;

/// The finite value set of a radio (enumerated string) property.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioValues {
    default_val: String,
    possible_vals: BTreeSet<String>,
}

impl RadioValues {
    /// Parse a `|`-delimited descriptor. At most one entry may be
    /// wrapped in `{}` to mark the default; with no marker the first
    /// entry is the default.
    pub fn parse(descriptor: &str) -> Result<Self, GraphicsError> {
        if descriptor.is_empty() {
            return Err(GraphicsError::InvalidConstructorArgs(
                "empty radio descriptor".to_string(),
            ));
        }

        let mut default_val = None;
        let mut first = None;
        let mut possible_vals = BTreeSet::new();

        for entry in descriptor.split('|') {
            let (value, is_default) = if entry.starts_with('{') {
                if !entry.ends_with('}') || entry.len() < 3 {
                    return Err(GraphicsError::InvalidConstructorArgs(format!(
                        "malformed radio descriptor entry `{entry}'"
                    )));
                }
                (&entry[1..entry.len() - 1], true)
            } else {
                (entry, false)
            };

            if value.is_empty() {
                return Err(GraphicsError::InvalidConstructorArgs(format!(
                    "empty entry in radio descriptor `{descriptor}'"
                )));
            }

            if is_default {
                if default_val.is_some() {
                    return Err(GraphicsError::InvalidConstructorArgs(format!(
                        "radio descriptor `{descriptor}' marks more than one default"
                    )));
                }
                default_val = Some(value.to_string());
            }
            if first.is_none() {
                first = Some(value.to_string());
            }
            possible_vals.insert(value.to_string());
        }

        let default_val = default_val.or(first).ok_or_else(|| {
            GraphicsError::InvalidConstructorArgs(format!(
                "radio descriptor `{descriptor}' has no values"
            ))
        })?;

        Ok(RadioValues {
            default_val,
            possible_vals,
        })
    }

    pub fn default_value(&self) -> &str {
        &self.default_val
    }

    pub fn contains(&self, value: &str) -> bool {
        self.possible_vals.contains(value)
    }

    pub fn values(&self) -> impl Iterator<Item = &String> {
        self.possible_vals.iter()
    }
}

/// An RGB triple with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorValues {
    pub rgb: [f64; 3],
}

impl ColorValues {
    pub fn new(r: f64, g: f64, b: f64) -> Result<Self, GraphicsError> {
        for c in [r, g, b] {
            if !(0.0..=1.0).contains(&c) {
                return Err(GraphicsError::InvalidConstructorArgs(format!(
                    "color component {c} outside [0, 1]"
                )));
            }
        }
        Ok(ColorValues { rgb: [r, g, b] })
    }

    /// Resolve a color name or single-letter abbreviation. Matching is
    /// by prefix against the full color names, checked in a fixed
    /// order.
    pub fn from_name(name: &str) -> Option<Self> {
        let s = name.to_ascii_lowercase();
        let matches = |full: &str| !s.is_empty() && full.starts_with(&s);

        let rgb = if matches("blue") {
            [0.0, 0.0, 1.0]
        } else if matches("black") || s == "k" {
            [0.0, 0.0, 0.0]
        } else if matches("red") {
            [1.0, 0.0, 0.0]
        } else if matches("green") {
            [0.0, 1.0, 0.0]
        } else if matches("yellow") {
            [1.0, 1.0, 0.0]
        } else if matches("magenta") {
            [1.0, 0.0, 1.0]
        } else if matches("cyan") {
            [0.0, 1.0, 1.0]
        } else if matches("white") || s == "w" {
            [1.0, 1.0, 1.0]
        } else {
            return None;
        };

        Some(ColorValues { rgb })
    }
}

/// Current state of a color property: either a radio alternative (e.g.
/// `"none"`, `"auto"`) or a concrete RGB value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorState {
    Radio(String),
    Rgb(ColorValues),
}

/// Shape constraint on a data property; one entry per accepted shape,
/// `None` meaning "any extent" along that dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeConstraint(pub Vec<Option<usize>>);

impl ShapeConstraint {
    fn accepts(&self, rows: usize, cols: usize) -> bool {
        if self.0.len() != 2 {
            return false;
        }
        let dim_ok = |want: Option<usize>, got: usize| want.map(|w| w == got).unwrap_or(true);
        dim_ok(self.0[0], rows) && dim_ok(self.0[1], cols)
    }
}

/// A data (numeric array) property with optional shape constraints and
/// cached extrema for the axis auto-scaling machinery.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    pub matrix: Matrix,
    constraints: Vec<ShapeConstraint>,
    limits: DataLimits,
}

impl DataValue {
    fn new(matrix: Matrix, constraints: Vec<ShapeConstraint>) -> Self {
        let limits = DataLimits::from_data(&matrix.data);
        DataValue {
            matrix,
            constraints,
            limits,
        }
    }

    fn validate(&self, m: &Matrix) -> bool {
        // The empty matrix is always accepted.
        if m.is_empty() {
            return true;
        }
        if self.constraints.is_empty() {
            return true;
        }
        self.constraints.iter().any(|c| c.accepts(m.rows, m.cols))
    }

    pub fn limits(&self) -> DataLimits {
        self.limits
    }
}

/// The tagged value of one property slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Any(Value),
    Radio { values: RadioValues, current: String },
    Bool(bool),
    Double(f64),
    Handle(Handle),
    Data(DataValue),
    Color { values: RadioValues, current: ColorState },
    Callback(Value),
}

/// A single named, typed, validated slot on a graphics object.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    value: PropertyValue,
    hidden: bool,
    listeners: Vec<Callback>,
}

impl Property {
    fn new(name: &str, value: PropertyValue) -> Self {
        Property {
            name: name.to_ascii_lowercase(),
            value,
            hidden: false,
            listeners: Vec::new(),
        }
    }

    pub fn string(name: &str, default: &str) -> Self {
        Self::new(name, PropertyValue::String(default.to_string()))
    }

    pub fn any(name: &str, default: Value) -> Self {
        Self::new(name, PropertyValue::Any(default))
    }

    pub fn radio(name: &str, descriptor: &str) -> Result<Self, GraphicsError> {
        let values = RadioValues::parse(descriptor)?;
        let current = values.default_value().to_string();
        Ok(Self::new(name, PropertyValue::Radio { values, current }))
    }

    pub fn boolean(name: &str, default_on: bool) -> Self {
        Self::new(name, PropertyValue::Bool(default_on))
    }

    pub fn double(name: &str, default: f64) -> Self {
        Self::new(name, PropertyValue::Double(default))
    }

    pub fn handle(name: &str, default: Handle) -> Self {
        Self::new(name, PropertyValue::Handle(default))
    }

    pub fn data(name: &str, default: Matrix) -> Self {
        Self::new(name, PropertyValue::Data(DataValue::new(default, Vec::new())))
    }

    pub fn data_constrained(
        name: &str,
        default: Matrix,
        constraints: Vec<ShapeConstraint>,
    ) -> Self {
        Self::new(name, PropertyValue::Data(DataValue::new(default, constraints)))
    }

    /// Color property accepting the radio alternatives in `descriptor`
    /// (may be empty for "RGB only") plus color names and RGB triples.
    pub fn color(name: &str, descriptor: &str, default: ColorState) -> Result<Self, GraphicsError> {
        let values = if descriptor.is_empty() {
            RadioValues {
                default_val: String::new(),
                possible_vals: BTreeSet::new(),
            }
        } else {
            RadioValues::parse(descriptor)?
        };
        Ok(Self::new(
            name,
            PropertyValue::Color {
                values,
                current: default,
            },
        ))
    }

    pub fn color_rgb(name: &str, rgb: [f64; 3]) -> Self {
        Self::new(
            name,
            PropertyValue::Color {
                values: RadioValues {
                    default_val: String::new(),
                    possible_vals: BTreeSet::new(),
                },
                current: ColorState::Rgb(ColorValues { rgb }),
            },
        )
    }

    pub fn callback(name: &str) -> Self {
        Self::new(name, PropertyValue::Callback(Value::empty()))
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// The property value as seen by the language surface.
    pub fn get(&self) -> Value {
        match &self.value {
            PropertyValue::String(s) => Value::Str(s.clone()),
            PropertyValue::Any(v) | PropertyValue::Callback(v) => v.clone(),
            PropertyValue::Radio { current, .. } => Value::Str(current.clone()),
            PropertyValue::Bool(b) => Value::Str(if *b { "on" } else { "off" }.to_string()),
            PropertyValue::Double(d) => Value::Num(*d),
            PropertyValue::Handle(h) => h.as_value(),
            PropertyValue::Data(d) => Value::Matrix(d.matrix.clone()),
            PropertyValue::Color { current, .. } => match current {
                ColorState::Radio(s) => Value::Str(s.clone()),
                ColorState::Rgb(c) => Value::Matrix(Matrix::row_vector(c.rgb.to_vec())),
            },
        }
    }

    /// Validate and store a new value.
    ///
    /// Returns `Ok(true)` iff the value actually changed (by value
    /// equality); an unchanged assignment is a no-op. An invalid value
    /// raises and leaves the current value in place.
    pub fn set_value(&mut self, val: &Value) -> Result<bool, GraphicsError> {
        let new_value = self.convert(val)?;
        if new_value == self.value {
            return Ok(false);
        }
        self.value = new_value;
        Ok(true)
    }

    fn convert(&self, val: &Value) -> Result<PropertyValue, GraphicsError> {
        let reject = |reason: &str| {
            Err(GraphicsError::invalid_value(self.name.clone(), reason.to_string()))
        };

        match &self.value {
            PropertyValue::String(_) => match val {
                Value::Str(s) => Ok(PropertyValue::String(s.clone())),
                _ => reject("expected a string"),
            },
            PropertyValue::Any(_) => Ok(PropertyValue::Any(val.clone())),
            PropertyValue::Radio { values, .. } => match val {
                Value::Str(s) => {
                    if values.contains(s) {
                        Ok(PropertyValue::Radio {
                            values: values.clone(),
                            current: s.clone(),
                        })
                    } else {
                        let allowed: Vec<String> = values.values().cloned().collect();
                        Err(GraphicsError::invalid_value(
                            self.name.clone(),
                            format!("`{}' is not one of {}", s, allowed.join(", ")),
                        ))
                    }
                }
                _ => reject("expected a string"),
            },
            PropertyValue::Bool(_) => match val {
                Value::Bool(b) => Ok(PropertyValue::Bool(*b)),
                Value::Str(s) if s == "on" => Ok(PropertyValue::Bool(true)),
                Value::Str(s) if s == "off" => Ok(PropertyValue::Bool(false)),
                Value::Num(n) => Ok(PropertyValue::Bool(*n != 0.0)),
                _ => reject("expected \"on\" or \"off\""),
            },
            PropertyValue::Double(_) => match val.as_scalar() {
                Some(d) => Ok(PropertyValue::Double(d)),
                None => reject("expected a numeric scalar"),
            },
            PropertyValue::Handle(_) => match val {
                v if v.is_empty() => Ok(PropertyValue::Handle(Handle::unset())),
                v => match v.as_scalar() {
                    // Liveness of the referenced handle is checked by
                    // the context before dispatching here.
                    Some(d) => Ok(PropertyValue::Handle(Handle::new(d))),
                    None => reject("expected a graphics handle"),
                },
            },
            PropertyValue::Data(d) => match val.to_matrix() {
                Some(m) => {
                    if d.validate(&m) {
                        Ok(PropertyValue::Data(DataValue::new(m, d.constraints.clone())))
                    } else {
                        Err(GraphicsError::invalid_value(
                            self.name.clone(),
                            format!("{}x{} value violates the size constraint", m.rows, m.cols),
                        ))
                    }
                }
                None => reject("expected numeric data"),
            },
            PropertyValue::Color { values, .. } => {
                let current = match val {
                    Value::Str(s) if !s.is_empty() => {
                        if values.contains(s) {
                            ColorState::Radio(s.clone())
                        } else if let Some(c) = ColorValues::from_name(s) {
                            ColorState::Rgb(c)
                        } else {
                            return Err(GraphicsError::invalid_value(
                                self.name.clone(),
                                format!("unknown color `{s}'"),
                            ));
                        }
                    }
                    Value::Matrix(m) if m.numel() == 3 => {
                        let c = ColorValues::new(m.data[0], m.data[1], m.data[2])
                            .map_err(|_| GraphicsError::invalid_value(
                                self.name.clone(),
                                "RGB components must lie in [0, 1]",
                            ))?;
                        ColorState::Rgb(c)
                    }
                    _ => return reject("expected a color name or RGB triple"),
                };
                Ok(PropertyValue::Color {
                    values: values.clone(),
                    current,
                })
            }
            PropertyValue::Callback(_) => {
                if Callback::validate(val) {
                    Ok(PropertyValue::Callback(val.clone()))
                } else {
                    reject("expected a callback (function handle, string, or cell)")
                }
            }
        }
    }

    pub fn add_listener(&mut self, callback: Callback) {
        self.listeners.push(callback);
    }

    /// Remove listeners matching `callback` by value equality, or all
    /// of them when `callback` is `None`.
    pub fn delete_listener(&mut self, callback: Option<&Callback>) {
        match callback {
            Some(cb) => self.listeners.retain(|l| l != cb),
            None => self.listeners.clear(),
        }
    }

    pub fn listeners(&self) -> &[Callback] {
        &self.listeners
    }

    /// Data-array extrema for the auto-limit machinery; `None` for
    /// non-data properties.
    pub fn data_limits(&self) -> Option<DataLimits> {
        match &self.value {
            PropertyValue::Data(d) => Some(d.limits()),
            _ => None,
        }
    }

    /// Convenience: current radio/bool state equals `state`.
    pub fn is(&self, state: &str) -> bool {
        match &self.value {
            PropertyValue::Radio { current, .. } => current == state,
            PropertyValue::Bool(b) => (*b && state == "on") || (!*b && state == "off"),
            PropertyValue::Color { current: ColorState::Radio(s), .. } => s == state,
            PropertyValue::String(s) => s == state,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_descriptor_marks_default() {
        let r = RadioValues::parse("a|{b}|c").unwrap();
        assert_eq!(r.default_value(), "b");
        assert!(r.contains("a") && r.contains("b") && r.contains("c"));
        assert!(!r.contains("z"));
    }

    #[test]
    fn radio_descriptor_defaults_to_first_entry() {
        let r = RadioValues::parse("on|off").unwrap();
        assert_eq!(r.default_value(), "on");
    }

    #[test]
    fn malformed_radio_descriptors_are_rejected() {
        assert!(RadioValues::parse("").is_err());
        assert!(RadioValues::parse("a||b").is_err());
        assert!(RadioValues::parse("a|{}|b").is_err());
        assert!(RadioValues::parse("{a}|{b}").is_err());
        assert!(RadioValues::parse("a|{b").is_err());
    }

    #[test]
    fn radio_property_rejects_unknown_value_and_keeps_state() {
        let mut p = Property::radio("linestyle", "a|{b}|c").unwrap();
        assert_eq!(p.get(), Value::from("b"));
        let err = p.set_value(&Value::from("z")).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidPropertyValue { .. }));
        assert_eq!(p.get(), Value::from("b"));
        assert!(p.set_value(&Value::from("c")).unwrap());
        assert_eq!(p.get(), Value::from("c"));
    }

    #[test]
    fn unchanged_assignment_reports_no_change() {
        let mut p = Property::double("linewidth", 0.5);
        assert!(!p.set_value(&Value::Num(0.5)).unwrap());
        assert!(p.set_value(&Value::Num(2.0)).unwrap());
        assert!(!p.set_value(&Value::Num(2.0)).unwrap());
    }

    #[test]
    fn boolean_accepts_on_off_strings() {
        let mut p = Property::boolean("visible", true);
        assert_eq!(p.get(), Value::from("on"));
        assert!(p.set_value(&Value::from("off")).unwrap());
        assert!(p.is("off"));
        assert!(p.set_value(&Value::Bool(true)).unwrap());
        assert!(p.is("on"));
    }

    #[test]
    fn color_accepts_names_abbreviations_and_triples() {
        let mut p = Property::color("color", "{none}|flat", ColorState::Radio("none".into()))
            .unwrap();
        assert!(p.set_value(&Value::from("r")).unwrap());
        assert_eq!(
            p.get(),
            Value::Matrix(Matrix::row_vector(vec![1.0, 0.0, 0.0]))
        );
        assert!(p.set_value(&Value::from("flat")).unwrap());
        assert_eq!(p.get(), Value::from("flat"));
        assert!(p
            .set_value(&Value::Matrix(Matrix::row_vector(vec![0.1, 0.2, 0.3])))
            .unwrap());
        assert!(p
            .set_value(&Value::Matrix(Matrix::row_vector(vec![2.0, 0.0, 0.0])))
            .is_err());
    }

    #[test]
    fn data_constraints_reject_bad_shapes() {
        let mut p = Property::data_constrained(
            "position",
            Matrix::row_vector(vec![0.0, 0.0, 1.0, 1.0]),
            vec![ShapeConstraint(vec![Some(1), Some(4)])],
        );
        assert!(p
            .set_value(&Value::Matrix(Matrix::row_vector(vec![1.0, 2.0])))
            .is_err());
        // Empty is always accepted.
        assert!(p.set_value(&Value::Matrix(Matrix::empty())).unwrap());
    }

    #[test]
    fn data_limits_track_finite_extrema() {
        let p = Property::data(
            "xdata",
            Matrix::row_vector(vec![1.0, 5.0, 3.0, f64::NAN]),
        );
        let l = p.data_limits().unwrap();
        assert_eq!((l.min, l.max, l.min_pos), (1.0, 5.0, 1.0));
    }

    #[test]
    fn listener_deletion_is_by_value() {
        let mut p = Property::double("linewidth", 1.0);
        p.add_listener(Callback::Interpreted("a".into()));
        p.add_listener(Callback::Interpreted("b".into()));
        p.delete_listener(Some(&Callback::Interpreted("a".into())));
        assert_eq!(p.listeners(), &[Callback::Interpreted("b".into())]);
        p.delete_listener(None);
        assert!(p.listeners().is_empty());
    }
}
