//! Graphics object kinds and the per-object record.

use std::fmt;

use matviz_values::{Matrix, Value};

use crate::axes::AxesState;
use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::properties::PropertySet;

/// The concrete kind of a graphics object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Root,
    Figure,
    Axes,
    Line,
    Text,
    Image,
    Patch,
    Surface,
    Hggroup,
    Uimenu,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 10] = [
        ObjectKind::Root,
        ObjectKind::Figure,
        ObjectKind::Axes,
        ObjectKind::Line,
        ObjectKind::Text,
        ObjectKind::Image,
        ObjectKind::Patch,
        ObjectKind::Surface,
        ObjectKind::Hggroup,
        ObjectKind::Uimenu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Root => "root",
            ObjectKind::Figure => "figure",
            ObjectKind::Axes => "axes",
            ObjectKind::Line => "line",
            ObjectKind::Text => "text",
            ObjectKind::Image => "image",
            ObjectKind::Patch => "patch",
            ObjectKind::Surface => "surface",
            ObjectKind::Hggroup => "hggroup",
            ObjectKind::Uimenu => "uimenu",
        }
    }

    pub fn from_name(name: &str) -> Option<ObjectKind> {
        Some(match name {
            "root" => ObjectKind::Root,
            "figure" => ObjectKind::Figure,
            "axes" => ObjectKind::Axes,
            "line" => ObjectKind::Line,
            "text" => ObjectKind::Text,
            "image" => ObjectKind::Image,
            "patch" => ObjectKind::Patch,
            "surface" => ObjectKind::Surface,
            "hggroup" => ObjectKind::Hggroup,
            "uimenu" => ObjectKind::Uimenu,
            _ => return None,
        })
    }

    /// Kinds whose data participates in an enclosing axes' auto-limit
    /// computation.
    pub fn has_data_limits(self) -> bool {
        matches!(
            self,
            ObjectKind::Line
                | ObjectKind::Image
                | ObjectKind::Patch
                | ObjectKind::Surface
                | ObjectKind::Hggroup
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registered graphics object: its property table plus kind-specific
/// derived state (only axes carry any today).
#[derive(Debug, Clone)]
pub struct GraphicsObject {
    pub properties: PropertySet,
    pub axes: Option<AxesState>,
}

impl GraphicsObject {
    pub fn new(properties: PropertySet) -> Self {
        let axes = if properties.kind() == ObjectKind::Axes {
            Some(AxesState::new())
        } else {
            None
        };
        GraphicsObject { properties, axes }
    }

    pub fn kind(&self) -> ObjectKind {
        self.properties.kind()
    }

    pub fn handle(&self) -> Handle {
        self.properties.handle()
    }

    pub fn isa(&self, kind_name: &str) -> bool {
        self.kind().name() == kind_name
    }

    /// Bounding box `[x, y, w, h]` in the object's own units.
    /// `internal` selects `position` over `outerposition` for objects
    /// that carry both; `GraphicsContext::bounding_box` converts the
    /// result to pixels.
    pub fn bounding_box(&self, internal: bool) -> Result<[f64; 4], GraphicsError> {
        let prop = if internal { "position" } else { "outerposition" };
        let name = if self.properties.has_property(prop) {
            prop
        } else {
            "position"
        };
        let value = self.properties.get(name)?;
        match value {
            Value::Matrix(Matrix { ref data, .. }) if data.len() == 4 => {
                Ok([data[0], data[1], data[2], data[3]])
            }
            _ => Err(GraphicsError::invalid_value(
                name,
                "position must be a 1x4 vector",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ObjectKind::from_name("uipanel"), None);
    }

    #[test]
    fn only_drawable_kinds_feed_axis_limits() {
        assert!(ObjectKind::Line.has_data_limits());
        assert!(ObjectKind::Hggroup.has_data_limits());
        assert!(!ObjectKind::Text.has_data_limits());
        assert!(!ObjectKind::Axes.has_data_limits());
    }
}
