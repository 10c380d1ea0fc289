//! Position unit conversion.
//!
//! Positions convert through pixel space: `from` units to pixels, then
//! pixels to `to` units. Pixel coordinates are 1-based, so the origin
//! offset appears on the point components but not on widths/heights.

use crate::error::GraphicsError;

/// Pixels-per-unit factor for the physical units, or `None` for the
/// units that need the parent dimensions instead.
fn physical_factor(units: &str, resolution: f64) -> Option<f64> {
    match units {
        "points" => Some(resolution / 72.0),
        "inches" => Some(resolution),
        "centimeters" => Some(resolution / 2.54),
        _ => None,
    }
}

/// Convert a position (`[x, y]` point or `[x, y, w, h]` rectangle)
/// between unit systems.
///
/// `parent_dim` is the parent container's size in pixels (used by
/// normalized units) and `resolution` the screen resolution in dots per
/// inch (used by the physical units).
pub fn convert_position(
    pos: &[f64],
    from: &str,
    to: &str,
    parent_dim: [f64; 2],
    resolution: f64,
) -> Result<Vec<f64>, GraphicsError> {
    if pos.len() != 2 && pos.len() != 4 {
        return Err(GraphicsError::InvalidArgument(
            "position must have 2 or 4 elements".to_string(),
        ));
    }
    // Character units need font metrics the engine does not model;
    // the position passes through unchanged.
    if from == "characters" || to == "characters" {
        return Ok(pos.to_vec());
    }
    let is_rectangle = pos.len() == 4;

    // To pixels.
    let mut px = pos.to_vec();
    match from {
        "pixels" => {}
        "normalized" => {
            px[0] = pos[0] * parent_dim[0] + 1.0;
            px[1] = pos[1] * parent_dim[1] + 1.0;
            if is_rectangle {
                px[2] = pos[2] * parent_dim[0];
                px[3] = pos[3] * parent_dim[1];
            }
        }
        _ => match physical_factor(from, resolution) {
            Some(f) => {
                px[0] = pos[0] * f + 1.0;
                px[1] = pos[1] * f + 1.0;
                if is_rectangle {
                    px[2] = pos[2] * f;
                    px[3] = pos[3] * f;
                }
            }
            None => {
                return Err(GraphicsError::InvalidArgument(format!(
                    "unsupported units \"{from}\""
                )))
            }
        },
    }

    // From pixels.
    let mut out = px.clone();
    match to {
        "pixels" => {}
        "normalized" => {
            out[0] = (px[0] - 1.0) / parent_dim[0];
            out[1] = (px[1] - 1.0) / parent_dim[1];
            if is_rectangle {
                out[2] = px[2] / parent_dim[0];
                out[3] = px[3] / parent_dim[1];
            }
        }
        _ => match physical_factor(to, resolution) {
            Some(f) => {
                out[0] = (px[0] - 1.0) / f;
                out[1] = (px[1] - 1.0) / f;
                if is_rectangle {
                    out[2] = px[2] / f;
                    out[3] = px[3] / f;
                }
            }
            None => {
                return Err(GraphicsError::InvalidArgument(format!(
                    "unsupported units \"{to}\""
                )))
            }
        },
    }

    Ok(out)
}
