//! Axes-specific derived state: camera transforms, aspect-ratio
//! reconciliation, and the interactive zoom stack.
//!
//! The camera pipeline maps data space through a normalization step
//! (axis limits, direction flips, log scaling) into a unit cube, then
//! through view and orthographic projection matrices derived from the
//! camera position/target/up-vector triple, and finally through a
//! viewport transform into pixel space. Both the composite render
//! matrix and its inverse are kept for hit-testing and unprojection.

use glam::{DMat4, DVec3, DVec4};
use matviz_values::{Matrix, Value};

use crate::error::GraphicsError;
use crate::properties::PropertySet;

/// One pushed zoom level: the x/y limits and their modes at push time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoomEntry {
    pub xlim: [f64; 2],
    pub xlimmode: String,
    pub ylim: [f64; 2],
    pub ylimmode: String,
}

/// Derived (non-property) state of one axes object.
#[derive(Debug, Clone)]
pub struct AxesState {
    pub render: DMat4,
    pub render_inv: DMat4,
    pub view: DMat4,
    pub projection: DMat4,
    pub viewport: DMat4,
    /// Depth range of the scene after the view transform, used by
    /// renderers for z-buffer setup.
    pub depth: [f64; 2],
    zoom_stack: Vec<ZoomEntry>,
}

impl Default for AxesState {
    fn default() -> Self {
        Self::new()
    }
}

impl AxesState {
    pub fn new() -> Self {
        AxesState {
            render: DMat4::IDENTITY,
            render_inv: DMat4::IDENTITY,
            view: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
            viewport: DMat4::IDENTITY,
            depth: [0.0, 1.0],
            zoom_stack: Vec::new(),
        }
    }

    pub fn push_zoom(&mut self, entry: ZoomEntry) {
        self.zoom_stack.push(entry);
    }

    pub fn pop_zoom(&mut self) -> Option<ZoomEntry> {
        self.zoom_stack.pop()
    }

    /// Drop every pushed level, returning the bottom entry so the
    /// caller can restore the pre-zoom limits.
    pub fn clear_zoom_stack(&mut self) -> Option<ZoomEntry> {
        let bottom = if self.zoom_stack.is_empty() {
            None
        } else {
            Some(self.zoom_stack.remove(0))
        };
        self.zoom_stack.clear();
        bottom
    }

    pub fn zoom_depth(&self) -> usize {
        self.zoom_stack.len()
    }

    /// Map a data-space point to pixel space.
    pub fn transform(&self, p: DVec3) -> DVec3 {
        let v = self.render * DVec4::new(p.x, p.y, p.z, 1.0);
        DVec3::new(v.x, v.y, v.z)
    }

    /// Map a pixel-space point back to data space.
    pub fn untransform(&self, p: DVec3) -> DVec3 {
        let v = self.render_inv * DVec4::new(p.x, p.y, p.z, 1.0);
        DVec3::new(v.x, v.y, v.z)
    }
}

fn limits(props: &PropertySet, name: &str) -> Result<[f64; 2], GraphicsError> {
    match props.get(name)? {
        Value::Matrix(m) if m.numel() == 2 => Ok([m.data[0], m.data[1]]),
        _ => Err(GraphicsError::invalid_value(name, "expected a 1x2 vector")),
    }
}

fn vec3(props: &PropertySet, name: &str) -> Result<DVec3, GraphicsError> {
    match props.get(name)? {
        Value::Matrix(m) if m.numel() == 3 => Ok(DVec3::new(m.data[0], m.data[1], m.data[2])),
        _ => Err(GraphicsError::invalid_value(name, "expected a 1x3 vector")),
    }
}

/// Axis limits after applying the scale: log axes work in log10 space.
fn scaled_limits(props: &PropertySet, axis: &str) -> Result<[f64; 2], GraphicsError> {
    let lim = limits(props, &format!("{axis}lim"))?;
    if props.is(&format!("{axis}scale"), "log") {
        Ok([lim[0].abs().log10(), lim[1].abs().log10()])
    } else {
        Ok(lim)
    }
}

/// Recompute the camera, projection, viewport, and composite render
/// matrices from the current property values, storing any auto-computed
/// camera parameters back into the property table.
pub fn update_camera(props: &mut PropertySet, state: &mut AxesState) -> Result<(), GraphicsError> {
    let xlim = scaled_limits(props, "x")?;
    let ylim = scaled_limits(props, "y")?;
    let zlim = scaled_limits(props, "z")?;

    let xd = if props.is("xdir", "reverse") { -1.0 } else { 1.0 };
    let yd = if props.is("ydir", "reverse") { -1.0 } else { 1.0 };
    let zd = if props.is("zdir", "reverse") { -1.0 } else { 1.0 };

    let center = DVec3::new(
        (xlim[0] + xlim[1]) / 2.0,
        (ylim[0] + ylim[1]) / 2.0,
        (zlim[0] + zlim[1]) / 2.0,
    );
    let extent = DVec3::new(
        (xlim[1] - xlim[0]).max(f64::EPSILON),
        (ylim[1] - ylim[0]).max(f64::EPSILON),
        (zlim[1] - zlim[0]).max(f64::EPSILON),
    );

    let view_prop = limits(props, "view")?;
    let az = view_prop[0].to_radians();
    let el = view_prop[1].to_radians();

    let pb = vec3(props, "plotboxaspectratio")?;

    let target = if props.is("cameratargetmode", "auto") {
        store_vec3(props, "cameratarget", center)?;
        center
    } else {
        vec3(props, "cameratarget")?
    };

    let eye = if props.is("camerapositionmode", "auto") {
        // Camera sits on a sphere around the target; azimuth and
        // elevation come from the view property, the radius from the
        // plot box diagonal.
        let d = 5.0 * pb.length();
        let dir = if view_prop[1].abs() == 90.0 {
            DVec3::new(0.0, 0.0, view_prop[1].signum())
        } else {
            DVec3::new(el.cos() * az.sin(), -el.cos() * az.cos(), el.sin())
        };
        // Undo the plot-box normalization so the direction is in data
        // units.
        let eye = target
            + DVec3::new(
                dir.x * d * xd * extent.x / pb.x,
                dir.y * d * yd * extent.y / pb.y,
                dir.z * d * zd * extent.z / pb.z,
            );
        store_vec3(props, "cameraposition", eye)?;
        eye
    } else {
        vec3(props, "cameraposition")?
    };

    let up = if props.is("cameraupvectormode", "auto") {
        let up = if view_prop[1].abs() == 90.0 {
            DVec3::new(
                -view_prop[1].signum() * az.sin(),
                view_prop[1].signum() * az.cos(),
                0.0,
            )
        } else {
            DVec3::new(0.0, 0.0, 1.0)
        };
        store_vec3(props, "cameraupvector", up)?;
        up
    } else {
        vec3(props, "cameraupvector")?
    };

    // Normalize data space to a plot-box-proportioned cube centered on
    // the camera target, with direction flips applied.
    let scale = DVec3::new(
        xd * pb.x / extent.x,
        yd * pb.y / extent.y,
        zd * pb.z / extent.z,
    );
    let normalize =
        DMat4::from_scale(scale) * DMat4::from_translation(-target);

    let norm_eye = point(normalize, eye);
    let norm_up = (DMat4::from_scale(scale) * DVec4::new(up.x, up.y, up.z, 0.0)).truncate();
    let view = DMat4::look_at_rh(norm_eye, DVec3::ZERO, norm_up.normalize());

    // Orthographic frustum sized by the camera view angle at the
    // eye-to-target distance.
    let distance = norm_eye.length();
    let va = if props.is("cameraviewanglemode", "auto") {
        let va = (2.0 * (0.5 * pb.length() * 3f64.sqrt() / distance).atan()).to_degrees();
        set_double(props, "cameraviewangle", va)?;
        va
    } else {
        match props.get("cameraviewangle")?.as_scalar() {
            Some(v) => v,
            None => {
                return Err(GraphicsError::invalid_value(
                    "cameraviewangle",
                    "expected a numeric scalar",
                ))
            }
        }
    };
    let half = distance * (va.to_radians() / 2.0).tan();
    let projection = DMat4::orthographic_rh(
        -half,
        half,
        -half,
        half,
        -2.0 * distance,
        2.0 * distance,
    );

    // Pixel viewport from the normalized position rectangle; NDC y
    // grows upward, pixel y downward.
    let pos = position_rect(props)?;
    let viewport = DMat4::from_translation(DVec3::new(
        pos[0] + pos[2] / 2.0,
        pos[1] + pos[3] / 2.0,
        0.5,
    )) * DMat4::from_scale(DVec3::new(pos[2] / 2.0, -pos[3] / 2.0, 0.5));

    let render = viewport * projection * view * normalize;

    state.view = view;
    state.projection = projection;
    state.viewport = viewport;
    state.render = render;
    state.render_inv = render.inverse();

    // Depth range of the normalized cube corners after the view
    // transform.
    let mut dmin = f64::INFINITY;
    let mut dmax = f64::NEG_INFINITY;
    for ix in [-0.5, 0.5] {
        for iy in [-0.5, 0.5] {
            for iz in [-0.5, 0.5] {
                let z = point(view, DVec3::new(ix * pb.x, iy * pb.y, iz * pb.z)).z;
                dmin = dmin.min(z);
                dmax = dmax.max(z);
            }
        }
    }
    state.depth = [dmin, dmax];

    Ok(())
}

/// Reconcile `dataaspectratio` and `plotboxaspectratio`.
///
/// With both modes auto the plot box collapses to a cube and the data
/// aspect ratio is normalized to the data extents relative to the
/// tightest axis. With exactly one auto, that one is derived from the
/// other and the limits. With both manual the data limits themselves
/// are grown symmetrically about their centers to satisfy the ratios.
pub fn update_aspect_ratios(props: &mut PropertySet) -> Result<(), GraphicsError> {
    let xlim = limits(props, "xlim")?;
    let ylim = limits(props, "ylim")?;
    let zlim = limits(props, "zlim")?;
    let ext = [
        (xlim[1] - xlim[0]).abs().max(f64::EPSILON),
        (ylim[1] - ylim[0]).abs().max(f64::EPSILON),
        (zlim[1] - zlim[0]).abs().max(f64::EPSILON),
    ];

    let dar_auto = props.is("dataaspectratiomode", "auto");
    let pba_auto = props.is("plotboxaspectratiomode", "auto");

    if dar_auto && pba_auto {
        store_vec3(props, "plotboxaspectratio", DVec3::new(1.0, 1.0, 1.0))?;
        let tight = ext[0].min(ext[1]).min(ext[2]);
        store_vec3(
            props,
            "dataaspectratio",
            DVec3::new(ext[0] / tight, ext[1] / tight, ext[2] / tight),
        )?;
    } else if pba_auto {
        let dar = vec3(props, "dataaspectratio")?;
        let norm = [ext[0] / dar.x, ext[1] / dar.y, ext[2] / dar.z];
        let tight = norm[0].min(norm[1]).min(norm[2]);
        store_vec3(
            props,
            "plotboxaspectratio",
            DVec3::new(norm[0] / tight, norm[1] / tight, norm[2] / tight),
        )?;
    } else if dar_auto {
        let pba = vec3(props, "plotboxaspectratio")?;
        let norm = [ext[0] / pba.x, ext[1] / pba.y, ext[2] / pba.z];
        let tight = norm[0].min(norm[1]).min(norm[2]);
        store_vec3(
            props,
            "dataaspectratio",
            DVec3::new(norm[0] / tight, norm[1] / tight, norm[2] / tight),
        )?;
    } else {
        // Both manual: grow the limits, never the ratios.
        let dar = vec3(props, "dataaspectratio")?;
        let pba = vec3(props, "plotboxaspectratio")?;
        let want = [dar.x * pba.x, dar.y * pba.y, dar.z * pba.z];
        let norm = [ext[0] / want[0], ext[1] / want[1], ext[2] / want[2]];
        let base = norm[0].max(norm[1]).max(norm[2]);
        // The required extent along axis i is base * want[i]; limits
        // grow symmetrically about their centers.
        for (i, (name, lim)) in [("xlim", xlim), ("ylim", ylim), ("zlim", zlim)]
            .into_iter()
            .enumerate()
        {
            let target = base * want[i];
            if target > ext[i] {
                let center = (lim[0] + lim[1]) / 2.0;
                store_pair(props, name, [center - target / 2.0, center + target / 2.0])?;
            }
        }
    }

    Ok(())
}

fn position_rect(props: &PropertySet) -> Result<[f64; 4], GraphicsError> {
    let name = if props.is("activepositionproperty", "position") {
        "position"
    } else {
        "outerposition"
    };
    let use_name = if props.has_property(name) { name } else { "position" };
    match props.get(use_name)? {
        Value::Matrix(m) if m.numel() == 4 => Ok([m.data[0], m.data[1], m.data[2], m.data[3]]),
        _ => Err(GraphicsError::invalid_value(
            use_name,
            "expected a 1x4 vector",
        )),
    }
}

fn point(m: DMat4, p: DVec3) -> DVec3 {
    let v = m * DVec4::new(p.x, p.y, p.z, 1.0);
    DVec3::new(v.x, v.y, v.z)
}

fn store_vec3(props: &mut PropertySet, name: &str, v: DVec3) -> Result<(), GraphicsError> {
    let value = Value::Matrix(Matrix::row_vector(vec![v.x, v.y, v.z]));
    if let Some(prop) = props.property_mut(name) {
        prop.set_value(&value)?;
    }
    Ok(())
}

fn store_pair(props: &mut PropertySet, name: &str, v: [f64; 2]) -> Result<(), GraphicsError> {
    let value = Value::Matrix(Matrix::row_vector(v.to_vec()));
    if let Some(prop) = props.property_mut(name) {
        prop.set_value(&value)?;
    }
    Ok(())
}

fn set_double(props: &mut PropertySet, name: &str, v: f64) -> Result<(), GraphicsError> {
    if let Some(prop) = props.property_mut(name) {
        prop.set_value(&Value::Num(v))?;
    }
    Ok(())
}
