//! Factory property tables for each object kind.
//!
//! `base_properties` builds the full, factory-default property set of a
//! freshly created object: the properties every kind shares, then the
//! kind-specific table layered on top. Property names are the lowercase
//! canonical spellings the resolver matches against.

use once_cell::sync::Lazy;

use matviz_values::{Matrix, Value};

use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::object::ObjectKind;
use crate::properties::PropertySet;
use crate::property::{ColorState, Property, ShapeConstraint};

fn row(data: &[f64]) -> Matrix {
    Matrix::row_vector(data.to_vec())
}

fn row1x2() -> Vec<ShapeConstraint> {
    vec![ShapeConstraint(vec![Some(1), Some(2)])]
}

fn row1x3() -> Vec<ShapeConstraint> {
    vec![ShapeConstraint(vec![Some(1), Some(3)])]
}

fn row1x4() -> Vec<ShapeConstraint> {
    vec![ShapeConstraint(vec![Some(1), Some(4)])]
}

/// Build the complete factory property table for one object.
pub fn base_properties(
    kind: ObjectKind,
    handle: Handle,
    parent: Handle,
) -> Result<PropertySet, GraphicsError> {
    let mut props = PropertySet::new(kind, handle, parent);
    common_properties(&mut props)?;
    match kind {
        ObjectKind::Root => root_properties(&mut props)?,
        ObjectKind::Figure => figure_properties(&mut props)?,
        ObjectKind::Axes => axes_properties(&mut props)?,
        ObjectKind::Line => line_properties(&mut props)?,
        ObjectKind::Text => text_properties(&mut props)?,
        ObjectKind::Image => image_properties(&mut props)?,
        ObjectKind::Patch => patch_properties(&mut props)?,
        ObjectKind::Surface => surface_properties(&mut props)?,
        ObjectKind::Hggroup => hggroup_properties(&mut props)?,
        ObjectKind::Uimenu => uimenu_properties(&mut props)?,
    }
    Ok(props)
}

/// Properties shared by every graphics object.
fn common_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::radio("busyaction", "{queue}|cancel")?);
    p.insert(Property::callback("buttondownfcn"));
    p.insert(Property::boolean("clipping", true));
    p.insert(Property::callback("createfcn"));
    p.insert(Property::callback("deletefcn"));
    p.insert(Property::radio("handlevisibility", "{on}|callback|off")?);
    p.insert(Property::boolean("hittest", true));
    p.insert(Property::radio("interruptible", "{on}|off")?);
    p.insert(Property::boolean("selected", false));
    p.insert(Property::boolean("selectionhighlight", true));
    p.insert(Property::string("tag", ""));
    p.insert(Property::any("userdata", Value::empty()));
    p.insert(Property::boolean("visible", true));
    Ok(())
}

fn root_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::handle("callbackobject", Handle::unset()).hidden());
    p.insert(Property::handle("currentfigure", Handle::unset()));
    p.insert(Property::double("screendepth", 24.0));
    p.insert(Property::double("screenpixelsperinch", 72.0));
    p.insert(Property::data_constrained(
        "screensize",
        row(&[1.0, 1.0, 1920.0, 1080.0]),
        row1x4(),
    ));
    p.insert(Property::boolean("showhiddenhandles", false));
    p.insert(Property::radio(
        "units",
        "{pixels}|normalized|inches|centimeters|points",
    )?);
    Ok(())
}

fn figure_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::callback("closerequestfcn"));
    if let Some(prop) = p.property_mut("closerequestfcn") {
        // Default close behavior is the library function closereq.
        let _ = prop.set_value(&Value::from("closereq"));
    }
    p.insert(Property::color_rgb("color", [1.0, 1.0, 1.0]));
    p.insert(Property::data("colormap", DEFAULT_COLORMAP.clone()));
    p.insert(Property::handle("currentaxes", Handle::unset()));
    p.insert(Property::handle("currentobject", Handle::unset()).hidden());
    p.insert(Property::data_constrained(
        "currentpoint",
        row(&[0.0, 0.0]),
        row1x2(),
    ));
    p.insert(Property::boolean("integerhandle", true));
    p.insert(Property::callback("keypressfcn"));
    p.insert(Property::callback("keyreleasefcn"));
    p.insert(Property::radio("menubar", "{figure}|none")?);
    p.insert(Property::string("name", ""));
    p.insert(Property::radio("nextplot", "{add}|new|replacechildren|replace")?);
    p.insert(Property::boolean("numbertitle", true));
    p.insert(Property::radio(
        "paperorientation",
        "{portrait}|landscape",
    )?);
    p.insert(Property::radio(
        "paperunits",
        "{inches}|centimeters|normalized|points",
    )?);
    p.insert(Property::data_constrained(
        "position",
        row(&[300.0, 200.0, 560.0, 420.0]),
        row1x4(),
    ));
    p.insert(Property::boolean("resize", true));
    p.insert(Property::callback("resizefcn"));
    p.insert(Property::radio(
        "units",
        "{pixels}|normalized|inches|centimeters|points|characters",
    )?);
    p.insert(Property::callback("windowbuttondownfcn"));
    p.insert(Property::callback("windowbuttonmotionfcn"));
    p.insert(Property::callback("windowbuttonupfcn"));
    p.insert(Property::string("__graphics_toolkit__", "").hidden());
    Ok(())
}

fn axes_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::radio(
        "activepositionproperty",
        "{outerposition}|position",
    )?);
    p.insert(Property::data_constrained("alim", row(&[0.0, 1.0]), row1x2()));
    p.insert(Property::radio("alimmode", "{auto}|manual")?);
    p.insert(Property::boolean("box", true));
    p.insert(Property::data_constrained(
        "cameraposition",
        row(&[0.5, 0.5, 9.16025403784439]),
        row1x3(),
    ));
    p.insert(Property::radio("camerapositionmode", "{auto}|manual")?);
    p.insert(Property::data_constrained(
        "cameratarget",
        row(&[0.5, 0.5, 0.5]),
        row1x3(),
    ));
    p.insert(Property::radio("cameratargetmode", "{auto}|manual")?);
    p.insert(Property::data_constrained(
        "cameraupvector",
        row(&[0.0, 1.0, 0.0]),
        row1x3(),
    ));
    p.insert(Property::radio("cameraupvectormode", "{auto}|manual")?);
    p.insert(Property::double("cameraviewangle", 6.608610360586653));
    p.insert(Property::radio("cameraviewanglemode", "{auto}|manual")?);
    p.insert(Property::data_constrained("clim", row(&[0.0, 1.0]), row1x2()));
    p.insert(Property::radio("climmode", "{auto}|manual")?);
    p.insert(Property::color(
        "color",
        "none",
        ColorState::Rgb(crate::property::ColorValues { rgb: [1.0, 1.0, 1.0] }),
    )?);
    p.insert(Property::data("colororder", DEFAULT_COLOR_ORDER.clone()));
    p.insert(Property::data_constrained(
        "dataaspectratio",
        row(&[1.0, 1.0, 1.0]),
        row1x3(),
    ));
    p.insert(Property::radio("dataaspectratiomode", "{auto}|manual")?);
    p.insert(Property::double("fontsize", 10.0));
    p.insert(Property::radio("gridlinestyle", "-|--|{:}|-.|none")?);
    p.insert(Property::radio("layer", "{bottom}|top")?);
    p.insert(Property::double("linewidth", 0.5));
    p.insert(Property::radio(
        "nextplot",
        "add|{replace}|replacechildren",
    )?);
    p.insert(Property::data_constrained(
        "outerposition",
        row(&[0.0, 0.0, 1.0, 1.0]),
        row1x4(),
    ));
    p.insert(Property::data_constrained(
        "plotboxaspectratio",
        row(&[1.0, 1.0, 1.0]),
        row1x3(),
    ));
    p.insert(Property::radio("plotboxaspectratiomode", "{auto}|manual")?);
    p.insert(Property::data_constrained(
        "position",
        row(&[0.13, 0.11, 0.775, 0.815]),
        row1x4(),
    ));
    p.insert(Property::radio("tickdir", "{in}|out")?);
    p.insert(Property::handle("title", Handle::unset()).hidden());
    p.insert(Property::radio(
        "units",
        "{normalized}|pixels|inches|centimeters|points|characters",
    )?);
    p.insert(Property::data_constrained("view", row(&[0.0, 90.0]), row1x2()));

    for axis in ["x", "y", "z"] {
        p.insert(Property::color_rgb(&format!("{axis}color"), [0.0, 0.0, 0.0]));
        p.insert(Property::radio(&format!("{axis}dir"), "{normal}|reverse")?);
        p.insert(Property::boolean(&format!("{axis}grid"), false));
        p.insert(Property::handle(&format!("{axis}label"), Handle::unset()).hidden());
        p.insert(Property::data_constrained(
            &format!("{axis}lim"),
            row(&[0.0, 1.0]),
            row1x2(),
        ));
        p.insert(Property::radio(&format!("{axis}limmode"), "{auto}|manual")?);
        p.insert(Property::radio(&format!("{axis}scale"), "{linear}|log")?);
        p.insert(Property::data(&format!("{axis}tick"), Matrix::empty()));
        p.insert(Property::radio(&format!("{axis}tickmode"), "{auto}|manual")?);
        p.insert(Property::any(&format!("{axis}ticklabel"), Value::empty()));
        p.insert(Property::radio(
            &format!("{axis}ticklabelmode"),
            "{auto}|manual",
        )?);
    }
    Ok(())
}

/// Hidden flags opting an object's data into the enclosing axes'
/// auto-limit computation.
fn liminclude_flags(p: &mut PropertySet, axes: &[&str], default_on: bool) {
    for axis in axes {
        p.insert(Property::boolean(&format!("{axis}liminclude"), default_on).hidden());
    }
}

fn line_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::color_rgb("color", [0.0, 0.0, 0.0]));
    p.insert(Property::string("displayname", ""));
    p.insert(Property::radio("linestyle", "{-}|--|:|-.|none")?);
    p.insert(Property::double("linewidth", 0.5));
    p.insert(Property::radio(
        "marker",
        "{none}|+|o|*|.|x|s|square|d|diamond|^|v|>|<|p|pentagram|h|hexagram",
    )?);
    p.insert(Property::color(
        "markeredgecolor",
        "{auto}|none",
        ColorState::Radio("auto".into()),
    )?);
    p.insert(Property::color(
        "markerfacecolor",
        "auto|{none}",
        ColorState::Radio("none".into()),
    )?);
    p.insert(Property::double("markersize", 6.0));
    p.insert(Property::data("xdata", row(&[0.0, 1.0])));
    p.insert(Property::data("ydata", row(&[0.0, 1.0])));
    p.insert(Property::data("zdata", Matrix::empty()));
    liminclude_flags(p, &["x", "y", "z"], true);
    Ok(())
}

fn text_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::color_rgb("color", [0.0, 0.0, 0.0]));
    p.insert(Property::boolean("editing", false));
    p.insert(Property::radio("fontangle", "{normal}|italic|oblique")?);
    p.insert(Property::string("fontname", "*"));
    p.insert(Property::double("fontsize", 10.0));
    p.insert(Property::radio(
        "fontunits",
        "{points}|normalized|inches|centimeters|pixels",
    )?);
    p.insert(Property::radio("fontweight", "{normal}|bold|demi|light")?);
    p.insert(Property::radio(
        "horizontalalignment",
        "{left}|center|right",
    )?);
    p.insert(Property::radio("interpreter", "{tex}|none|latex")?);
    p.insert(Property::data_constrained(
        "position",
        row(&[0.0, 0.0, 0.0]),
        row1x3(),
    ));
    p.insert(Property::double("rotation", 0.0));
    p.insert(Property::any("string", Value::from("")));
    p.insert(Property::radio(
        "units",
        "{data}|pixels|normalized|inches|centimeters|points",
    )?);
    p.insert(Property::radio(
        "verticalalignment",
        "top|cap|{middle}|baseline|bottom",
    )?);
    liminclude_flags(p, &["x", "y", "z"], false);
    Ok(())
}

fn image_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::data("alphadata", Matrix::scalar(1.0)));
    p.insert(Property::data("cdata", Matrix::empty()));
    p.insert(Property::radio("cdatamapping", "scaled|{direct}")?);
    p.insert(Property::data("xdata", Matrix::empty()));
    p.insert(Property::data("ydata", Matrix::empty()));
    liminclude_flags(p, &["x", "y", "c", "a"], true);
    Ok(())
}

fn patch_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::data("alphadata", Matrix::scalar(1.0)));
    p.insert(Property::data("cdata", Matrix::empty()));
    p.insert(Property::radio("cdatamapping", "{scaled}|direct")?);
    p.insert(Property::color(
        "edgecolor",
        "flat|none|interp",
        ColorState::Rgb(crate::property::ColorValues { rgb: [0.0, 0.0, 0.0] }),
    )?);
    p.insert(Property::color(
        "facecolor",
        "{flat}|none|interp",
        ColorState::Radio("flat".into()),
    )?);
    p.insert(Property::radio("linestyle", "{-}|--|:|-.|none")?);
    p.insert(Property::double("linewidth", 0.5));
    p.insert(Property::data("xdata", Matrix::empty()));
    p.insert(Property::data("ydata", Matrix::empty()));
    p.insert(Property::data("zdata", Matrix::empty()));
    liminclude_flags(p, &["x", "y", "z", "c", "a"], true);
    Ok(())
}

fn surface_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::data("alphadata", Matrix::scalar(1.0)));
    p.insert(Property::data("cdata", Matrix::empty()));
    p.insert(Property::radio("cdatamapping", "{scaled}|direct")?);
    p.insert(Property::color(
        "edgecolor",
        "flat|none|interp",
        ColorState::Rgb(crate::property::ColorValues { rgb: [0.0, 0.0, 0.0] }),
    )?);
    p.insert(Property::color(
        "facecolor",
        "{flat}|none|interp|texturemap",
        ColorState::Radio("flat".into()),
    )?);
    p.insert(Property::radio("linestyle", "{-}|--|:|-.|none")?);
    p.insert(Property::double("linewidth", 0.5));
    p.insert(Property::radio("meshstyle", "{both}|row|column")?);
    p.insert(Property::data("xdata", Matrix::empty()));
    p.insert(Property::data("ydata", Matrix::empty()));
    p.insert(Property::data("zdata", Matrix::empty()));
    liminclude_flags(p, &["x", "y", "z", "c", "a"], true);
    Ok(())
}

fn hggroup_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::string("displayname", ""));
    liminclude_flags(p, &["x", "y", "z", "c", "a"], true);
    Ok(())
}

fn uimenu_properties(p: &mut PropertySet) -> Result<(), GraphicsError> {
    p.insert(Property::string("accelerator", ""));
    p.insert(Property::callback("callback"));
    p.insert(Property::boolean("checked", false));
    p.insert(Property::boolean("enable", true));
    p.insert(Property::string("label", ""));
    p.insert(Property::double("position", 0.0));
    p.insert(Property::boolean("separator", false));
    Ok(())
}

static DEFAULT_COLORMAP: Lazy<Matrix> = Lazy::new(|| jet_colormap(64));
static DEFAULT_COLOR_ORDER: Lazy<Matrix> = Lazy::new(color_order);

/// The classic jet colormap, `n` rows of RGB.
pub fn jet_colormap(n: usize) -> Matrix {
    let mut m = Matrix::zeros(n, 3);
    for i in 0..n {
        let x = if n > 1 {
            i as f64 / (n - 1) as f64
        } else {
            0.0
        };
        let channel = |center: f64| (1.5 - 4.0 * (x - center).abs()).clamp(0.0, 1.0);
        m.data[i] = channel(0.75);
        m.data[i + n] = channel(0.5);
        m.data[i + 2 * n] = channel(0.25);
    }
    m
}

/// Default line color rotation, one color per row.
fn color_order() -> Matrix {
    let rows = [
        [0.0, 0.0, 1.0],
        [0.0, 0.5, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.75, 0.75],
        [0.75, 0.0, 0.75],
        [0.75, 0.75, 0.0],
        [0.25, 0.25, 0.25],
    ];
    let n = rows.len();
    let mut m = Matrix::zeros(n, 3);
    for (i, rgb) in rows.iter().enumerate() {
        for (j, c) in rgb.iter().enumerate() {
            m.data[i + j * n] = *c;
        }
    }
    m
}
