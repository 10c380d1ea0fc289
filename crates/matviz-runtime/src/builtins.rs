//! The builtin functions themselves.
//!
//! Every builtin follows the same error convention: failures are
//! reported as `"name: message"` strings for the interpreter to turn
//! into user-visible errors. Malformed arguments are usage errors, not
//! panics.

use matviz_graphics::toolkit::available_toolkits;
use matviz_graphics::{Callback, GraphicsContext, Handle, ObjectKind, Property};
use matviz_values::{BuiltinFunction, CellArray, Matrix, Value};

use crate::with_context;

fn fail(name: &str, e: impl std::fmt::Display) -> String {
    format!("{name}: {e}")
}

fn usage(name: &str, msg: &str) -> String {
    format!("{name}: {msg}")
}

/// Extract one or more handle values from a numeric argument.
fn handles_arg(name: &str, value: &Value) -> Result<Vec<Handle>, String> {
    match value.as_row_vector() {
        Some(v) if !v.is_empty() => Ok(v.into_iter().map(Handle::new).collect()),
        _ => Err(usage(name, "expected a graphics handle or handle vector")),
    }
}

fn handle_arg(name: &str, value: &Value) -> Result<Handle, String> {
    match value.as_scalar() {
        Some(v) => Ok(Handle::new(v)),
        None => Err(usage(name, "expected a graphics handle")),
    }
}

fn str_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| usage(name, "expected a string argument"))
}

fn cell_at(cell: &CellArray, row: usize, col: usize) -> &Value {
    &cell.data[row + col * cell.rows]
}

// ---- predicates and accessors ----

fn ishandle_builtin(args: &[Value]) -> Result<Value, String> {
    let arg = args
        .first()
        .ok_or_else(|| usage("ishandle", "expected one argument"))?;
    let values = match arg.as_row_vector() {
        Some(v) => v,
        None => return Ok(Value::Bool(false)),
    };
    with_context(|ctx| {
        if values.len() == 1 {
            Ok(Value::Bool(ctx.is_handle(values[0])))
        } else {
            let flags: Vec<f64> = values
                .iter()
                .map(|v| if ctx.is_handle(*v) { 1.0 } else { 0.0 })
                .collect();
            Ok(Value::Matrix(Matrix::row_vector(flags)))
        }
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "ishandle",
        summary: "True for valid graphics handles",
        implementation: ishandle_builtin,
    }
}

fn get_builtin(args: &[Value]) -> Result<Value, String> {
    let handles = handles_arg("get", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        let mut results = Vec::with_capacity(handles.len());
        for &h in &handles {
            let v = match args.get(1) {
                None => Value::Struct(ctx.get_all(h, false).map_err(|e| fail("get", e))?),
                Some(name) => {
                    let name = str_arg("get", name)?;
                    ctx.get(h, name).map_err(|e| fail("get", e))?
                }
            };
            results.push(v);
        }
        if results.len() == 1 {
            Ok(results.remove(0))
        } else {
            Ok(Value::Cell(CellArray::row(results)))
        }
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "get",
        summary: "Fetch property values of graphics objects",
        implementation: get_builtin,
    }
}

fn get_all_builtin(args: &[Value]) -> Result<Value, String> {
    let h = handle_arg("__get__", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        ctx.get_all(h, true)
            .map(Value::Struct)
            .map_err(|e| fail("__get__", e))
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__get__",
        summary: "Fetch all properties of an object, hidden ones included",
        implementation: get_all_builtin,
    }
}

// ---- set ----

fn set_builtin(args: &[Value]) -> Result<Value, String> {
    let handles = handles_arg("set", args.first().unwrap_or(&Value::empty()))?;
    let rest = &args[1..];
    with_context(|ctx| {
        for (i, &h) in handles.iter().enumerate() {
            apply_set_args(ctx, h, rest, i, handles.len())?;
        }
        Ok(Value::empty())
    })
}

/// Apply one handle's share of a set invocation: (name, value) pairs, a
/// property struct, or the cellstr-names / cell-values broadcast form.
fn apply_set_args(
    ctx: &mut GraphicsContext,
    h: Handle,
    rest: &[Value],
    index: usize,
    nhandles: usize,
) -> Result<(), String> {
    match rest {
        [Value::Struct(s)] => {
            for (name, value) in s.fields() {
                ctx.set(h, name, value).map_err(|e| fail("set", e))?;
            }
            Ok(())
        }
        [Value::Cell(names), Value::Cell(values)] if names.is_cellstr() => {
            if values.cols != names.data.len() {
                return Err(usage(
                    "set",
                    "number of value columns must match the number of property names",
                ));
            }
            // One value row per handle, or a single row for all.
            let row = if values.rows == nhandles {
                index
            } else if values.rows == 1 {
                0
            } else {
                return Err(usage(
                    "set",
                    "number of value rows must be 1 or match the number of handles",
                ));
            };
            for (col, name) in names.data.iter().enumerate() {
                let name = str_arg("set", name)?;
                ctx.set(h, name, cell_at(values, row, col))
                    .map_err(|e| fail("set", e))?;
            }
            Ok(())
        }
        _ if rest.len() % 2 == 0 && !rest.is_empty() => {
            for pair in rest.chunks(2) {
                let name = str_arg("set", &pair[0])?;
                ctx.set(h, name, &pair[1]).map_err(|e| fail("set", e))?;
            }
            Ok(())
        }
        _ => Err(usage(
            "set",
            "expected property/value pairs, a property struct, or a cellstr/cell pair",
        )),
    }
}

inventory::submit! {
    BuiltinFunction {
        name: "set",
        summary: "Assign property values of graphics objects",
        implementation: set_builtin,
    }
}

// ---- dynamic properties and listeners ----

fn addproperty_builtin(args: &[Value]) -> Result<Value, String> {
    let empty = Value::empty();
    let name = str_arg("addproperty", args.first().unwrap_or(&empty))?;
    let h = handle_arg("addproperty", args.get(1).unwrap_or(&empty))?;
    let kind = str_arg("addproperty", args.get(2).unwrap_or(&empty))?;
    let default = args.get(3);

    let prop = match kind {
        "any" => Property::any(name, default.cloned().unwrap_or_else(Value::empty)),
        "string" => Property::string(name, default.and_then(Value::as_str).unwrap_or("")),
        "double" => Property::double(name, default.and_then(Value::as_scalar).unwrap_or(0.0)),
        "boolean" => Property::boolean(
            name,
            default.and_then(Value::as_scalar).map(|v| v != 0.0).unwrap_or(false),
        ),
        "data" => Property::data(
            name,
            default.and_then(Value::to_matrix).unwrap_or_else(Matrix::empty),
        ),
        "radio" => {
            let descriptor = default
                .and_then(Value::as_str)
                .ok_or_else(|| usage("addproperty", "radio properties need a value descriptor"))?;
            Property::radio(name, descriptor).map_err(|e| fail("addproperty", e))?
        }
        "handle" => Property::handle(name, Handle::unset()),
        other => {
            return Err(usage(
                "addproperty",
                &format!("unknown property type \"{other}\""),
            ))
        }
    };

    with_context(|ctx| ctx.add_property(h, prop).map_err(|e| fail("addproperty", e)))?;
    Ok(Value::empty())
}

inventory::submit! {
    BuiltinFunction {
        name: "addproperty",
        summary: "Add a dynamic property to a graphics object",
        implementation: addproperty_builtin,
    }
}

fn callback_arg(name: &str, value: &Value) -> Result<Callback, String> {
    match Callback::from_value(value).map_err(|e| fail(name, e))? {
        Some(cb) => Ok(cb),
        None => Err(usage(name, "expected a callback")),
    }
}

fn addlistener_builtin(args: &[Value]) -> Result<Value, String> {
    let empty = Value::empty();
    let h = handle_arg("addlistener", args.first().unwrap_or(&empty))?;
    let prop = str_arg("addlistener", args.get(1).unwrap_or(&empty))?;
    let cb = callback_arg("addlistener", args.get(2).unwrap_or(&empty))?;
    with_context(|ctx| {
        ctx.add_listener(h, prop, cb)
            .map_err(|e| fail("addlistener", e))
    })?;
    Ok(Value::empty())
}

inventory::submit! {
    BuiltinFunction {
        name: "addlistener",
        summary: "Register a post-set listener on a property",
        implementation: addlistener_builtin,
    }
}

fn dellistener_builtin(args: &[Value]) -> Result<Value, String> {
    let empty = Value::empty();
    let h = handle_arg("dellistener", args.first().unwrap_or(&empty))?;
    let prop = str_arg("dellistener", args.get(1).unwrap_or(&empty))?;
    let cb = match args.get(2) {
        Some(v) if !v.is_empty() => Some(callback_arg("dellistener", v)?),
        _ => None,
    };
    with_context(|ctx| {
        ctx.delete_listener(h, prop, cb.as_ref())
            .map_err(|e| fail("dellistener", e))
    })?;
    Ok(Value::empty())
}

inventory::submit! {
    BuiltinFunction {
        name: "dellistener",
        summary: "Remove post-set listeners from a property",
        implementation: dellistener_builtin,
    }
}

fn reset_builtin(args: &[Value]) -> Result<Value, String> {
    let handles = handles_arg("reset", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        for h in handles {
            ctx.reset(h).map_err(|e| fail("reset", e))?;
        }
        Ok(Value::empty())
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "reset",
        summary: "Restore factory property values",
        implementation: reset_builtin,
    }
}

// ---- event processing ----

fn drawnow_builtin(args: &[Value]) -> Result<Value, String> {
    match args.first().and_then(Value::as_str) {
        // Print mode: drawnow (term, file, mono, debug_file).
        Some(term) if args.len() >= 2 => {
            let file = str_arg("drawnow", &args[1])?.to_string();
            let mono = args
                .get(2)
                .and_then(Value::as_scalar)
                .map(|v| v != 0.0)
                .unwrap_or(false);
            let debug_file = args
                .get(3)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let term = term.to_string();
            with_context(|ctx| {
                let fig = ctx.current_figure();
                if !fig.ok() {
                    return Err(usage("drawnow", "no figure to print"));
                }
                ctx.print_figure(fig, &term, &file, mono, &debug_file)
                    .map_err(|e| fail("drawnow", e))
            })?;
        }
        _ => {
            with_context(|ctx| ctx.redraw_figures()).map_err(|e| fail("drawnow", e))?;
        }
    }
    Ok(Value::empty())
}

inventory::submit! {
    BuiltinFunction {
        name: "drawnow",
        summary: "Flush pending events and redraw modified figures",
        implementation: drawnow_builtin,
    }
}

// ---- object constructors ----

fn go_figure_builtin(args: &[Value]) -> Result<Value, String> {
    let number = match args.first() {
        None => None,
        Some(v) if v.is_empty() => None,
        Some(v) => Some(
            v.as_scalar()
                .ok_or_else(|| usage("__go_figure__", "expected a figure number"))?,
        ),
    };
    let h = with_context(|ctx| ctx.add_figure(number)).map_err(|e| fail("__go_figure__", e))?;
    let rest = &args[args.len().min(1)..];
    if !rest.is_empty() {
        with_context(|ctx| apply_set_args(ctx, h, rest, 0, 1))?;
    }
    Ok(Value::Num(h.value()))
}

inventory::submit! {
    BuiltinFunction {
        name: "__go_figure__",
        summary: "Create or raise a figure",
        implementation: go_figure_builtin,
    }
}

/// Shared implementation of the `__go_*__` child constructors: parent
/// handle first, then optional property/value pairs.
fn go_object(name: &'static str, kind: ObjectKind, args: &[Value]) -> Result<Value, String> {
    let parent = handle_arg(name, args.first().unwrap_or(&Value::empty()))?;
    let rest = &args[1..];
    with_context(|ctx| {
        let h = ctx
            .add_object(kind, parent, true)
            .map_err(|e| fail(name, e))?;
        if !rest.is_empty() {
            apply_set_args(ctx, h, rest, 0, 1)?;
        }
        // A new axes becomes its figure's current axes.
        if kind == ObjectKind::Axes {
            if let Ok(ObjectKind::Figure) = ctx.kind_of(parent) {
                ctx.set(parent, "currentaxes", &h.as_value())
                    .map_err(|e| fail(name, e))?;
            }
        }
        Ok(Value::Num(h.value()))
    })
}

macro_rules! go_builtin {
    ($fn_name:ident, $builtin_name:literal, $kind:expr, $summary:literal) => {
        fn $fn_name(args: &[Value]) -> Result<Value, String> {
            go_object($builtin_name, $kind, args)
        }

        inventory::submit! {
            BuiltinFunction {
                name: $builtin_name,
                summary: $summary,
                implementation: $fn_name,
            }
        }
    };
}

go_builtin!(go_axes, "__go_axes__", ObjectKind::Axes, "Create an axes object");
go_builtin!(go_line, "__go_line__", ObjectKind::Line, "Create a line object");
go_builtin!(go_text, "__go_text__", ObjectKind::Text, "Create a text object");
go_builtin!(go_image, "__go_image__", ObjectKind::Image, "Create an image object");
go_builtin!(go_patch, "__go_patch__", ObjectKind::Patch, "Create a patch object");
go_builtin!(
    go_surface,
    "__go_surface__",
    ObjectKind::Surface,
    "Create a surface object"
);
go_builtin!(
    go_hggroup,
    "__go_hggroup__",
    ObjectKind::Hggroup,
    "Create a handle-graphics group object"
);
go_builtin!(go_uimenu, "__go_uimenu__", ObjectKind::Uimenu, "Create a uimenu object");

fn go_delete_builtin(args: &[Value]) -> Result<Value, String> {
    let handles = handles_arg("__go_delete__", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        for h in handles {
            // A handle may already be gone as part of an ancestor's
            // teardown earlier in the same vector.
            if !ctx.is_handle(h.value()) {
                log::debug!("__go_delete__: {h} already deleted");
                continue;
            }
            ctx.delete(h).map_err(|e| fail("__go_delete__", e))?;
        }
        Ok(Value::empty())
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__go_delete__",
        summary: "Delete graphics objects and their descendants",
        implementation: go_delete_builtin,
    }
}

fn go_handles_builtin(_args: &[Value]) -> Result<Value, String> {
    with_context(|ctx| {
        let values: Vec<f64> = ctx.handles().iter().map(|h| h.value()).collect();
        Ok(Value::Matrix(Matrix::row_vector(values)))
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__go_handles__",
        summary: "All live graphics handles",
        implementation: go_handles_builtin,
    }
}

fn go_figure_handles_builtin(_args: &[Value]) -> Result<Value, String> {
    with_context(|ctx| {
        let values: Vec<f64> = ctx.figure_handles().iter().map(|h| h.value()).collect();
        Ok(Value::Matrix(Matrix::row_vector(values)))
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__go_figure_handles__",
        summary: "Handles of all open figures",
        implementation: go_figure_handles_builtin,
    }
}

fn go_axes_init_builtin(args: &[Value]) -> Result<Value, String> {
    let h = handle_arg("__go_axes_init__", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| ctx.reset(h).map_err(|e| fail("__go_axes_init__", e)))?;
    Ok(Value::empty())
}

inventory::submit! {
    BuiltinFunction {
        name: "__go_axes_init__",
        summary: "Reinitialize an axes to its default state",
        implementation: go_axes_init_builtin,
    }
}

// ---- geometry queries ----

fn calc_dimensions_builtin(args: &[Value]) -> Result<Value, String> {
    let h = handle_arg("__calc_dimensions__", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        ctx.calc_dimensions(h)
            .map(Value::Num)
            .map_err(|e| fail("__calc_dimensions__", e))
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__calc_dimensions__",
        summary: "Number of dimensions an axes is displaying (2 or 3)",
        implementation: calc_dimensions_builtin,
    }
}

fn image_pixel_size_builtin(args: &[Value]) -> Result<Value, String> {
    let h = handle_arg("__image_pixel_size__", args.first().unwrap_or(&Value::empty()))?;
    with_context(|ctx| {
        ctx.image_pixel_size(h)
            .map(|[x, y]| Value::Matrix(Matrix::row_vector(vec![x, y])))
            .map_err(|e| fail("__image_pixel_size__", e))
    })
}

inventory::submit! {
    BuiltinFunction {
        name: "__image_pixel_size__",
        summary: "Data-space size of one image pixel",
        implementation: image_pixel_size_builtin,
    }
}

fn available_graphics_toolkits_builtin(_args: &[Value]) -> Result<Value, String> {
    let names: Vec<Value> = available_toolkits()
        .into_iter()
        .map(Value::from)
        .collect();
    Ok(Value::Cell(CellArray::row(names)))
}

inventory::submit! {
    BuiltinFunction {
        name: "available_graphics_toolkits",
        summary: "Names of the compiled-in graphics toolkits",
        implementation: available_graphics_toolkits_builtin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matviz_values::lookup_builtin;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let builtin = lookup_builtin(name).unwrap_or_else(|| panic!("missing builtin {name}"));
        (builtin.implementation)(args)
    }

    fn make_scene() -> (f64, f64, f64) {
        let fig = call("__go_figure__", &[]).unwrap().as_scalar().unwrap();
        let ax = call("__go_axes__", &[Value::Num(fig)])
            .unwrap()
            .as_scalar()
            .unwrap();
        let line = call("__go_line__", &[Value::Num(ax)])
            .unwrap()
            .as_scalar()
            .unwrap();
        (fig, ax, line)
    }

    #[test]
    fn every_builtin_is_registered() {
        for name in [
            "ishandle",
            "set",
            "get",
            "__get__",
            "addproperty",
            "addlistener",
            "dellistener",
            "reset",
            "drawnow",
            "__go_figure__",
            "__go_axes__",
            "__go_line__",
            "__go_text__",
            "__go_image__",
            "__go_patch__",
            "__go_surface__",
            "__go_hggroup__",
            "__go_uimenu__",
            "__go_delete__",
            "__go_handles__",
            "__go_figure_handles__",
            "__go_axes_init__",
            "__calc_dimensions__",
            "__image_pixel_size__",
            "available_graphics_toolkits",
        ] {
            assert!(lookup_builtin(name).is_some(), "{name} not registered");
        }
    }

    #[test]
    fn root_is_always_a_handle() {
        assert_eq!(call("ishandle", &[Value::Num(0.0)]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("ishandle", &[Value::Num(12345.5)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call("ishandle", &[Value::from("zero")]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn construct_set_get_delete_round_trip() {
        let (fig, ax, line) = make_scene();

        call(
            "set",
            &[Value::Num(line), Value::from("linewidth"), Value::Num(3.0)],
        )
        .unwrap();
        assert_eq!(
            call("get", &[Value::Num(line), Value::from("linewidth")]).unwrap(),
            Value::Num(3.0)
        );
        assert_eq!(
            call("get", &[Value::Num(ax), Value::from("type")]).unwrap(),
            Value::from("axes")
        );
        assert_eq!(
            call("get", &[Value::Num(fig), Value::from("currentaxes")]).unwrap(),
            Value::Num(ax)
        );

        call("__go_delete__", &[Value::Num(fig)]).unwrap();
        for h in [fig, ax, line] {
            assert_eq!(call("ishandle", &[Value::Num(h)]).unwrap(), Value::Bool(false));
        }
    }

    #[test]
    fn set_accepts_struct_and_broadcast_forms() {
        let (fig, _ax, line) = make_scene();

        let mut s = matviz_values::StructValue::new();
        s.set("linewidth", Value::Num(4.0));
        s.set("linestyle", Value::from(":"));
        call("set", &[Value::Num(line), Value::Struct(s)]).unwrap();
        assert_eq!(
            call("get", &[Value::Num(line), Value::from("linestyle")]).unwrap(),
            Value::from(":")
        );

        let names = CellArray::row(vec![Value::from("tag")]);
        let values = CellArray::row(vec![Value::from("tagged")]);
        call(
            "set",
            &[Value::Num(line), Value::Cell(names), Value::Cell(values)],
        )
        .unwrap();
        assert_eq!(
            call("get", &[Value::Num(line), Value::from("tag")]).unwrap(),
            Value::from("tagged")
        );

        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn get_on_a_handle_vector_returns_a_cell() {
        let (fig, ax, line) = make_scene();
        let result = call(
            "get",
            &[
                Value::Matrix(Matrix::row_vector(vec![ax, line])),
                Value::from("type"),
            ],
        )
        .unwrap();
        match result {
            Value::Cell(c) => {
                assert_eq!(c.data, vec![Value::from("axes"), Value::from("line")]);
            }
            other => panic!("expected cell, got {other:?}"),
        }
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn hidden_properties_only_show_through_dunder_get() {
        let (fig, _ax, line) = make_scene();
        let public = call("get", &[Value::Num(line)]).unwrap();
        let full = call("__get__", &[Value::Num(line)]).unwrap();
        match (public, full) {
            (Value::Struct(public), Value::Struct(full)) => {
                assert!(public.get("xliminclude").is_none());
                assert_eq!(full.get("xliminclude"), Some(&Value::from("on")));
            }
            other => panic!("expected structs, got {other:?}"),
        }
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn listener_builtins_manage_string_callbacks() {
        let (fig, _ax, line) = make_scene();
        call(
            "addlistener",
            &[
                Value::Num(line),
                Value::from("linewidth"),
                Value::from("disp('changed')"),
            ],
        )
        .unwrap();

        // Without an interpreter installed the listener cannot run.
        assert!(call(
            "set",
            &[Value::Num(line), Value::from("linewidth"), Value::Num(9.0)],
        )
        .is_err());

        call(
            "dellistener",
            &[
                Value::Num(line),
                Value::from("linewidth"),
                Value::from("disp('changed')"),
            ],
        )
        .unwrap();
        call(
            "set",
            &[Value::Num(line), Value::from("linewidth"), Value::Num(9.0)],
        )
        .unwrap();
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn addproperty_registers_dynamic_slots() {
        let (fig, _ax, line) = make_scene();
        call(
            "addproperty",
            &[
                Value::from("myratio"),
                Value::Num(line),
                Value::from("double"),
                Value::Num(0.5),
            ],
        )
        .unwrap();
        assert_eq!(
            call("get", &[Value::Num(line), Value::from("myratio")]).unwrap(),
            Value::Num(0.5)
        );
        assert!(call(
            "addproperty",
            &[
                Value::from("linewidth"),
                Value::Num(line),
                Value::from("double"),
            ],
        )
        .is_err());
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn auto_limits_flow_through_the_builtin_surface() {
        let (fig, ax, line) = make_scene();
        call(
            "set",
            &[
                Value::Num(line),
                Value::from("xdata"),
                Value::Matrix(Matrix::row_vector(vec![1.0, 5.0, 3.0])),
            ],
        )
        .unwrap();
        assert_eq!(
            call("get", &[Value::Num(ax), Value::from("xlim")]).unwrap(),
            Value::Matrix(Matrix::row_vector(vec![1.0, 5.0]))
        );
        call("drawnow", &[]).unwrap();
        assert_eq!(
            call("get", &[Value::Num(fig), Value::from("__modified__")]).unwrap(),
            Value::from("off")
        );
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn calc_dimensions_distinguishes_2d_from_3d() {
        let (fig, ax, line) = make_scene();
        assert_eq!(
            call("__calc_dimensions__", &[Value::Num(ax)]).unwrap(),
            Value::Num(2.0)
        );
        call(
            "set",
            &[
                Value::Num(line),
                Value::from("zdata"),
                Value::Matrix(Matrix::row_vector(vec![0.0, 1.0])),
            ],
        )
        .unwrap();
        assert_eq!(
            call("__calc_dimensions__", &[Value::Num(ax)]).unwrap(),
            Value::Num(3.0)
        );
        call("__go_delete__", &[Value::Num(fig)]).unwrap();
    }

    #[test]
    fn toolkit_listing_is_a_cellstr() {
        match call("available_graphics_toolkits", &[]).unwrap() {
            Value::Cell(c) => assert!(c.is_cellstr() && !c.data.is_empty()),
            other => panic!("expected cell, got {other:?}"),
        }
    }
}
