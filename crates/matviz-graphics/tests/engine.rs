//! End-to-end scenarios exercising the public engine surface.

use matviz_graphics::{
    Callback, GraphicsContext, GraphicsError, Handle, ObjectKind, RecordingToolkit,
};
use matviz_values::{Matrix, Value};

fn scene(ctx: &mut GraphicsContext) -> (Handle, Handle, Handle) {
    let fig = ctx
        .add_object(ObjectKind::Figure, Handle::ROOT, false)
        .unwrap();
    let ax = ctx.add_object(ObjectKind::Axes, fig, false).unwrap();
    let line = ctx.add_object(ObjectKind::Line, ax, false).unwrap();
    (fig, ax, line)
}

#[test]
fn handles_stay_unique_across_many_reuse_cycles() {
    let mut ctx = GraphicsContext::new();
    // Deterministic, strictly increasing fractions: reuse of an
    // integer part must still never reproduce a previous handle.
    let mut tick = 0u32;
    ctx.set_fraction_source(Box::new(move || {
        tick += 1;
        f64::from(tick) / 1024.0
    }));

    let fig = ctx
        .add_object(ObjectKind::Figure, Handle::ROOT, false)
        .unwrap();
    let mut seen = Vec::new();
    for _ in 0..50 {
        let line = ctx.add_object(ObjectKind::Line, fig, false).unwrap();
        assert!(
            !seen.contains(&line),
            "handle {line} reused a previous value"
        );
        seen.push(line);
        ctx.delete(line).unwrap();
    }

    // Live handles are pairwise distinct too.
    let a = ctx.add_object(ObjectKind::Line, fig, false).unwrap();
    let b = ctx.add_object(ObjectKind::Line, fig, false).unwrap();
    assert_ne!(a, b);
}

#[test]
fn line_data_drives_axes_auto_limits() {
    let mut ctx = GraphicsContext::new();
    let (_fig, ax, line) = scene(&mut ctx);

    assert_eq!(ctx.get(ax, "xlimmode").unwrap(), Value::from("auto"));
    ctx.set(
        line,
        "xdata",
        &Value::Matrix(Matrix::row_vector(vec![1.0, 5.0, 3.0])),
    )
    .unwrap();

    // get_axis_limits(1, 5, _, linear) with calc_tick_sep(1, 5) == 1.
    assert_eq!(
        ctx.get(ax, "xlim").unwrap(),
        Value::Matrix(Matrix::row_vector(vec![1.0, 5.0]))
    );
    assert_eq!(ctx.get(ax, "xlimmode").unwrap(), Value::from("auto"));
}

#[test]
fn log_scale_limits_round_to_powers_of_ten() {
    let mut ctx = GraphicsContext::new();
    let (_fig, ax, line) = scene(&mut ctx);
    ctx.set(ax, "xscale", &Value::from("log")).unwrap();
    ctx.set(
        line,
        "xdata",
        &Value::Matrix(Matrix::row_vector(vec![2.0, 800.0])),
    )
    .unwrap();
    assert_eq!(
        ctx.get(ax, "xlim").unwrap(),
        Value::Matrix(Matrix::row_vector(vec![1.0, 1000.0]))
    );
}

#[test]
fn modified_flag_round_trips_and_propagates() {
    let mut ctx = GraphicsContext::new();
    let (fig, _ax, line) = scene(&mut ctx);

    ctx.set(fig, "__modified__", &Value::from("off")).unwrap();
    ctx.set(line, "__modified__", &Value::from("off")).unwrap();
    assert_eq!(ctx.get(fig, "__modified__").unwrap(), Value::from("off"));

    // A child change dirties every ancestor.
    ctx.set(line, "linewidth", &Value::Num(3.0)).unwrap();
    assert_eq!(ctx.get(line, "__modified__").unwrap(), Value::from("on"));
    assert_eq!(ctx.get(fig, "__modified__").unwrap(), Value::from("on"));
    assert_eq!(
        ctx.get(Handle::ROOT, "__modified__").unwrap(),
        Value::from("on")
    );
}

#[test]
fn rejected_sets_leave_prior_values() {
    let mut ctx = GraphicsContext::new();
    let (_fig, _ax, line) = scene(&mut ctx);

    ctx.set(line, "linestyle", &Value::from("--")).unwrap();
    let err = ctx.set(line, "linestyle", &Value::from("dotted")).unwrap_err();
    assert!(matches!(err, GraphicsError::InvalidPropertyValue { .. }));
    assert_eq!(ctx.get(line, "linestyle").unwrap(), Value::from("--"));
}

#[test]
fn abbreviations_resolve_against_the_full_table() {
    let mut ctx = GraphicsContext::new();
    let (_fig, _ax, line) = scene(&mut ctx);

    ctx.set(line, "LineW", &Value::Num(2.0)).unwrap();
    assert_eq!(ctx.get(line, "linewidth").unwrap(), Value::Num(2.0));
    assert!(matches!(
        ctx.get(line, "line"),
        Err(GraphicsError::AmbiguousProperty { .. })
    ));
}

#[test]
fn events_posted_from_a_callback_run_in_the_same_drain() {
    fn enqueue_more(
        ctx: &mut GraphicsContext,
        h: Handle,
        _data: &Value,
        extra: &[Value],
    ) -> Result<(), GraphicsError> {
        if let Some(v) = extra.first().and_then(Value::as_scalar) {
            ctx.post_set_event(h, "userdata", Value::Num(v));
        }
        Ok(())
    }

    let mut ctx = GraphicsContext::new();
    let (fig, _ax, _line) = scene(&mut ctx);
    ctx.post_function_event(
        |ctx, data| {
            let fig = Handle::new(data.as_scalar().unwrap_or(f64::NAN));
            ctx.invoke_callback(
                fig,
                &Callback::Bound(enqueue_more, vec![Value::Num(7.0)]),
                &Value::empty(),
            )
        },
        Value::Num(fig.value()),
    );

    ctx.process_events().unwrap();
    assert_eq!(ctx.get(fig, "userdata").unwrap(), Value::Num(7.0));
    assert_eq!(ctx.pending_events(), 0);
}

#[test]
fn drawnow_style_flush_redraws_each_modified_figure_once() {
    let toolkit = RecordingToolkit::new();
    let calls = toolkit.calls();
    let mut ctx = GraphicsContext::with_toolkit(Box::new(toolkit));

    let f1 = ctx
        .add_object(ObjectKind::Figure, Handle::ROOT, false)
        .unwrap();
    let f2 = ctx
        .add_object(ObjectKind::Figure, Handle::ROOT, false)
        .unwrap();
    ctx.set(f2, "visible", &Value::from("off")).unwrap();
    ctx.set(f1, "name", &Value::from("a")).unwrap();

    ctx.redraw_figures().unwrap();
    let redraws: Vec<Handle> = calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            matviz_graphics::toolkit::ToolkitCall::RedrawFigure(h) => Some(*h),
            _ => None,
        })
        .collect();
    // Only the visible figure is redrawn.
    assert_eq!(redraws, vec![f1]);
}

#[test]
fn dynamic_properties_join_generic_enumeration() {
    let mut ctx = GraphicsContext::new();
    let (fig, _ax, _line) = scene(&mut ctx);

    ctx.add_property(fig, matviz_graphics::Property::any("mymeta", Value::empty()))
        .unwrap();
    ctx.set(fig, "mymeta", &Value::Num(12.0)).unwrap();
    assert_eq!(ctx.get(fig, "mymeta").unwrap(), Value::Num(12.0));

    let all = ctx.get_all(fig, false).unwrap();
    assert_eq!(all.get("mymeta"), Some(&Value::Num(12.0)));
    assert_eq!(all.get("type"), Some(&Value::from("figure")));
}

#[test]
fn deleting_an_object_invalidates_its_handle_only() {
    let mut ctx = GraphicsContext::new();
    let (fig, ax, line) = scene(&mut ctx);

    ctx.delete(line).unwrap();
    assert!(!ctx.is_handle(line.value()));
    assert!(ctx.is_handle(ax.value()));
    assert!(ctx.is_handle(fig.value()));
    assert!(matches!(
        ctx.get(line, "linewidth"),
        Err(GraphicsError::InvalidHandle(_))
    ));
}
