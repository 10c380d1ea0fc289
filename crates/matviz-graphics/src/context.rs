//! The object registry and orchestration layer.
//!
//! A [`GraphicsContext`] owns every live graphics object, the handle
//! allocator, the figure z-order list, the callback nesting stack, and
//! the event queue. All object-graph mutation flows through it: `set`
//! validates and stores a value, then runs listeners, notifies the
//! toolkit, propagates the modified flag to ancestors, and triggers the
//! kind-specific update hooks (camera recomputation, auto limits).
//!
//! The model is single threaded and cooperative. Reentrancy, not
//! parallelism, is the concern: a callback may call back into the
//! context before returning, so recursive guards bracket the limit
//! machinery and the callback stack tracks nesting.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::warn;
use matviz_values::{Matrix, StructValue, Value};

use crate::axes::{self, ZoomEntry};
use crate::callback::{Callback, Interpreter};
use crate::defaults::base_properties;
use crate::error::GraphicsError;
use crate::event::{is_protected_callback, Event, EventQueue};
use crate::handle::Handle;
use crate::limits::{get_axis_limits, DataLimits};
use crate::object::{GraphicsObject, ObjectKind};
use crate::property::{Property, PropertyValue};
use crate::toolkit::{GraphicsToolkit, NullToolkit};
use crate::units;

/// Source of the fractional part of newly allocated handles.
pub type FractionSource = Box<dyn FnMut() -> f64 + Send>;

fn random_fraction() -> f64 {
    let f: f64 = rand::random();
    if f > 0.0 && f < 1.0 {
        f
    } else {
        0.5
    }
}

pub struct GraphicsContext {
    objects: BTreeMap<Handle, GraphicsObject>,
    free_list: BTreeSet<i64>,
    next_handle_int: i64,
    figure_list: VecDeque<Handle>,
    callback_objects: Vec<Handle>,
    events: EventQueue,
    updating_axis_limits: bool,
    updating_aspectratios: bool,
    redrawing: bool,
    toolkit: Box<dyn GraphicsToolkit>,
    interpreter: Option<Box<dyn Interpreter>>,
    fraction_source: FractionSource,
}

impl GraphicsContext {
    pub fn new() -> Self {
        Self::with_toolkit(Box::new(NullToolkit))
    }

    pub fn with_toolkit(toolkit: Box<dyn GraphicsToolkit>) -> Self {
        let mut objects = BTreeMap::new();
        // Table construction only fails on a malformed radio
        // descriptor, and the factory tables are static.
        let root_props = base_properties(ObjectKind::Root, Handle::ROOT, Handle::unset())
            .unwrap_or_else(|e| unreachable!("root property table: {e}"));
        objects.insert(Handle::ROOT, GraphicsObject::new(root_props));

        GraphicsContext {
            objects,
            free_list: BTreeSet::new(),
            next_handle_int: 0,
            figure_list: VecDeque::new(),
            callback_objects: Vec::new(),
            events: EventQueue::new(),
            updating_axis_limits: false,
            updating_aspectratios: false,
            redrawing: false,
            toolkit,
            interpreter: None,
            fraction_source: Box::new(random_fraction),
        }
    }

    pub fn set_toolkit(&mut self, toolkit: Box<dyn GraphicsToolkit>) {
        self.toolkit = toolkit;
    }

    pub fn set_interpreter(&mut self, interpreter: Box<dyn Interpreter>) {
        self.interpreter = Some(interpreter);
    }

    /// Replace the fractional-part generator; deterministic sources
    /// make handle allocation reproducible in tests.
    pub fn set_fraction_source(&mut self, source: FractionSource) {
        self.fraction_source = source;
    }

    // ---- handle registry ----

    pub fn is_handle(&self, value: f64) -> bool {
        !value.is_nan() && self.objects.contains_key(&Handle::new(value))
    }

    pub fn object(&self, handle: Handle) -> Result<&GraphicsObject, GraphicsError> {
        self.objects
            .get(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.value()))
    }

    fn object_mut(&mut self, handle: Handle) -> Result<&mut GraphicsObject, GraphicsError> {
        self.objects
            .get_mut(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.value()))
    }

    pub fn kind_of(&self, handle: Handle) -> Result<ObjectKind, GraphicsError> {
        Ok(self.object(handle)?.kind())
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.objects.keys().copied().collect()
    }

    pub fn figure_handles(&self) -> Vec<Handle> {
        self.figure_list.iter().copied().collect()
    }

    /// Allocate a handle value for `kind`. Figures get the smallest
    /// unused positive integer; everything else draws a negative
    /// integer part from the free list (or a fresh one) and a fresh
    /// fractional part.
    fn get_handle(&mut self, kind: ObjectKind) -> Handle {
        if kind == ObjectKind::Figure {
            let mut n = 1.0;
            while self.objects.contains_key(&Handle::new(n)) {
                n += 1.0;
            }
            return Handle::new(n);
        }

        let ip = if let Some(&ip) = self.free_list.iter().next() {
            self.free_list.remove(&ip);
            ip
        } else {
            self.next_handle_int -= 1;
            self.next_handle_int
        };
        Handle::new(ip as f64 - (self.fraction_source)())
    }

    // ---- creation / destruction ----

    /// Create an object of `kind` under `parent`: allocate a handle,
    /// install the factory property table, adopt into the parent's
    /// child list, notify the toolkit, and (optionally) run the
    /// object's createfcn.
    pub fn add_object(
        &mut self,
        kind: ObjectKind,
        parent: Handle,
        run_createfcn: bool,
    ) -> Result<Handle, GraphicsError> {
        if kind == ObjectKind::Root {
            return Err(GraphicsError::InvalidConstructorArgs(
                "the root object cannot be created".to_string(),
            ));
        }
        {
            let pobj = self.object(parent)?;
            if pobj.properties.is_beingdeleted() {
                return Err(GraphicsError::BeingDeleted(parent.value()));
            }
        }

        let handle = self.get_handle(kind);
        let props = base_properties(kind, handle, parent)?;
        self.objects.insert(handle, GraphicsObject::new(props));
        self.object_mut(parent)?.properties.adopt(handle);
        self.apply_inherited_defaults(handle, kind)?;
        self.mark_modified(handle);
        self.toolkit.initialize(handle);

        if kind == ObjectKind::Figure {
            self.push_figure(handle);
        }
        if kind == ObjectKind::Axes {
            self.init_axes(handle)?;
        }

        if run_createfcn {
            if let Err(e) = self.execute_callback(handle, "createfcn", &Value::empty()) {
                warn!("createfcn for {handle} failed: {e}");
            }
        }

        Ok(handle)
    }

    /// Create (or raise) a figure. With a number, an existing figure
    /// with that handle is made current instead of creating a new one;
    /// a free number is honored as the new figure's handle.
    pub fn add_figure(&mut self, number: Option<f64>) -> Result<Handle, GraphicsError> {
        let number = match number {
            None => return self.add_object(ObjectKind::Figure, Handle::ROOT, true),
            Some(n) => n,
        };
        if number <= 0.0 || number.fract() != 0.0 {
            return Err(GraphicsError::InvalidConstructorArgs(format!(
                "figure number must be a positive integer (got {number})"
            )));
        }
        let handle = Handle::new(number);
        if let Some(obj) = self.objects.get(&handle) {
            if obj.kind() != ObjectKind::Figure {
                return Err(GraphicsError::InvalidConstructorArgs(format!(
                    "handle {number} exists and is not a figure"
                )));
            }
            self.push_figure(handle);
            return Ok(handle);
        }

        let props = base_properties(ObjectKind::Figure, handle, Handle::ROOT)?;
        self.objects.insert(handle, GraphicsObject::new(props));
        self.object_mut(Handle::ROOT)?.properties.adopt(handle);
        self.apply_inherited_defaults(handle, ObjectKind::Figure)?;
        self.mark_modified(handle);
        self.toolkit.initialize(handle);
        self.push_figure(handle);
        if let Err(e) = self.execute_callback(handle, "createfcn", &Value::empty()) {
            warn!("createfcn for {handle} failed: {e}");
        }
        Ok(handle)
    }

    /// Create the four auto label children of an axes and compute its
    /// initial camera transform.
    fn init_axes(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        for label in ["title", "xlabel", "ylabel", "zlabel"] {
            let text = self.make_label_child(handle)?;
            self.write_property(handle, label, &text.as_value())?;
        }
        self.update_camera(handle)
    }

    fn make_label_child(&mut self, axes: Handle) -> Result<Handle, GraphicsError> {
        let text = self.add_object(ObjectKind::Text, axes, false)?;
        self.write_property(text, "handlevisibility", &Value::from("off"))?;
        Ok(text)
    }

    /// Destroy an object: mark it being-deleted, recursively free its
    /// children (per-child failures do not abort siblings), drop its
    /// listeners, run its deletefcn, notify the toolkit, and erase it.
    /// Figure handles leave the figure list; fractional handles return
    /// their integer part to the free list.
    pub fn free(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        if handle.is_root() {
            return Err(GraphicsError::DeleteRoot);
        }
        let kind = {
            let obj = self.object_mut(handle)?;
            if obj.properties.is_beingdeleted() {
                return Ok(());
            }
            obj.properties.mark_beingdeleted();
            obj.kind()
        };

        let children: Vec<Handle> = self.object(handle)?.properties.children().to_vec();
        for child in children {
            if let Err(e) = self.free(child) {
                warn!("error deleting child {child} of {handle}: {e}");
            }
        }

        // Listener errors during teardown are discarded by clearing
        // the lists before the deletefcn runs.
        if let Ok(obj) = self.object_mut(handle) {
            let names = obj.properties.all_names();
            for name in names {
                if let Some(prop) = obj.properties.property_mut(&name) {
                    prop.delete_listener(None);
                }
            }
        }

        if let Err(e) = self.execute_callback(handle, "deletefcn", &Value::empty()) {
            warn!("deletefcn for {handle} failed: {e}");
        }

        self.toolkit.finalize(handle);
        self.events.discard_for(handle);
        self.objects.remove(&handle);

        if kind == ObjectKind::Figure {
            self.pop_figure(handle);
        } else {
            self.free_list.insert(handle.value().ceil() as i64);
        }
        Ok(())
    }

    /// `free` plus removal from the parent's child list; the surface
    /// used by the delete built-in.
    pub fn delete(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let parent = self.object(handle)?.properties.parent();
        self.free(handle)?;
        if parent.ok() {
            if self.objects.contains_key(&parent) {
                self.remove_child(parent, handle)?;
            }
        }
        Ok(())
    }

    // ---- parent / child maintenance ----

    /// Detach `child` from `parent`'s child list. An axes recreates a
    /// fresh placeholder when one of its four auto labels is removed.
    pub fn remove_child(&mut self, parent: Handle, child: Handle) -> Result<(), GraphicsError> {
        self.object_mut(parent)?.properties.remove_child(child);

        if self.kind_of(parent)? == ObjectKind::Axes
            && !self.object(parent)?.properties.is_beingdeleted()
        {
            for label in ["title", "xlabel", "ylabel", "zlabel"] {
                let current = self.object(parent)?.properties.get(label)?;
                if Handle::new(current.as_scalar().unwrap_or(f64::NAN)) == child {
                    let fresh = self.make_label_child(parent)?;
                    self.write_property(parent, label, &fresh.as_value())?;
                }
            }
        }
        self.mark_modified(parent);
        Ok(())
    }

    fn reparent(&mut self, handle: Handle, new_parent: Handle) -> Result<(), GraphicsError> {
        if handle.is_root() {
            return Err(GraphicsError::InvalidArgument(
                "the root object cannot be reparented".to_string(),
            ));
        }
        self.object(new_parent)?;
        let old_parent = self.object(handle)?.properties.parent();
        if old_parent == new_parent {
            return Ok(());
        }
        if old_parent.ok() && self.objects.contains_key(&old_parent) {
            self.remove_child(old_parent, handle)?;
        }
        self.object_mut(handle)?.properties.set_parent(new_parent);
        self.object_mut(new_parent)?.properties.adopt(handle);
        self.mark_modified(handle);
        Ok(())
    }

    /// Set the dirty flag on `handle` and every ancestor up to the
    /// root.
    fn mark_modified(&mut self, handle: Handle) {
        let mut current = handle;
        loop {
            let parent = match self.objects.get_mut(&current) {
                Some(obj) => {
                    obj.properties.set_modified(true);
                    obj.properties.parent()
                }
                None => break,
            };
            if current.is_root() || !parent.ok() {
                break;
            }
            current = parent;
        }
    }

    // ---- figure list ----

    fn push_figure(&mut self, figure: Handle) {
        self.figure_list.retain(|f| *f != figure);
        self.figure_list.push_front(figure);
        self.write_root(&|props| {
            let _ = props
                .property_mut("currentfigure")
                .map(|p| p.set_value(&figure.as_value()));
        });
    }

    fn pop_figure(&mut self, figure: Handle) {
        self.figure_list.retain(|f| *f != figure);
        let next = self
            .figure_list
            .front()
            .copied()
            .unwrap_or_else(Handle::unset);
        self.write_root(&|props| {
            let _ = props
                .property_mut("currentfigure")
                .map(|p| p.set_value(&next.as_value()));
        });
    }

    pub fn current_figure(&self) -> Handle {
        self.figure_list
            .front()
            .copied()
            .unwrap_or_else(Handle::unset)
    }

    fn write_root(&mut self, f: &dyn Fn(&mut crate::properties::PropertySet)) {
        if let Some(root) = self.objects.get_mut(&Handle::ROOT) {
            f(&mut root.properties);
        }
    }

    // ---- get / set ----

    /// Fetch one property value, resolving abbreviations and the
    /// pseudo-properties `parent`, `children`, `type`, and
    /// `__modified__`. `default<kind><prop>` names read this object's
    /// stored defaults; `factory<kind><prop>` names read the factory
    /// tables.
    pub fn get(&self, handle: Handle, name: &str) -> Result<Value, GraphicsError> {
        let obj = self.object(handle)?;
        let lower = name.to_ascii_lowercase();
        if let Some(spec) = lower.strip_prefix("default") {
            if !spec.is_empty() {
                return obj
                    .properties
                    .default_value(spec)
                    .cloned()
                    .ok_or_else(|| GraphicsError::UnknownProperty(name.to_string()));
            }
        }
        if let Some(spec) = lower.strip_prefix("factory") {
            if !spec.is_empty() {
                return self.factory_default(spec);
            }
        }
        match lower.as_str() {
            "parent" => Ok(obj.properties.parent().as_value()),
            "children" => Ok(self.children_value(handle)?),
            "type" => Ok(Value::from(obj.kind().name())),
            "__modified__" => Ok(Value::from(if obj.properties.is_modified() {
                "on"
            } else {
                "off"
            })),
            _ => obj.properties.get(name),
        }
    }

    /// All properties of `handle` as a struct; hidden properties are
    /// included only when `all` is set.
    pub fn get_all(&self, handle: Handle, all: bool) -> Result<StructValue, GraphicsError> {
        let obj = self.object(handle)?;
        let names = if all {
            obj.properties.all_names()
        } else {
            obj.properties.visible_names()
        };
        let mut s = StructValue::new();
        for name in names {
            if let Some(v) = obj.properties.get_exact(&name) {
                s.set(name, v);
            }
        }
        s.set("type", Value::from(obj.kind().name()));
        s.set("parent", obj.properties.parent().as_value());
        s.set("children", self.children_value(handle)?);
        Ok(s)
    }

    /// The visible children of `handle` as a column of handle values.
    /// Children hiding themselves via handlevisibility are skipped
    /// unless the root's showhiddenhandles is on.
    fn children_value(&self, handle: Handle) -> Result<Value, GraphicsError> {
        let show_hidden = self
            .object(Handle::ROOT)?
            .properties
            .is("showhiddenhandles", "on");
        let obj = self.object(handle)?;
        let values: Vec<f64> = obj
            .properties
            .children()
            .iter()
            .filter(|c| {
                show_hidden
                    || self
                        .objects
                        .get(c)
                        .map(|o| o.properties.is("handlevisibility", "on"))
                        .unwrap_or(false)
            })
            .map(|c| c.value())
            .collect();
        let rows = values.len();
        Ok(Value::Matrix(Matrix {
            data: values,
            rows,
            cols: usize::from(rows > 0),
        }))
    }

    /// Factory default for a kind-prefixed spec like `"axesxlim"`.
    fn factory_default(&self, spec: &str) -> Result<Value, GraphicsError> {
        for kind in ObjectKind::ALL {
            if let Some(prop) = spec.strip_prefix(kind.name()) {
                let table = base_properties(kind, Handle::unset(), Handle::unset())?;
                if let Some(v) = table.get_exact(prop) {
                    return Ok(v);
                }
            }
        }
        Err(GraphicsError::UnknownProperty(spec.to_string()))
    }

    /// Default for `prop` on a `kind` object under `handle`: the
    /// closest ancestor default wins, falling back to the factory
    /// table.
    fn inherited_default(
        &self,
        handle: Handle,
        kind: ObjectKind,
        prop: &str,
    ) -> Result<Value, GraphicsError> {
        let spec = format!("{}{prop}", kind.name());
        let mut current = self.object(handle)?.properties.parent();
        while let Some(obj) = self.objects.get(&current) {
            if let Some(v) = obj.properties.default_value(&spec) {
                return Ok(v.clone());
            }
            if current.is_root() {
                break;
            }
            current = obj.properties.parent();
        }
        self.factory_default(&spec)
    }

    /// Apply the defaults stored on a new object's ancestors, closest
    /// ancestor winning per property.
    fn apply_inherited_defaults(
        &mut self,
        handle: Handle,
        kind: ObjectKind,
    ) -> Result<(), GraphicsError> {
        let prefix = kind.name();
        let mut pending: Vec<(String, Value)> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut current = self.object(handle)?.properties.parent();
        while let Some(obj) = self.objects.get(&current) {
            for (spec, value) in obj.properties.defaults() {
                if let Some(prop) = spec.strip_prefix(prefix) {
                    if seen.insert(prop.to_string()) {
                        pending.push((prop.to_string(), value.clone()));
                    }
                }
            }
            if current.is_root() {
                break;
            }
            current = obj.properties.parent();
        }
        for (prop, value) in pending {
            if let Some(slot) = self.object_mut(handle)?.properties.property_mut(&prop) {
                slot.set_value(&value)?;
            }
        }
        Ok(())
    }

    /// Assign one property value, running the full post-set pipeline
    /// (toolkit notification, listeners, modified propagation, camera
    /// and auto-limit updates) when the value actually changed.
    pub fn set(&mut self, handle: Handle, name: &str, value: &Value) -> Result<(), GraphicsError> {
        {
            let obj = self.object(handle)?;
            if obj.properties.is_beingdeleted() {
                return Err(GraphicsError::BeingDeleted(handle.value()));
            }
        }

        let lower = name.to_ascii_lowercase();
        // A default<kind><prop> assignment stores a default for this
        // object's descendants instead of touching a property slot.
        if let Some(spec) = lower.strip_prefix("default") {
            if !spec.is_empty() {
                self.object_mut(handle)?
                    .properties
                    .set_default(spec.to_string(), value.clone());
                self.mark_modified(handle);
                return Ok(());
            }
        }

        match lower.as_str() {
            "parent" => {
                let p = value
                    .as_scalar()
                    .ok_or_else(|| GraphicsError::invalid_value("parent", "expected a handle"))?;
                return self.reparent(handle, Handle::new(p));
            }
            "children" => {
                let m = value.to_matrix().ok_or_else(|| {
                    GraphicsError::invalid_value("children", "expected a vector of handles")
                })?;
                let order: Vec<Handle> = m.data.iter().map(|v| Handle::new(*v)).collect();
                self.object_mut(handle)?.properties.reorder_children(&order)?;
                self.mark_modified(handle);
                return Ok(());
            }
            "__modified__" => {
                let on = matches!(value, Value::Str(s) if s == "on")
                    || value.as_scalar().map(|v| v != 0.0).unwrap_or(false);
                self.object_mut(handle)?.properties.set_modified(on);
                return Ok(());
            }
            _ => {}
        }

        let resolved = self.object(handle)?.properties.resolve_name(name)?;

        // The reserved strings "default" and "factory" assign the
        // inherited or factory default in place of a literal value.
        if let Value::Str(s) = value {
            if s == "default" || s == "factory" {
                let kind = self.kind_of(handle)?;
                let replacement = if s == "default" {
                    self.inherited_default(handle, kind, &resolved)?
                } else {
                    self.factory_default(&format!("{}{resolved}", kind.name()))?
                };
                return self.set(handle, &resolved, &replacement);
            }
        }

        // Handle-valued properties must reference a live object.
        if let Some(prop) = self.object(handle)?.properties.property(&resolved) {
            if matches!(prop.value(), PropertyValue::Handle(_)) && !value.is_empty() {
                if let Some(v) = value.as_scalar() {
                    if !self.is_handle(v) {
                        return Err(GraphicsError::invalid_value(
                            resolved,
                            format!("invalid graphics handle (= {v})"),
                        ));
                    }
                }
            }
        }

        let changed = match self.object_mut(handle)?.properties.property_mut(&resolved) {
            Some(prop) => prop.set_value(value)?,
            None => return Err(GraphicsError::UnknownProperty(name.to_string())),
        };
        if !changed {
            return Ok(());
        }

        self.toolkit.update(handle, &resolved);

        let listeners: Vec<Callback> = self
            .object(handle)?
            .properties
            .property(&resolved)
            .map(|p| p.listeners().to_vec())
            .unwrap_or_default();
        // Listener errors propagate to the caller of set, but the
        // committed value still gets its modified flag and derived
        // state brought up to date first.
        let mut listener_err = None;
        for listener in listeners {
            if let Err(e) = self.invoke_callback(handle, &listener, &Value::empty()) {
                listener_err = Some(e);
                break;
            }
        }

        self.mark_modified(handle);
        let hooks = self.post_set_hooks(handle, &resolved);
        match listener_err {
            Some(e) => Err(e),
            None => hooks,
        }
    }

    /// Install a value bypassing listeners and hooks; used for derived
    /// state the engine computes itself.
    fn write_property(
        &mut self,
        handle: Handle,
        name: &str,
        value: &Value,
    ) -> Result<(), GraphicsError> {
        match self.object_mut(handle)?.properties.property_mut(name) {
            Some(prop) => {
                prop.set_value(value)?;
                Ok(())
            }
            None => Err(GraphicsError::UnknownProperty(name.to_string())),
        }
    }

    /// Kind-specific reactions to a changed property.
    fn post_set_hooks(&mut self, handle: Handle, name: &str) -> Result<(), GraphicsError> {
        let kind = self.kind_of(handle)?;

        if kind == ObjectKind::Axes {
            if let Some(axis) = name.strip_suffix("limmode") {
                if self.object(handle)?.properties.is(name, "auto") {
                    let axis = axis.to_string();
                    self.update_axis_limits(handle, &axis)?;
                }
                return Ok(());
            }
            if let Some(axis) = name.strip_suffix("scale") {
                let axis = axis.to_string();
                self.update_axis_limits(handle, &axis)?;
                return Ok(());
            }
            if matches!(name, "dataaspectratio" | "plotboxaspectratio")
                || name.ends_with("aspectratiomode")
            {
                self.update_aspect_ratios(handle)?;
                return self.update_camera(handle);
            }
            if CAMERA_PROPS.contains(&name) {
                return self.update_camera(handle);
            }
            return Ok(());
        }

        // A child's data change feeds the enclosing axes' auto limits.
        if kind.has_data_limits() || kind == ObjectKind::Text {
            let axis = match name {
                "xdata" | "xliminclude" => Some("x"),
                "ydata" | "yliminclude" => Some("y"),
                "zdata" | "zliminclude" => Some("z"),
                "cdata" | "climinclude" => Some("c"),
                "alphadata" | "aliminclude" => Some("a"),
                _ => None,
            };
            if let Some(axis) = axis {
                if let Some(axes) = self.enclosing_axes(handle) {
                    self.update_axis_limits(axes, axis)?;
                }
            }
        }
        Ok(())
    }

    fn enclosing_axes(&self, handle: Handle) -> Option<Handle> {
        let mut current = self.objects.get(&handle)?.properties.parent();
        while current.ok() {
            let obj = self.objects.get(&current)?;
            if obj.kind() == ObjectKind::Axes {
                return Some(current);
            }
            current = obj.properties.parent();
        }
        None
    }

    // ---- axes updates ----

    fn update_camera(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let obj = self.object_mut(handle)?;
        match obj.axes.as_mut() {
            Some(state) => axes::update_camera(&mut obj.properties, state),
            None => Ok(()),
        }
    }

    fn update_aspect_ratios(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        if self.updating_aspectratios {
            return Ok(());
        }
        self.updating_aspectratios = true;
        let result = match self.object_mut(handle) {
            Ok(obj) => axes::update_aspect_ratios(&mut obj.properties),
            Err(e) => Err(e),
        };
        self.updating_aspectratios = false;
        result
    }

    /// Recompute one axis' limits from the limit-including children
    /// when the corresponding mode is auto. Guarded against the
    /// recursion triggered by storing the computed limits.
    pub fn update_axis_limits(&mut self, axes: Handle, axis: &str) -> Result<(), GraphicsError> {
        if self.updating_axis_limits {
            return Ok(());
        }
        if self.kind_of(axes)? != ObjectKind::Axes {
            return Ok(());
        }
        let mode = format!("{axis}limmode");
        if !self.object(axes)?.properties.is(&mode, "auto") {
            return Ok(());
        }

        self.updating_axis_limits = true;
        let result = self.apply_axis_limits(axes, axis);
        self.updating_axis_limits = false;
        result
    }

    fn apply_axis_limits(&mut self, axes: Handle, axis: &str) -> Result<(), GraphicsError> {
        let mut limits = DataLimits::empty();
        let children: Vec<Handle> = self.object(axes)?.properties.children().to_vec();
        for child in children {
            self.gather_limits(child, axis, &mut limits);
        }
        if limits.is_empty() {
            return Ok(());
        }

        let computed = if axis == "c" || axis == "a" {
            // Color/alpha limits come straight from the data range.
            let max = if limits.min == limits.max {
                limits.max + 1.0
            } else {
                limits.max
            };
            Some([limits.min, max])
        } else {
            let logscale = self
                .object(axes)?
                .properties
                .is(&format!("{axis}scale"), "log");
            get_axis_limits(limits.min, limits.max, limits.min_pos, logscale)
        };

        if let Some(lim) = computed {
            let lim_name = format!("{axis}lim");
            let value = Value::Matrix(Matrix::row_vector(lim.to_vec()));
            let changed = match self.object_mut(axes)?.properties.property_mut(&lim_name) {
                Some(prop) => prop.set_value(&value)?,
                None => false,
            };
            if !changed {
                return Ok(());
            }
            self.toolkit.update(axes, &lim_name);
            let listeners: Vec<Callback> = self
                .object(axes)?
                .properties
                .property(&lim_name)
                .map(|p| p.listeners().to_vec())
                .unwrap_or_default();
            for listener in listeners {
                self.invoke_callback(axes, &listener, &Value::empty())?;
            }
            self.mark_modified(axes);
            self.update_camera(axes)?;
        }
        Ok(())
    }

    /// Fold the extrema of one child (recursing through hggroups) into
    /// `limits`, honoring the per-axis liminclude opt-in.
    fn gather_limits(&self, child: Handle, axis: &str, limits: &mut DataLimits) {
        let obj = match self.objects.get(&child) {
            Some(o) => o,
            None => return,
        };
        if obj.kind() == ObjectKind::Hggroup {
            for grandchild in obj.properties.children() {
                self.gather_limits(*grandchild, axis, limits);
            }
            return;
        }
        if !obj.kind().has_data_limits() {
            return;
        }
        let include = format!("{axis}liminclude");
        if !obj.properties.is(&include, "on") {
            return;
        }
        let data_prop = match axis {
            "c" => "cdata".to_string(),
            "a" => "alphadata".to_string(),
            _ => format!("{axis}data"),
        };
        if let Some(prop) = obj.properties.property(&data_prop) {
            if let Some(l) = prop.data_limits() {
                limits.merge(&l);
            }
        }
    }

    /// Number of dimensions an axes is displaying: 3 when any child
    /// carries z data or the view is not the flat default.
    pub fn calc_dimensions(&self, axes: Handle) -> Result<f64, GraphicsError> {
        let obj = self.object(axes)?;
        if obj.kind() != ObjectKind::Axes {
            return Err(GraphicsError::InvalidArgument(
                "expected an axes handle".to_string(),
            ));
        }
        if let Value::Matrix(m) = obj.properties.get("view")? {
            if m.numel() == 2 && m.data[1] != 90.0 {
                return Ok(3.0);
            }
        }
        let mut stack: Vec<Handle> = obj.properties.children().to_vec();
        while let Some(h) = stack.pop() {
            if let Some(child) = self.objects.get(&h) {
                if child.kind() == ObjectKind::Hggroup {
                    stack.extend_from_slice(child.properties.children());
                    continue;
                }
                if let Some(Value::Matrix(z)) = child.properties.get_exact("zdata") {
                    if !z.is_empty() {
                        return Ok(3.0);
                    }
                }
            }
        }
        Ok(2.0)
    }

    /// Data-space size of one image pixel, from the image's extents
    /// and its cdata dimensions.
    pub fn image_pixel_size(&self, image: Handle) -> Result<[f64; 2], GraphicsError> {
        let obj = self.object(image)?;
        if obj.kind() != ObjectKind::Image {
            return Err(GraphicsError::InvalidArgument(
                "expected an image handle".to_string(),
            ));
        }
        let cdata = match obj.properties.get("cdata")? {
            Value::Matrix(m) => m,
            _ => return Err(GraphicsError::invalid_value("cdata", "expected a matrix")),
        };
        let extent = |name: &str, count: usize| -> Result<f64, GraphicsError> {
            let m = match obj.properties.get(name)? {
                Value::Matrix(m) if !m.is_empty() => m,
                _ => return Ok(1.0),
            };
            let lo = m.data.first().copied().unwrap_or(0.0);
            let hi = m.data.last().copied().unwrap_or(0.0);
            if count > 1 {
                Ok((hi - lo) / (count - 1) as f64)
            } else {
                Ok(1.0)
            }
        };
        Ok([
            extent("xdata", cdata.cols)?,
            extent("ydata", cdata.rows)?,
        ])
    }

    /// Pixel-space bounding box `[x, y, w, h]` of one object,
    /// converted from its `units` property against the parent's pixel
    /// dimensions. `internal` selects `position` over `outerposition`.
    pub fn bounding_box(&self, handle: Handle, internal: bool) -> Result<[f64; 4], GraphicsError> {
        let obj = self.object(handle)?;
        let raw = obj.bounding_box(internal)?;
        let units = match obj.properties.get_exact("units") {
            Some(Value::Str(u)) => u,
            _ => return Ok(raw),
        };
        let parent = obj.properties.parent();
        let parent_dim = if parent.is_root() || !parent.ok() {
            self.toolkit.screen_size()
        } else {
            self.toolkit.canvas_size(parent)
        };
        let px = units::convert_position(
            &raw,
            &units,
            "pixels",
            parent_dim,
            self.toolkit.screen_resolution(),
        )?;
        Ok([px[0], px[1], px[2], px[3]])
    }

    // ---- interactive zoom ----

    fn require_axes(&self, handle: Handle) -> Result<(), GraphicsError> {
        if self.kind_of(handle)? != ObjectKind::Axes {
            return Err(GraphicsError::InvalidArgument(
                "expected an axes handle".to_string(),
            ));
        }
        Ok(())
    }

    fn current_zoom_entry(&self, axes: Handle) -> Result<ZoomEntry, GraphicsError> {
        let props = &self.object(axes)?.properties;
        let pair = |name: &str| -> Result<[f64; 2], GraphicsError> {
            match props.get_exact(name) {
                Some(Value::Matrix(m)) if m.numel() == 2 => Ok([m.data[0], m.data[1]]),
                _ => Err(GraphicsError::invalid_value(name, "expected a 1x2 vector")),
            }
        };
        let mode = |name: &str| {
            if props.is(name, "manual") {
                "manual".to_string()
            } else {
                "auto".to_string()
            }
        };
        Ok(ZoomEntry {
            xlim: pair("xlim")?,
            xlimmode: mode("xlimmode"),
            ylim: pair("ylim")?,
            ylimmode: mode("ylimmode"),
        })
    }

    fn restore_zoom_entry(
        &mut self,
        axes: Handle,
        entry: &ZoomEntry,
    ) -> Result<(), GraphicsError> {
        self.write_property(
            axes,
            "xlim",
            &Value::Matrix(Matrix::row_vector(entry.xlim.to_vec())),
        )?;
        self.write_property(
            axes,
            "ylim",
            &Value::Matrix(Matrix::row_vector(entry.ylim.to_vec())),
        )?;
        self.write_property(axes, "xlimmode", &Value::from(entry.xlimmode.as_str()))?;
        self.write_property(axes, "ylimmode", &Value::from(entry.ylimmode.as_str()))?;
        self.mark_modified(axes);
        // A restored auto mode recomputes from the children.
        self.update_axis_limits(axes, "x")?;
        self.update_axis_limits(axes, "y")?;
        self.update_camera(axes)
    }

    /// Save the current x/y limits and modes before a zoom step.
    pub fn zoom_push(&mut self, axes: Handle) -> Result<(), GraphicsError> {
        self.require_axes(axes)?;
        let entry = self.current_zoom_entry(axes)?;
        if let Some(state) = self.object_mut(axes)?.axes.as_mut() {
            state.push_zoom(entry);
        }
        Ok(())
    }

    /// Undo the most recent zoom step, restoring its saved limits and
    /// modes. Returns false when the stack was already empty.
    pub fn zoom_pop(&mut self, axes: Handle) -> Result<bool, GraphicsError> {
        self.require_axes(axes)?;
        let entry = match self.object_mut(axes)?.axes.as_mut().and_then(|s| s.pop_zoom()) {
            Some(e) => e,
            None => return Ok(false),
        };
        self.restore_zoom_entry(axes, &entry)?;
        Ok(true)
    }

    /// Drop every zoom level at once, restoring the pre-zoom limits
    /// from the bottom of the stack.
    pub fn zoom_clear(&mut self, axes: Handle) -> Result<(), GraphicsError> {
        self.require_axes(axes)?;
        let bottom = self
            .object_mut(axes)?
            .axes
            .as_mut()
            .and_then(|s| s.clear_zoom_stack());
        match bottom {
            Some(entry) => self.restore_zoom_entry(axes, &entry),
            None => Ok(()),
        }
    }

    // ---- dynamic properties and listeners ----

    pub fn add_property(&mut self, handle: Handle, prop: Property) -> Result<(), GraphicsError> {
        self.object_mut(handle)?.properties.insert_dynamic(prop)
    }

    pub fn add_listener(
        &mut self,
        handle: Handle,
        name: &str,
        callback: Callback,
    ) -> Result<(), GraphicsError> {
        let resolved = self.object(handle)?.properties.resolve_name(name)?;
        match self.object_mut(handle)?.properties.property_mut(&resolved) {
            Some(prop) => {
                prop.add_listener(callback);
                Ok(())
            }
            None => Err(GraphicsError::UnknownProperty(name.to_string())),
        }
    }

    pub fn delete_listener(
        &mut self,
        handle: Handle,
        name: &str,
        callback: Option<&Callback>,
    ) -> Result<(), GraphicsError> {
        let resolved = self.object(handle)?.properties.resolve_name(name)?;
        match self.object_mut(handle)?.properties.property_mut(&resolved) {
            Some(prop) => {
                prop.delete_listener(callback);
                Ok(())
            }
            None => Err(GraphicsError::UnknownProperty(name.to_string())),
        }
    }

    /// Restore an object's properties to their factory defaults,
    /// keeping its identity, its place in the object tree, and its
    /// position and units.
    pub fn reset(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let (kind, parent) = {
            let obj = self.object(handle)?;
            (obj.kind(), obj.properties.parent())
        };
        if kind == ObjectKind::Root {
            return Ok(());
        }
        let fresh = base_properties(kind, handle, parent)?;
        let obj = self.object_mut(handle)?;
        for name in fresh.all_names() {
            if matches!(name.as_str(), "position" | "outerposition" | "units") {
                continue;
            }
            if let (Some(default), Some(slot)) = (
                fresh.property(&name).map(|p| p.get()),
                obj.properties.property_mut(&name),
            ) {
                // Reset never fails: defaults validate by construction.
                let _ = slot.set_value(&default);
            }
        }
        self.mark_modified(handle);
        if kind == ObjectKind::Axes {
            self.update_camera(handle)?;
        }
        Ok(())
    }

    // ---- callbacks and events ----

    /// Run the named callback property of `handle` if one is set.
    pub fn execute_callback(
        &mut self,
        handle: Handle,
        name: &str,
        data: &Value,
    ) -> Result<(), GraphicsError> {
        let value = match self.object(handle)?.properties.get_exact(name) {
            Some(v) => v,
            None => return Ok(()),
        };
        match Callback::from_value(&value)? {
            Some(cb) => self.invoke_callback(handle, &cb, data),
            None => Ok(()),
        }
    }

    /// Run a callback with full nesting bookkeeping: the handle is
    /// pushed on the callback stack and mirrored into the root's
    /// callbackobject property, both restored on every exit path.
    pub fn invoke_callback(
        &mut self,
        handle: Handle,
        callback: &Callback,
        data: &Value,
    ) -> Result<(), GraphicsError> {
        self.callback_objects.push(handle);
        self.write_root_callbackobject(handle);

        let result = match callback {
            Callback::Native(f) => f(self, handle, data, &[]),
            Callback::Bound(f, extra) => {
                let extra = extra.clone();
                f(self, handle, data, &extra)
            }
            Callback::Interpreted(source) => self.with_interpreter(|interp, ctx| {
                interp.eval(ctx, source)
            }),
            Callback::Named(name, extra) => {
                let mut args = vec![handle.as_value(), data.clone()];
                args.extend(extra.iter().cloned());
                self.with_interpreter(|interp, ctx| interp.call(ctx, name, &args))
            }
        };

        self.callback_objects.pop();
        let outer = self
            .callback_objects
            .last()
            .copied()
            .unwrap_or_else(Handle::unset);
        self.write_root_callbackobject(outer);
        result
    }

    fn with_interpreter<F>(&mut self, f: F) -> Result<(), GraphicsError>
    where
        F: FnOnce(&mut dyn Interpreter, &mut GraphicsContext) -> Result<(), GraphicsError>,
    {
        match self.interpreter.take() {
            Some(mut interp) => {
                let result = f(interp.as_mut(), self);
                self.interpreter = Some(interp);
                result
            }
            None => Err(GraphicsError::Callback(
                "no interpreter installed for this callback".to_string(),
            )),
        }
    }

    fn write_root_callbackobject(&mut self, handle: Handle) {
        self.write_root(&move |props| {
            let _ = props
                .property_mut("callbackobject")
                .map(|p| p.set_value(&handle.as_value()));
        });
    }

    /// The innermost currently-executing callback object, if any.
    pub fn callback_object(&self) -> Handle {
        self.callback_objects
            .last()
            .copied()
            .unwrap_or_else(Handle::unset)
    }

    /// Post a deferred callback execution, applying the interruption
    /// policy: while a non-interruptible callback runs, only targets
    /// with busyaction queue (or lifecycle callbacks) are admitted;
    /// everything else is silently discarded.
    pub fn post_callback_event(&mut self, handle: Handle, name: &str, data: Value) {
        if let Some(&busy) = self.callback_objects.last() {
            let interruptible = self
                .objects
                .get(&busy)
                .map(|o| o.properties.is("interruptible", "on"))
                .unwrap_or(true);
            if !interruptible && !is_protected_callback(name) {
                let queue_it = self
                    .objects
                    .get(&handle)
                    .map(|o| o.properties.is("busyaction", "queue"))
                    .unwrap_or(false);
                if !queue_it {
                    return;
                }
            }
        }
        self.events.push(Event::Callback {
            handle,
            name: name.to_string(),
            data,
        });
    }

    pub fn post_function_event(&mut self, function: crate::event::EventFunction, data: Value) {
        self.events.push(Event::Function { function, data });
    }

    pub fn post_set_event(&mut self, handle: Handle, name: &str, value: Value) {
        self.events.push(Event::Set {
            handle,
            name: name.to_string(),
            value,
        });
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Drain the event queue in FIFO order. An event whose target has
    /// been deleted is skipped silently; an event that errors is
    /// reported and processing continues with the next one.
    pub fn process_events(&mut self) -> Result<(), GraphicsError> {
        while let Some(event) = self.events.pop() {
            match event {
                Event::Callback { handle, name, data } => {
                    if !self.objects.contains_key(&handle) {
                        continue;
                    }
                    if let Err(e) = self.execute_callback(handle, &name, &data) {
                        warn!("callback {name} for {handle} failed: {e}");
                    }
                }
                Event::Function { function, data } => {
                    if let Err(e) = function(self, &data) {
                        warn!("deferred function failed: {e}");
                    }
                }
                Event::Set {
                    handle,
                    name,
                    value,
                } => {
                    if !self.objects.contains_key(&handle) {
                        continue;
                    }
                    if let Err(e) = self.set(handle, &name, &value) {
                        warn!("deferred set of {name} on {handle} failed: {e}");
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush pending events, then redraw every modified visible figure
    /// and clear its subtree's dirty flags. A callback running inside
    /// the flush may not start a nested one.
    pub fn redraw_figures(&mut self) -> Result<(), GraphicsError> {
        if self.redrawing {
            return Ok(());
        }
        self.redrawing = true;
        let result = self.redraw_figures_inner();
        self.redrawing = false;
        result
    }

    fn redraw_figures_inner(&mut self) -> Result<(), GraphicsError> {
        self.process_events()?;
        let figures: Vec<Handle> = self.figure_list.iter().copied().collect();
        for figure in figures {
            let wants_redraw = self
                .objects
                .get(&figure)
                .map(|o| o.properties.is_modified() && o.properties.is("visible", "on"))
                .unwrap_or(false);
            if wants_redraw {
                self.toolkit.redraw_figure(figure)?;
                self.clear_modified(figure);
            }
        }
        Ok(())
    }

    fn clear_modified(&mut self, handle: Handle) {
        let children: Vec<Handle> = match self.objects.get_mut(&handle) {
            Some(obj) => {
                obj.properties.set_modified(false);
                obj.properties.children().to_vec()
            }
            None => return,
        };
        for child in children {
            self.clear_modified(child);
        }
    }

    /// Print one figure through the toolkit.
    pub fn print_figure(
        &mut self,
        figure: Handle,
        terminal: &str,
        file: &str,
        monochrome: bool,
        debug_file: &str,
    ) -> Result<(), GraphicsError> {
        if self.kind_of(figure)? != ObjectKind::Figure {
            return Err(GraphicsError::InvalidArgument(
                "expected a figure handle".to_string(),
            ));
        }
        self.process_events()?;
        self.toolkit
            .print_figure(figure, terminal, file, monochrome, debug_file)
    }
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Axes properties whose change invalidates the camera transform.
const CAMERA_PROPS: &[&str] = &[
    "view",
    "xlim",
    "ylim",
    "zlim",
    "xdir",
    "ydir",
    "zdir",
    "cameraposition",
    "cameratarget",
    "cameraupvector",
    "cameraviewangle",
    "camerapositionmode",
    "cameratargetmode",
    "cameraupvectormode",
    "cameraviewanglemode",
    "position",
    "outerposition",
    "activepositionproperty",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::{RecordingToolkit, ToolkitCall};

    fn ctx() -> GraphicsContext {
        GraphicsContext::new()
    }

    fn scene(ctx: &mut GraphicsContext) -> (Handle, Handle, Handle) {
        let fig = ctx.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        let ax = ctx.add_object(ObjectKind::Axes, fig, false).unwrap();
        let line = ctx.add_object(ObjectKind::Line, ax, false).unwrap();
        (fig, ax, line)
    }

    #[test]
    fn figures_get_lowest_free_integer_handles() {
        let mut c = ctx();
        let f1 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        let f2 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        assert_eq!(f1, Handle::new(1.0));
        assert_eq!(f2, Handle::new(2.0));
        c.delete(f1).unwrap();
        let f3 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        assert_eq!(f3, Handle::new(1.0));
    }

    #[test]
    fn non_figure_handles_are_negative_with_fresh_fractions() {
        let mut c = ctx();
        let mut seq = vec![0.875, 0.75, 0.625, 0.5, 0.375, 0.25].into_iter();
        c.set_fraction_source(Box::new(move || seq.next().unwrap_or(0.125)));
        let fig = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        let l1 = c.add_object(ObjectKind::Line, fig, false).unwrap();
        let l2 = c.add_object(ObjectKind::Line, fig, false).unwrap();
        assert_eq!(l1, Handle::new(-1.875));
        assert_eq!(l2, Handle::new(-2.75));

        // Freeing recycles the integer part with a new fraction.
        c.delete(l1).unwrap();
        let l3 = c.add_object(ObjectKind::Line, fig, false).unwrap();
        assert_eq!(l3.value().ceil(), -1.0);
        assert_ne!(l3, l1);
    }

    #[test]
    fn numbered_figures_are_created_or_raised() {
        let mut c = ctx();
        let f3 = c.add_figure(Some(3.0)).unwrap();
        assert_eq!(f3, Handle::new(3.0));
        let f1 = c.add_figure(None).unwrap();
        assert_eq!(f1, Handle::new(1.0));
        assert_eq!(c.current_figure(), f1);

        // Asking for an existing number raises it instead.
        assert_eq!(c.add_figure(Some(3.0)).unwrap(), f3);
        assert_eq!(c.current_figure(), f3);
        assert!(c.add_figure(Some(-2.0)).is_err());
        assert!(c.add_figure(Some(1.5)).is_err());
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut c = ctx();
        assert_eq!(c.free(Handle::ROOT), Err(GraphicsError::DeleteRoot));
        assert!(matches!(
            c.free(Handle::new(99.0)),
            Err(GraphicsError::InvalidHandle(_))
        ));
    }

    #[test]
    fn deleting_a_figure_promotes_the_next_one() {
        let mut c = ctx();
        let f1 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        let f2 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        assert_eq!(c.current_figure(), f2);
        c.delete(f2).unwrap();
        assert_eq!(c.current_figure(), f1);
        assert_eq!(c.get(Handle::ROOT, "currentfigure").unwrap(), f1.as_value());
        c.delete(f1).unwrap();
        assert!(c.get(Handle::ROOT, "currentfigure").unwrap().is_empty());
    }

    #[test]
    fn deletion_tears_down_the_subtree() {
        let mut c = ctx();
        let (fig, ax, line) = scene(&mut c);
        c.delete(fig).unwrap();
        for h in [fig, ax, line] {
            assert!(!c.is_handle(h.value()));
        }
        assert!(c.is_handle(0.0));
    }

    #[test]
    fn pseudo_properties_resolve() {
        let mut c = ctx();
        let (fig, ax, _line) = scene(&mut c);
        assert_eq!(c.get(ax, "type").unwrap(), Value::from("axes"));
        assert_eq!(c.get(ax, "parent").unwrap(), fig.as_value());
        assert_eq!(c.get(fig, "__modified__").unwrap(), Value::from("on"));
    }

    #[test]
    fn axes_labels_are_hidden_children_and_recreated_on_removal() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        let title = Handle::new(c.get(ax, "title").unwrap().as_scalar().unwrap());
        assert_eq!(c.kind_of(title).unwrap(), ObjectKind::Text);

        // Hidden from the children pseudo-property.
        match c.get(ax, "children").unwrap() {
            Value::Matrix(m) => assert_eq!(m.numel(), 1),
            other => panic!("unexpected children {other:?}"),
        }

        c.delete(title).unwrap();
        let fresh = Handle::new(c.get(ax, "title").unwrap().as_scalar().unwrap());
        assert_ne!(fresh, title);
        assert!(c.is_handle(fresh.value()));
    }

    #[test]
    fn set_notifies_toolkit_only_on_change() {
        let tk = RecordingToolkit::new();
        let log = tk.calls();
        let mut c = GraphicsContext::with_toolkit(Box::new(tk));
        let fig = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();

        c.set(fig, "name", &Value::from("plot")).unwrap();
        c.set(fig, "name", &Value::from("plot")).unwrap();
        let updates: Vec<ToolkitCall> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, ToolkitCall::Update(_, p) if p == "name"))
            .cloned()
            .collect();
        assert_eq!(updates, vec![ToolkitCall::Update(fig, "name".into())]);
    }

    #[test]
    fn listeners_fire_once_per_change_and_errors_propagate() {
        fn count(
            ctx: &mut GraphicsContext,
            h: Handle,
            _data: &Value,
            _extra: &[Value],
        ) -> Result<(), GraphicsError> {
            let n = ctx.get(h, "userdata")?.as_scalar().unwrap_or(0.0);
            ctx.write_property(h, "userdata", &Value::Num(n + 1.0))
        }
        fn boom(
            _ctx: &mut GraphicsContext,
            _h: Handle,
            _data: &Value,
            _extra: &[Value],
        ) -> Result<(), GraphicsError> {
            Err(GraphicsError::Callback("boom".to_string()))
        }

        let mut c = ctx();
        let (_fig, _ax, line) = scene(&mut c);
        c.write_property(line, "userdata", &Value::Num(0.0)).unwrap();
        c.add_listener(line, "linewidth", Callback::Native(count)).unwrap();

        c.set(line, "linewidth", &Value::Num(2.0)).unwrap();
        c.set(line, "linewidth", &Value::Num(2.0)).unwrap();
        assert_eq!(c.get(line, "userdata").unwrap(), Value::Num(1.0));

        c.add_listener(line, "linewidth", Callback::Native(boom)).unwrap();
        assert!(c.set(line, "linewidth", &Value::Num(3.0)).is_err());
    }

    #[test]
    fn setting_child_data_updates_auto_limits() {
        let mut c = ctx();
        let (_fig, ax, line) = scene(&mut c);
        c.set(
            line,
            "xdata",
            &Value::Matrix(Matrix::row_vector(vec![1.0, 5.0, 3.0])),
        )
        .unwrap();

        assert_eq!(
            c.get(ax, "xlim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![1.0, 5.0]))
        );
        assert_eq!(c.get(ax, "xlimmode").unwrap(), Value::from("auto"));
    }

    #[test]
    fn manual_limit_mode_suppresses_auto_updates() {
        let mut c = ctx();
        let (_fig, ax, line) = scene(&mut c);
        c.set(ax, "xlimmode", &Value::from("manual")).unwrap();
        c.set(
            ax,
            "xlim",
            &Value::Matrix(Matrix::row_vector(vec![-10.0, 10.0])),
        )
        .unwrap();
        c.set(
            line,
            "xdata",
            &Value::Matrix(Matrix::row_vector(vec![1.0, 5.0])),
        )
        .unwrap();
        assert_eq!(
            c.get(ax, "xlim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![-10.0, 10.0]))
        );
    }

    #[test]
    fn hggroup_children_feed_the_enclosing_axes() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        let group = c.add_object(ObjectKind::Hggroup, ax, false).unwrap();
        let inner = c.add_object(ObjectKind::Line, group, false).unwrap();
        c.set(
            inner,
            "ydata",
            &Value::Matrix(Matrix::row_vector(vec![0.0, 40.0])),
        )
        .unwrap();
        assert_eq!(
            c.get(ax, "ylim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.0, 40.0]))
        );
    }

    #[test]
    fn limit_recursion_is_bounded_by_the_guard() {
        // A listener on xlim that rewrites the line's data would
        // recurse forever without the guard.
        fn poke(
            ctx: &mut GraphicsContext,
            h: Handle,
            _data: &Value,
            extra: &[Value],
        ) -> Result<(), GraphicsError> {
            let depth = ctx.get(h, "userdata")?.as_scalar().unwrap_or(0.0);
            assert!(depth <= 2.0, "unbounded limit recursion");
            ctx.write_property(h, "userdata", &Value::Num(depth + 1.0))?;
            if let Some(Value::Num(line)) = extra.first().cloned() {
                ctx.set(
                    Handle::new(line),
                    "xdata",
                    &Value::Matrix(Matrix::row_vector(vec![depth, depth + 5.0])),
                )?;
            }
            Ok(())
        }

        let mut c = ctx();
        let (_fig, ax, line) = scene(&mut c);
        c.add_listener(
            ax,
            "xlim",
            Callback::Bound(poke, vec![Value::Num(line.value())]),
        )
        .unwrap();
        c.set(
            line,
            "xdata",
            &Value::Matrix(Matrix::row_vector(vec![1.0, 5.0, 3.0])),
        )
        .unwrap();
    }

    #[test]
    fn events_drain_fifo_and_skip_deleted_targets() {
        let mut c = ctx();
        let (fig, _ax, line) = scene(&mut c);
        c.post_set_event(line, "linewidth", Value::Num(4.0));
        c.post_set_event(fig, "name", Value::from("queued"));
        c.delete(line).unwrap();
        c.process_events().unwrap();
        assert_eq!(c.get(fig, "name").unwrap(), Value::from("queued"));
    }

    #[test]
    fn busy_noninterruptible_callback_drops_events_unless_queued() {
        fn busy(
            ctx: &mut GraphicsContext,
            _h: Handle,
            _data: &Value,
            extra: &[Value],
        ) -> Result<(), GraphicsError> {
            let line = Handle::new(extra[0].as_scalar().unwrap_or(f64::NAN));
            let fig = Handle::new(extra[1].as_scalar().unwrap_or(f64::NAN));
            // Dropped: the line has busyaction cancel.
            ctx.post_callback_event(line, "buttondownfcn", Value::empty());
            // Kept: lifecycle callbacks are always delivered.
            ctx.post_callback_event(line, "deletefcn", Value::empty());
            // Kept: the figure has busyaction queue.
            ctx.post_callback_event(fig, "buttondownfcn", Value::empty());
            Ok(())
        }

        let mut c = ctx();
        let (fig, _ax, line) = scene(&mut c);
        c.set(line, "interruptible", &Value::from("off")).unwrap();
        c.set(line, "busyaction", &Value::from("cancel")).unwrap();
        c.set(fig, "busyaction", &Value::from("queue")).unwrap();

        c.invoke_callback(
            line,
            &Callback::Bound(busy, vec![Value::Num(line.value()), Value::Num(fig.value())]),
            &Value::empty(),
        )
        .unwrap();
        assert_eq!(c.pending_events(), 2);

        // Outside any callback the same posts are all admitted.
        c.post_callback_event(line, "buttondownfcn", Value::empty());
        assert_eq!(c.pending_events(), 3);
    }

    #[test]
    fn callback_stack_restores_root_callbackobject() {
        fn inner(
            ctx: &mut GraphicsContext,
            h: Handle,
            _data: &Value,
            _extra: &[Value],
        ) -> Result<(), GraphicsError> {
            assert_eq!(ctx.callback_object(), h);
            assert_eq!(ctx.get(Handle::ROOT, "callbackobject")?, h.as_value());
            Ok(())
        }
        fn outer(
            ctx: &mut GraphicsContext,
            h: Handle,
            data: &Value,
            extra: &[Value],
        ) -> Result<(), GraphicsError> {
            let target = Handle::new(extra[0].as_scalar().unwrap_or(f64::NAN));
            ctx.invoke_callback(target, &Callback::Native(inner), data)?;
            // Back to this callback after the nested one returns.
            assert_eq!(ctx.callback_object(), h);
            Ok(())
        }

        let mut c = ctx();
        let (fig, _ax, line) = scene(&mut c);
        c.invoke_callback(
            fig,
            &Callback::Bound(outer, vec![Value::Num(line.value())]),
            &Value::empty(),
        )
        .unwrap();
        assert!(!c.callback_object().ok());
        assert!(c.get(Handle::ROOT, "callbackobject").unwrap().is_empty());
    }

    #[test]
    fn deletefcn_runs_through_the_interpreter_during_teardown() {
        use std::sync::{Arc, Mutex};

        struct LoggingInterpreter {
            evaluated: Arc<Mutex<Vec<String>>>,
        }
        impl Interpreter for LoggingInterpreter {
            fn eval(
                &mut self,
                _ctx: &mut GraphicsContext,
                source: &str,
            ) -> Result<(), GraphicsError> {
                self.evaluated.lock().unwrap().push(source.to_string());
                Ok(())
            }
            fn call(
                &mut self,
                _ctx: &mut GraphicsContext,
                name: &str,
                _args: &[Value],
            ) -> Result<(), GraphicsError> {
                self.evaluated.lock().unwrap().push(name.to_string());
                Ok(())
            }
        }

        let mut c = ctx();
        let evaluated = Arc::new(Mutex::new(Vec::new()));
        c.set_interpreter(Box::new(LoggingInterpreter {
            evaluated: evaluated.clone(),
        }));

        let (_fig, ax, line) = scene(&mut c);
        c.set(line, "deletefcn", &Value::from("disp('line gone')"))
            .unwrap();
        c.set(ax, "deletefcn", &Value::FunctionHandle("axgone".into()))
            .unwrap();

        c.delete(ax).unwrap();
        // Children are torn down before the parent finishes.
        assert_eq!(
            *evaluated.lock().unwrap(),
            vec!["disp('line gone')".to_string(), "axgone".to_string()]
        );
    }

    #[test]
    fn reset_restores_factory_values_but_keeps_position() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        c.set(ax, "linewidth", &Value::Num(4.0)).unwrap();
        c.set(
            ax,
            "position",
            &Value::Matrix(Matrix::row_vector(vec![0.0, 0.0, 0.5, 0.5])),
        )
        .unwrap();
        c.reset(ax).unwrap();
        assert_eq!(c.get(ax, "linewidth").unwrap(), Value::Num(0.5));
        assert_eq!(
            c.get(ax, "position").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.0, 0.0, 0.5, 0.5]))
        );
    }

    #[test]
    fn redraw_clears_modified_flags() {
        let tk = RecordingToolkit::new();
        let log = tk.calls();
        let mut c = GraphicsContext::with_toolkit(Box::new(tk));
        let fig = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        c.set(fig, "name", &Value::from("x")).unwrap();

        c.redraw_figures().unwrap();
        assert_eq!(c.get(fig, "__modified__").unwrap(), Value::from("off"));
        assert!(log
            .lock()
            .unwrap()
            .contains(&ToolkitCall::RedrawFigure(fig)));

        // Unmodified figures are not redrawn again.
        log.lock().unwrap().clear();
        c.redraw_figures().unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn set_rejects_stale_handle_references() {
        let mut c = ctx();
        let (fig, ax, line) = scene(&mut c);
        c.delete(line).unwrap();
        assert!(c.set(fig, "currentaxes", &Value::Num(line.value())).is_err());
        c.set(fig, "currentaxes", &Value::Num(ax.value())).unwrap();
        assert_eq!(c.get(fig, "currentaxes").unwrap(), ax.as_value());
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut c = ctx();
        let (_f1, ax1, line) = scene(&mut c);
        let f2 = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        let ax2 = c.add_object(ObjectKind::Axes, f2, false).unwrap();

        c.set(line, "parent", &ax2.as_value()).unwrap();
        assert_eq!(c.get(line, "parent").unwrap(), ax2.as_value());
        assert!(c.object(ax2).unwrap().properties.children().contains(&line));
        assert!(!c.object(ax1).unwrap().properties.children().contains(&line));
    }

    #[test]
    fn root_defaults_flow_into_new_objects() {
        let mut c = ctx();
        c.set(Handle::ROOT, "defaultlinelinewidth", &Value::Num(3.0))
            .unwrap();
        let (_fig, _ax, line) = scene(&mut c);
        assert_eq!(c.get(line, "linewidth").unwrap(), Value::Num(3.0));
        assert_eq!(
            c.get(Handle::ROOT, "defaultlinelinewidth").unwrap(),
            Value::Num(3.0)
        );
    }

    #[test]
    fn closest_ancestor_default_wins() {
        let mut c = ctx();
        c.set(Handle::ROOT, "defaultlinelinewidth", &Value::Num(3.0))
            .unwrap();
        let fig = c.add_object(ObjectKind::Figure, Handle::ROOT, false).unwrap();
        c.set(fig, "defaultlinelinewidth", &Value::Num(7.0)).unwrap();
        let ax = c.add_object(ObjectKind::Axes, fig, false).unwrap();
        let line = c.add_object(ObjectKind::Line, ax, false).unwrap();
        assert_eq!(c.get(line, "linewidth").unwrap(), Value::Num(7.0));
    }

    #[test]
    fn factory_sentinel_restores_the_factory_value() {
        let mut c = ctx();
        c.set(Handle::ROOT, "defaultlinelinewidth", &Value::Num(3.0))
            .unwrap();
        let (_fig, _ax, line) = scene(&mut c);
        c.set(line, "linewidth", &Value::from("factory")).unwrap();
        assert_eq!(c.get(line, "linewidth").unwrap(), Value::Num(0.5));

        // The "default" sentinel re-applies the inherited default.
        c.set(line, "linewidth", &Value::from("default")).unwrap();
        assert_eq!(c.get(line, "linewidth").unwrap(), Value::Num(3.0));
    }

    #[test]
    fn factory_prefix_queries_the_kind_tables() {
        let c = ctx();
        assert_eq!(
            c.get(Handle::ROOT, "factorylinelinewidth").unwrap(),
            Value::Num(0.5)
        );
        assert!(c.get(Handle::ROOT, "factorybogusprop").is_err());
    }

    #[test]
    fn failing_listener_still_marks_modified_and_updates_limits() {
        fn boom(
            _ctx: &mut GraphicsContext,
            _h: Handle,
            _data: &Value,
            _extra: &[Value],
        ) -> Result<(), GraphicsError> {
            Err(GraphicsError::Callback("boom".to_string()))
        }

        let mut c = ctx();
        let (fig, ax, line) = scene(&mut c);
        c.redraw_figures().unwrap();
        assert_eq!(c.get(fig, "__modified__").unwrap(), Value::from("off"));

        c.add_listener(line, "xdata", Callback::Native(boom)).unwrap();
        assert!(c
            .set(
                line,
                "xdata",
                &Value::Matrix(Matrix::row_vector(vec![1.0, 5.0, 3.0])),
            )
            .is_err());

        // The value was committed, so the dirty flag and derived
        // state must not be left behind by the listener error.
        assert_eq!(c.get(fig, "__modified__").unwrap(), Value::from("on"));
        assert_eq!(
            c.get(ax, "xlim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![1.0, 5.0]))
        );
    }

    #[test]
    fn zoom_push_pop_restores_saved_limits_and_modes() {
        let mut c = ctx();
        let (_fig, ax, line) = scene(&mut c);
        c.set(
            line,
            "xdata",
            &Value::Matrix(Matrix::row_vector(vec![0.0, 8.0])),
        )
        .unwrap();

        c.zoom_push(ax).unwrap();
        c.set(ax, "xlimmode", &Value::from("manual")).unwrap();
        c.set(
            ax,
            "xlim",
            &Value::Matrix(Matrix::row_vector(vec![2.0, 4.0])),
        )
        .unwrap();

        assert!(c.zoom_pop(ax).unwrap());
        assert_eq!(c.get(ax, "xlimmode").unwrap(), Value::from("auto"));
        assert_eq!(
            c.get(ax, "xlim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.0, 8.0]))
        );

        // An empty stack pops nothing; non-axes handles are rejected.
        assert!(!c.zoom_pop(ax).unwrap());
        assert!(c.zoom_push(line).is_err());
    }

    #[test]
    fn zoom_clear_unwinds_to_the_pre_zoom_limits() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        c.set(ax, "xlimmode", &Value::from("manual")).unwrap();
        c.set(
            ax,
            "xlim",
            &Value::Matrix(Matrix::row_vector(vec![0.0, 100.0])),
        )
        .unwrap();

        c.zoom_push(ax).unwrap();
        c.set(
            ax,
            "xlim",
            &Value::Matrix(Matrix::row_vector(vec![10.0, 50.0])),
        )
        .unwrap();
        c.zoom_push(ax).unwrap();
        c.set(
            ax,
            "xlim",
            &Value::Matrix(Matrix::row_vector(vec![20.0, 30.0])),
        )
        .unwrap();

        c.zoom_clear(ax).unwrap();
        assert_eq!(
            c.get(ax, "xlim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.0, 100.0]))
        );
        assert!(!c.zoom_pop(ax).unwrap());
    }

    #[test]
    fn bounding_box_converts_normalized_axes_to_pixels() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        c.set(
            ax,
            "position",
            &Value::Matrix(Matrix::row_vector(vec![0.25, 0.5, 0.5, 0.25])),
        )
        .unwrap();
        // NullToolkit reports a 560x420 pixel canvas.
        let bb = c.bounding_box(ax, true).unwrap();
        assert_eq!(bb, [141.0, 211.0, 280.0, 105.0]);
    }

    #[test]
    fn alpha_data_feeds_auto_alpha_limits() {
        let mut c = ctx();
        let (_fig, ax, _line) = scene(&mut c);
        let img = c.add_object(ObjectKind::Image, ax, false).unwrap();
        c.set(
            img,
            "alphadata",
            &Value::Matrix(Matrix::row_vector(vec![0.2, 0.8])),
        )
        .unwrap();
        assert_eq!(
            c.get(ax, "alim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.2, 0.8]))
        );

        // A constant alpha widens the degenerate range by one.
        c.set(
            img,
            "alphadata",
            &Value::Matrix(Matrix::row_vector(vec![0.5, 0.5])),
        )
        .unwrap();
        assert_eq!(
            c.get(ax, "alim").unwrap(),
            Value::Matrix(Matrix::row_vector(vec![0.5, 1.5]))
        );
    }
}
