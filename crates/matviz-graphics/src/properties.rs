//! Per-object property tables.
//!
//! A [`PropertySet`] owns every property slot of one graphics object
//! plus the intrinsic bookkeeping the registry needs: kind tag, own
//! handle, parent handle, child list, the modified flag, and the
//! being-deleted marker. Property lookup is case-insensitive and
//! accepts unambiguous prefixes.

use std::collections::{BTreeMap, BTreeSet};

use matviz_values::Value;

use crate::error::GraphicsError;
use crate::handle::Handle;
use crate::object::ObjectKind;
use crate::property::Property;

#[derive(Debug, Clone)]
pub struct PropertySet {
    kind: ObjectKind,
    handle: Handle,
    parent: Handle,
    children: Vec<Handle>,
    props: BTreeMap<String, Property>,
    dynamic: BTreeSet<String>,
    /// Default values this object supplies to descendants, keyed by
    /// the kind-prefixed spec (`"axesxlim"`, `"linelinewidth"`, ...).
    defaults: BTreeMap<String, Value>,
    modified: bool,
    beingdeleted: bool,
}

impl PropertySet {
    pub fn new(kind: ObjectKind, handle: Handle, parent: Handle) -> Self {
        PropertySet {
            kind,
            handle,
            parent,
            children: Vec::new(),
            props: BTreeMap::new(),
            dynamic: BTreeSet::new(),
            defaults: BTreeMap::new(),
            // New objects start out needing a redraw.
            modified: true,
            beingdeleted: false,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn parent(&self) -> Handle {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Handle) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Prepend `child`; the child list is kept newest-first.
    pub fn adopt(&mut self, child: Handle) {
        if !self.children.contains(&child) {
            self.children.insert(0, child);
        }
    }

    pub fn remove_child(&mut self, child: Handle) {
        self.children.retain(|c| *c != child);
    }

    /// Replace the child list. The new list must be a permutation of
    /// the current one; reordering is the only mutation allowed through
    /// the `children` pseudo-property.
    pub fn reorder_children(&mut self, new_order: &[Handle]) -> Result<(), GraphicsError> {
        if new_order.len() != self.children.len() {
            return Err(GraphicsError::InvalidArgument(
                "new children list must be a permutation of the existing one".to_string(),
            ));
        }
        let mut sorted_new: Vec<Handle> = new_order.to_vec();
        let mut sorted_old = self.children.clone();
        sorted_new.sort();
        sorted_old.sort();
        if sorted_new != sorted_old {
            return Err(GraphicsError::InvalidArgument(
                "new children list must be a permutation of the existing one".to_string(),
            ));
        }
        self.children = new_order.to_vec();
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub fn is_beingdeleted(&self) -> bool {
        self.beingdeleted
    }

    pub fn mark_beingdeleted(&mut self) {
        self.beingdeleted = true;
    }

    /// Install a property slot. The last insertion wins on name clash,
    /// which is how kind tables override the common defaults.
    pub fn insert(&mut self, prop: Property) {
        self.props.insert(prop.name().to_string(), prop);
    }

    /// Install a user-defined (dynamic) property.
    pub fn insert_dynamic(&mut self, prop: Property) -> Result<(), GraphicsError> {
        let name = prop.name().to_string();
        if self.props.contains_key(&name) {
            return Err(GraphicsError::InvalidArgument(format!(
                "addproperty: a \"{name}\" property already exists",
            )));
        }
        self.dynamic.insert(name.clone());
        self.props.insert(name, prop);
        Ok(())
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        self.dynamic.contains(name)
    }

    pub fn dynamic_property_names(&self) -> Vec<String> {
        self.dynamic.iter().cloned().collect()
    }

    /// Store a default for descendants (`spec` is kind-prefixed, e.g.
    /// `"axesxlim"`).
    pub fn set_default(&mut self, spec: String, value: Value) {
        self.defaults.insert(spec, value);
    }

    pub fn default_value(&self, spec: &str) -> Option<&Value> {
        self.defaults.get(spec)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.defaults.iter()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.props.contains_key(&name.to_ascii_lowercase())
    }

    /// Resolve a (possibly abbreviated) property name.
    ///
    /// An exact case-insensitive match always wins; otherwise the name
    /// must be a prefix of exactly one property.
    pub fn resolve_name(&self, name: &str) -> Result<String, GraphicsError> {
        let lower = name.to_ascii_lowercase();
        if self.props.contains_key(&lower) {
            return Ok(lower);
        }

        let mut candidates: Vec<String> = self
            .props
            .keys()
            .filter(|k| k.starts_with(&lower))
            .cloned()
            .collect();

        match candidates.len() {
            0 => Err(GraphicsError::UnknownProperty(name.to_string())),
            1 => Ok(candidates.swap_remove(0)),
            _ => Err(GraphicsError::AmbiguousProperty {
                name: name.to_string(),
                candidates,
            }),
        }
    }

    pub fn property(&self, resolved: &str) -> Option<&Property> {
        self.props.get(resolved)
    }

    pub fn property_mut(&mut self, resolved: &str) -> Option<&mut Property> {
        self.props.get_mut(resolved)
    }

    /// Fetch a property value by (abbreviated) name.
    pub fn get(&self, name: &str) -> Result<Value, GraphicsError> {
        let resolved = self.resolve_name(name)?;
        Ok(self.props[&resolved].get())
    }

    /// Value of `name` if the slot exists, bypassing abbreviation.
    pub fn get_exact(&self, name: &str) -> Option<Value> {
        self.props.get(name).map(|p| p.get())
    }

    /// True when the named radio/bool property currently equals
    /// `state`. Missing properties are never in any state.
    pub fn is(&self, name: &str, state: &str) -> bool {
        self.props.get(name).map(|p| p.is(state)).unwrap_or(false)
    }

    /// Names of all non-hidden properties, in sorted order.
    pub fn visible_names(&self) -> Vec<String> {
        self.props
            .values()
            .filter(|p| !p.is_hidden())
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn all_names(&self) -> Vec<String> {
        self.props.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> PropertySet {
        let mut p = PropertySet::new(ObjectKind::Line, Handle::new(-1.5), Handle::new(-1.25));
        p.insert(Property::double("linewidth", 0.5));
        p.insert(Property::string("linestyle", "-"));
        p.insert(Property::string("tag", ""));
        p
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let p = sample_set();
        assert_eq!(p.resolve_name("LineWidth").unwrap(), "linewidth");
    }

    #[test]
    fn unique_prefix_resolves() {
        let p = sample_set();
        assert_eq!(p.resolve_name("t").unwrap(), "tag");
        assert_eq!(p.resolve_name("linew").unwrap(), "linewidth");
    }

    #[test]
    fn ambiguous_prefix_lists_candidates() {
        let p = sample_set();
        match p.resolve_name("line") {
            Err(GraphicsError::AmbiguousProperty { candidates, .. }) => {
                assert_eq!(candidates, vec!["linestyle", "linewidth"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let p = sample_set();
        assert!(matches!(
            p.resolve_name("bogus"),
            Err(GraphicsError::UnknownProperty(_))
        ));
    }

    #[test]
    fn children_reorder_requires_permutation() {
        let mut p = sample_set();
        let (a, b) = (Handle::new(-2.5), Handle::new(-3.5));
        p.adopt(a);
        p.adopt(b);
        // Newest first.
        assert_eq!(p.children(), &[b, a]);
        p.reorder_children(&[a, b]).unwrap();
        assert_eq!(p.children(), &[a, b]);
        assert!(p.reorder_children(&[a]).is_err());
        assert!(p.reorder_children(&[a, Handle::new(-9.5)]).is_err());
    }

    #[test]
    fn dynamic_properties_cannot_shadow() {
        let mut p = sample_set();
        p.insert_dynamic(Property::any("mydata", Value::empty()))
            .unwrap();
        assert!(p.is_dynamic("mydata"));
        assert!(p
            .insert_dynamic(Property::any("linewidth", Value::empty()))
            .is_err());
    }
}
