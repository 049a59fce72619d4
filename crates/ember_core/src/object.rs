//! Shared-object model.
//!
//! Every configurable entity in the kernel carries an [`ObjectBase`]: an
//! optional name (a lookup key within its owning scope) and a `shared` flag.
//! Objects referenced through [`Ref`] handles are destroyed when the last
//! handle drops; the object graph is acyclic by construction (zones and
//! emitters are always children, never back-references), so plain `Rc` is
//! sufficient.
//!
//! Cloning a sub-graph goes through [`copy_child`]: exclusively-owned
//! children are deep-copied, children flagged shared keep their identity and
//! only gain a reference.

use crate::io::Descriptor;
use std::cell::RefCell;
use std::rc::Rc;

/// Reference-counted handle to a configurable object.
///
/// The kernel is single-threaded per system, so handles use `Rc` with
/// interior mutability rather than atomics and locks.
pub type Ref<T> = Rc<RefCell<T>>;

/// Shorthand for wrapping a value into a [`Ref`].
pub fn new_ref<T>(value: T) -> Ref<T> {
    Rc::new(RefCell::new(value))
}

/// State common to every configurable object: name and sharing policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectBase {
    name: Option<String>,
    shared: bool,
}

impl ObjectBase {
    /// Name of the object, if any. Names are lookup keys within an owning
    /// scope; the kernel does not enforce global uniqueness.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn clear_name(&mut self) {
        self.name = None;
    }

    /// Whether several owners may reference this object without deep copy.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn set_shared(&mut self, shared: bool) {
        self.shared = shared;
    }

    /// Reads the base attributes from a descriptor. Missing attributes leave
    /// the current values untouched. Called first by every importer, which
    /// makes attribute inheritance explicit.
    pub fn import_from(&mut self, descriptor: &Descriptor) {
        match descriptor.get_str("name") {
            Ok(Some(name)) => self.name = Some(name.to_owned()),
            Ok(None) => {}
            Err(err) => tracing::warn!("skipping attribute: {err}"),
        }
        match descriptor.get_bool("shared") {
            Ok(Some(shared)) => self.shared = shared,
            Ok(None) => {}
            Err(err) => tracing::warn!("skipping attribute: {err}"),
        }
    }

    /// Writes the base attributes into a descriptor, omitting defaults.
    pub fn export_into(&self, descriptor: &mut Descriptor) {
        if let Some(name) = &self.name {
            descriptor.set_str("name", name.clone());
        }
        if self.shared {
            descriptor.set_bool("shared", true);
        }
    }
}

/// Trait implemented by every entity carrying an [`ObjectBase`].
pub trait EmberObject {
    fn object(&self) -> &ObjectBase;
    fn object_mut(&mut self) -> &mut ObjectBase;

    fn name(&self) -> Option<String> {
        self.object().name().map(str::to_owned)
    }

    fn set_name(&mut self, name: impl Into<String>)
    where
        Self: Sized,
    {
        self.object_mut().set_name(name);
    }

    fn is_shared(&self) -> bool {
        self.object().is_shared()
    }

    fn set_shared(&mut self, shared: bool) {
        self.object_mut().set_shared(shared);
    }
}

/// Clones a child reference according to its sharing policy: a shared child
/// is referenced, an exclusively-owned one is deep-copied.
pub fn copy_child<T: Clone + EmberObject>(child: &Ref<T>) -> Ref<T> {
    if child.borrow().is_shared() {
        Rc::clone(child)
    } else {
        new_ref(child.borrow().clone())
    }
}
