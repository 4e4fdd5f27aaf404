//! Subclass synthesis: the host class a Python-defined subclass needs is
//! derived from its layout (solid base, slot names, dict flag), cached by
//! that layout key, and shared by every layout-equivalent type. Instances
//! are one payload shape, `SharedInstance`, which carries its own type;
//! the canonical instance of the solid base is embedded by composition
//! and serves as the receiver view for inherited native methods.

use crate::builtins::dict::PyDict;
use crate::builtins::type_::PyTypeRef;
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::representation::Representation;
use crate::types::HostClass;
use crate::{Context, PyResult};
use itertools::Itertools;
use ophidian_common::lock::PyRwLock;
use std::any::TypeId;
use std::sync::Arc;

/// The "emitted host class" of a synthesised subclass: what storage its
/// instances add on top of the solid base, and in which order. Two specs
/// with the same layout key share one `SyntheticLayout` by pointer, which
/// is what makes their types `__class__`-compatible.
pub struct SyntheticLayout {
    /// Host class of the solid base this layout extends.
    pub base: HostClass,
    /// Slot names this layout adds, in declaration order.
    pub slot_names: Box<[String]>,
    /// Index of the first own slot in the flattened slot vector.
    pub slot_offset: usize,
    /// Flattened slot count, inherited slots included.
    pub total_slots: usize,
    pub has_dict: bool,
    display: String,
}

impl SyntheticLayout {
    pub(crate) fn new(base: HostClass, slot_names: Vec<String>, has_dict: bool) -> Self {
        let (slot_offset, base_dict) = match &base {
            HostClass::Synthetic(parent) => (parent.total_slots, parent.has_dict),
            HostClass::Native { .. } => (0, false),
        };
        let total_slots = slot_offset + slot_names.len();
        let has_dict = has_dict || base_dict;
        let display = format!(
            "synthesised[{}, slots=({}), dict={}]",
            base.name(),
            slot_names.iter().format(", "),
            has_dict
        );
        Self {
            base,
            slot_names: slot_names.into_boxed_slice(),
            slot_offset,
            total_slots,
            has_dict,
            display,
        }
    }

    pub fn describe(&self) -> &str {
        &self.display
    }
}

impl std::fmt::Debug for SyntheticLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

/// Key of the subclass cache. Equal keys must yield the identical host
/// class, so everything that affects instance shape participates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LayoutKey {
    base: BaseKey,
    slots: Vec<String>,
    has_dict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BaseKey {
    Native(TypeId),
    Synthetic(usize),
}

impl LayoutKey {
    pub(crate) fn new(solid_host: &HostClass, slots: &[String], has_dict: bool) -> Self {
        let base = match solid_host {
            HostClass::Native { id, .. } => BaseKey::Native(*id),
            HostClass::Synthetic(layout) => {
                BaseKey::Synthetic(Arc::as_ptr(layout) as usize)
            }
        };
        Self {
            base,
            slots: slots.to_vec(),
            has_dict,
        }
    }
}

/// The one payload shape of all synthesised instances. Resolved through a
/// shared representation: the instance itself knows its type, and knows
/// how to change it when `__class__` is reassigned.
pub struct SharedInstance {
    typ: PyRwLock<PyTypeRef>,
    layout: Arc<SyntheticLayout>,
    /// Canonical instance of the root solid base, the receiver view for
    /// inherited native methods.
    base: PyObjectRef,
    slots: Box<[PyRwLock<Option<PyObjectRef>>]>,
    dict: Option<PyDict>,
}

impl PyPayload for SharedInstance {
    const HOST_NAME: &'static str = "SharedInstance";

    fn base_view(&self) -> Option<&PyObject> {
        Some(&*self.base)
    }
}

impl std::fmt::Debug for SharedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.typ.read().name())
    }
}

impl SharedInstance {
    pub(crate) fn alloc(
        typ: PyTypeRef,
        layout: Arc<SyntheticLayout>,
        base: PyObjectRef,
    ) -> PyObjectRef {
        let slots = (0..layout.total_slots)
            .map(|_| PyRwLock::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let dict = layout.has_dict.then(PyDict::default);
        Self {
            typ: PyRwLock::new(typ),
            layout,
            base,
            slots,
            dict,
        }
        .into_object()
    }

    pub fn current_type(&self) -> PyTypeRef {
        self.typ.read().clone()
    }

    pub(crate) fn set_type(&self, typ: PyTypeRef) {
        *self.typ.write() = typ;
    }

    pub fn layout(&self) -> &Arc<SyntheticLayout> {
        &self.layout
    }

    pub fn get_slot(&self, index: usize) -> Option<PyObjectRef> {
        self.slots[index].read().clone()
    }

    /// Stores into a slot, returning the previous value.
    pub fn set_slot(&self, index: usize, value: Option<PyObjectRef>) -> Option<PyObjectRef> {
        std::mem::replace(&mut *self.slots[index].write(), value)
    }

    pub fn dict(&self) -> Option<&PyDict> {
        self.dict.as_ref()
    }

    /// Publishes the shared representation of the carrier payload. Safe to
    /// call repeatedly; the binding never changes.
    pub(crate) fn ensure_registered(ctx: &Context) {
        ctx.factory.with_lock(|| {
            ctx.registry.publish(
                TypeId::of::<SharedInstance>(),
                SharedInstance::HOST_NAME,
                Representation::Shared {
                    carrier: shared_instance_carrier,
                },
            );
        });
    }
}

fn shared_instance_carrier(obj: &PyObject) -> PyTypeRef {
    obj.downcast_ref::<SharedInstance>()
        .expect("shared representation resolved a foreign payload")
        .current_type()
}

/// Builds an instance of `cls` around an already-constructed canonical
/// instance: wrapped in a `SharedInstance` for synthesised layouts, used
/// as-is when the canonical payload is the primary host class of `cls`.
pub(crate) fn adopt_instance(
    cls: &PyTypeRef,
    canonical: PyObjectRef,
    ctx: &Context,
) -> PyResult {
    match &cls.host {
        HostClass::Synthetic(layout) => {
            Ok(SharedInstance::alloc(cls.clone(), layout.clone(), canonical))
        }
        HostClass::Native { id, .. } if *id == canonical.host_class() => Ok(canonical),
        HostClass::Native { name, .. } => Err(ctx.new_type_error(format!(
            "cannot create '{}' instances: host class '{}' does not match '{}'",
            cls.name(),
            canonical.host_name(),
            name
        ))),
    }
}

/// Instantiates `cls` through its constructor index: the first indexed
/// constructor whose signature matches the argument count is invoked on
/// behalf of `cls`.
pub(crate) fn construct_via_index(
    cls: &PyTypeRef,
    args: &crate::function::FuncArgs,
    ctx: &Context,
) -> PyResult {
    let entry = {
        let ctors = cls.constructors.read();
        ctors.iter().copied().find(|c| c.matches(args.args.len()))
    };
    match entry {
        Some(ctor) => (ctor.func)(cls, args, ctx),
        None => Err(ctx.new_type_error(format!(
            "no constructor of '{}' matches the given arguments",
            cls.name()
        ))),
    }
}

/// Rebinds the type carried by a replaceable instance. Callers have
/// already validated layout compatibility and replaceability.
pub(crate) fn replace_carried_type(
    obj: &PyObject,
    target: PyTypeRef,
    ctx: &Context,
) -> PyResult<()> {
    if let Some(instance) = obj.downcast_ref::<SharedInstance>() {
        instance.set_type(target);
        return Ok(());
    }
    if crate::exceptions::replace_exception_type(obj, &target) {
        return Ok(());
    }
    Err(ctx.new_type_error(format!(
        "__class__ assignment not supported for '{}' objects",
        crate::ops::type_of(obj, ctx).name()
    )))
}
