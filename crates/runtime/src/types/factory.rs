//! The serialised creator of types. At most one thread is inside the
//! factory at a time; creation that re-enters on the same thread (nested
//! exposure) proceeds under the already-held lock. A type is published to
//! the registry only after it is READY, so no partially built type is
//! ever observable.

use crate::builtins::descriptor::{
    MemberAccess, MethodSlot, PyMemberDescriptor, PyMethodDescriptor, PyNewMethod,
    PyStaticMethod, PyWrapper, WrappedSlot,
};
use crate::builtins::getset::{GetSetSlot, PyGetSet};
use crate::builtins::type_::{PyType, PyTypeRef, best_base};
use crate::expose::{self, AttrSpec, ExposedClass, SelfClass};
use crate::function::ArgParser;
use crate::intern::intern_str;
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::representation::Representation;
use crate::types::synthesis::{LayoutKey, SharedInstance, SyntheticLayout};
use crate::types::{HostClass, TypeFlags, TypeSpec, TypeState, SubclassSpec};
use crate::{Context, PyResult, interpreter_error};
use ophidian_common::lock::{PyMutex, PyThreadMutex};
use std::collections::HashMap;
use std::sync::Arc;

pub struct TypeFactory {
    lock: PyThreadMutex<()>,
    layouts: PyMutex<HashMap<LayoutKey, Arc<SyntheticLayout>, ahash::RandomState>>,
}

impl TypeFactory {
    pub(crate) fn new() -> Self {
        Self {
            lock: PyThreadMutex::new(()),
            layouts: PyMutex::new(HashMap::default()),
        }
    }

    /// Runs `f` with the factory serialised. Re-entry on the owning
    /// thread runs `f` directly under the outer hold.
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.lock.lock() {
            Some(_guard) => f(),
            None => f(),
        }
    }

    /// Builds a crafted type from its specification. Nothing is published
    /// on error.
    pub fn from_spec(&self, spec: TypeSpec, ctx: &Context) -> PyResult<PyTypeRef> {
        self.with_lock(|| self.build_crafted(spec, ctx))
    }

    /// Builds a Python-defined subclass: solid base, layout key, cached or
    /// freshly minted host class, slot members.
    pub fn from_subclass_spec(&self, spec: SubclassSpec, ctx: &Context) -> PyResult<PyTypeRef> {
        self.with_lock(|| self.build_subclass(spec, ctx))
    }

    fn build_crafted(&self, spec: TypeSpec, ctx: &Context) -> PyResult<PyTypeRef> {
        let bases = if spec.bases.is_empty() {
            vec![ctx.types.object_type.clone()]
        } else {
            spec.bases.clone()
        };
        // Validates the solid-base arrangement of the bases even though a
        // crafted type keeps its declared layout.
        let (primary_base, _solid) = best_base(&bases, ctx)?;
        let primary_base = primary_base.clone();

        let explicit_primary = spec.primary.is_some();
        let inherited = *primary_base.canonical.read();
        let primary = spec.primary.or(inherited);

        let mut classes: Vec<ExposedClass> = Vec::new();
        if let Some(primary) = primary {
            classes.push(primary);
        }
        classes.extend(spec.adopted.iter().copied());
        let reps = classes.len();
        classes.extend(spec.accepted.iter().copied());

        let host = match primary {
            Some(primary) => host_of(&primary.class, &primary_base),
            None => primary_base.host.clone(),
        };

        let mut flags = spec.features;
        if !explicit_primary {
            // Same storage as the base: instances keep the base's
            // replaceability (the clique arrangement).
            flags |= primary_base.flags & TypeFlags::REPLACEABLE;
        }

        let typ = PyType::new_shell(
            &spec.name,
            bases,
            host,
            classes.iter().map(|c| c.class).collect(),
            reps,
            flags,
        )
        .map_err(|msg| ctx.new_type_error(msg))?;
        *typ.canonical.write() = primary;
        if !explicit_primary {
            *typ.constructors.write() = primary_base.constructors.read().clone();
        }

        // An inherited primary is not re-exposed: its methods reach this
        // type through the MRO. Classes this spec introduced are.
        let expose_from = if explicit_primary { 0 } else { 1.min(classes.len()) };
        self.realize(
            &typ,
            classes.get(expose_from..).unwrap_or(&[]),
            expose_from,
            &spec.sources,
            spec.doc.as_deref(),
            ctx,
        )?;
        typ.set_state(TypeState::Ready);

        // Only host classes this spec itself introduced are published;
        // an inherited primary is already bound (or deliberately not
        // bound) by the type that introduced it.
        let skip = if explicit_primary { 0 } else { 1.min(reps) };
        publish_reps(&typ, &classes[..reps], skip, ctx);

        log::debug!("crafted type '{}' ready", typ.name());
        Ok(typ)
    }

    fn build_subclass(&self, spec: SubclassSpec, ctx: &Context) -> PyResult<PyTypeRef> {
        let bases = if spec.bases.is_empty() {
            vec![ctx.types.object_type.clone()]
        } else {
            spec.bases.clone()
        };
        let (_, solid) = best_base(&bases, ctx)?;

        let base_dict = match &solid.host {
            HostClass::Synthetic(layout) => layout.has_dict,
            HostClass::Native { .. } => false,
        };
        let effective_dict = spec.has_dict || base_dict;
        let adds_storage = !spec.slots.is_empty() || (effective_dict && !base_dict);

        let host = if !adds_storage && solid.flags.contains(TypeFlags::REPLACEABLE) {
            // No storage beyond a carrier solid base: the leaf reuses the
            // base's host class and joins its clique.
            solid.host.clone()
        } else {
            let key = LayoutKey::new(&solid.host, &spec.slots, effective_dict);
            let mut layouts = self.layouts.lock();
            match layouts.get(&key) {
                Some(layout) => {
                    log::debug!("subclass layout cache hit for '{}'", spec.name);
                    HostClass::Synthetic(layout.clone())
                }
                None => {
                    let layout = Arc::new(SyntheticLayout::new(
                        solid.host.clone(),
                        spec.slots.clone(),
                        effective_dict,
                    ));
                    log::debug!(
                        "minted host class {} for '{}'",
                        layout.describe(),
                        spec.name
                    );
                    layouts.insert(key, layout.clone());
                    HostClass::Synthetic(layout)
                }
            }
        };

        let mut flags = TypeFlags::REPLACEABLE | TypeFlags::BASETYPE;
        if effective_dict {
            flags |= TypeFlags::HAS_DICT;
        }
        if !spec.slots.is_empty() {
            flags |= TypeFlags::HAS_SLOTS;
        }

        let accepted: Box<[SelfClass]> = match &host {
            HostClass::Synthetic(_) => Box::new([SelfClass::of::<SharedInstance>()]),
            HostClass::Native { .. } => solid.accepted[..1].to_vec().into_boxed_slice(),
        };

        let typ = PyType::new_shell(&spec.name, bases, host.clone(), accepted, 1, flags)
            .map_err(|msg| ctx.new_type_error(msg))?;
        *typ.canonical.write() = *solid.canonical.read();
        *typ.constructors.write() = solid.constructors.read().clone();

        // Own attributes: one member descriptor per slot, an instance
        // dictionary accessor when this spec introduced the dict.
        {
            let mut attrs = typ.attributes.write();
            if let HostClass::Synthetic(layout) = &host {
                for (i, slot_name) in layout.slot_names.iter().enumerate() {
                    let member = PyMemberDescriptor {
                        typ: typ.clone(),
                        name: slot_name.clone(),
                        doc: None,
                        readonly: false,
                        access: MemberAccess::Slot(layout.slot_offset + i),
                    };
                    attrs.insert(intern_str(slot_name), member.into_object());
                }
                if effective_dict && !base_dict {
                    let getset = PyGetSet {
                        typ: typ.clone(),
                        name: "__dict__",
                        doc: None,
                        slots: Box::new([GetSetSlot {
                            index: 0,
                            self_class: SelfClass::of::<SharedInstance>(),
                            getter: instance_dict_getter,
                            setter: None,
                        }]),
                    };
                    attrs.insert(intern_str("__dict__"), getset.into_ref().into_object());
                }
            }
            if let Some(doc) = &spec.doc {
                attrs.insert(intern_str("__doc__"), ctx.new_str(doc).into_object());
            }
        }

        typ.set_state(TypeState::Exposed);
        typ.set_state(TypeState::Ready);
        if matches!(host, HostClass::Synthetic(_)) {
            SharedInstance::ensure_registered(ctx);
        }
        log::debug!("subclass '{}' ready on {:?}", typ.name(), typ.host);
        Ok(typ)
    }

    /// Exposure for a type under construction: scans the implementation
    /// classes, builds descriptors, fills the attribute table and the
    /// constructor index.
    pub(crate) fn realize(
        &self,
        typ: &PyTypeRef,
        classes: &[ExposedClass],
        first_index: usize,
        sources: &[&'static expose::ClassDefs],
        doc: Option<&str>,
        ctx: &Context,
    ) -> PyResult<()> {
        let exposure = expose::scan(classes, first_index, sources, typ.name(), ctx)?;

        let mut attrs = typ.attributes.write();
        for spec in exposure.attrs {
            let (name, value): (&'static str, PyObjectRef) = match spec {
                AttrSpec::Wrapper { name, doc, entries } => {
                    let wrapped = entries
                        .into_iter()
                        .map(|e| WrappedSlot {
                            index: e.index,
                            self_class: e.self_class,
                            func: e.func,
                        })
                        .collect();
                    (
                        intern_str(name),
                        PyWrapper {
                            typ: typ.clone(),
                            name,
                            wrapped,
                            doc: Some(doc),
                        }
                        .into_object(),
                    )
                }
                AttrSpec::Method {
                    name,
                    params,
                    doc,
                    entries,
                } => {
                    let parser = ArgParser::new(name, params, ctx)?;
                    let impls = entries
                        .into_iter()
                        .map(|e| MethodSlot {
                            index: e.index,
                            self_class: e.self_class,
                            func: e.func,
                        })
                        .collect();
                    (
                        intern_str(name),
                        PyMethodDescriptor {
                            typ: typ.clone(),
                            name,
                            doc,
                            parser,
                            impls,
                        }
                        .into_object(),
                    )
                }
                AttrSpec::Static {
                    name,
                    params,
                    doc,
                    func,
                } => {
                    let parser = ArgParser::new(name, params, ctx)?;
                    (
                        intern_str(name),
                        PyStaticMethod {
                            typ: typ.clone(),
                            name,
                            doc,
                            parser,
                            func,
                        }
                        .into_object(),
                    )
                }
                AttrSpec::GetSet { name, doc, entries } => {
                    let slots = entries
                        .into_iter()
                        .map(|e| GetSetSlot {
                            index: e.index,
                            self_class: e.self_class,
                            getter: e.getter,
                            setter: e.setter,
                        })
                        .collect();
                    (
                        intern_str(name),
                        PyGetSet {
                            typ: typ.clone(),
                            name,
                            doc,
                            slots,
                        }
                        .into_object(),
                    )
                }
                AttrSpec::Member {
                    name,
                    doc,
                    readonly,
                    getter,
                    setter,
                } => (
                    intern_str(name),
                    PyMemberDescriptor {
                        typ: typ.clone(),
                        name: name.to_owned(),
                        doc: doc.map(str::to_owned),
                        readonly,
                        access: MemberAccess::Fn {
                            get: getter,
                            set: setter,
                        },
                    }
                    .into_object(),
                ),
                AttrSpec::New { doc, func } => (
                    intern_str("__new__"),
                    PyNewMethod {
                        typ: typ.clone(),
                        doc,
                        func,
                    }
                    .into_object(),
                ),
            };
            attrs.insert(name, value);
        }
        if let Some(doc) = doc {
            attrs
                .entry(intern_str("__doc__"))
                .or_insert_with(|| ctx.new_str(doc).into_object());
        }
        drop(attrs);

        if !exposure.constructors.is_empty() {
            *typ.constructors.write() = exposure.constructors;
        }
        typ.set_state(TypeState::Exposed);
        Ok(())
    }

    /// Bootstrap-time realization of a builtin type. Any failure here is a
    /// broken image.
    pub(crate) fn realize_builtin(
        &self,
        typ: &PyTypeRef,
        rep_classes: &[ExposedClass],
        doc: &str,
        ctx: &Context,
    ) {
        self.realize_builtin_with(typ, rep_classes, &[], doc, ctx);
    }

    pub(crate) fn realize_builtin_with(
        &self,
        typ: &PyTypeRef,
        rep_classes: &[ExposedClass],
        accepted_only: &[ExposedClass],
        doc: &str,
        ctx: &Context,
    ) {
        self.with_lock(|| {
            let classes: Vec<ExposedClass> = rep_classes
                .iter()
                .chain(accepted_only)
                .copied()
                .collect();
            *typ.canonical.write() = rep_classes.first().copied();
            if let Err(err) = self.realize(typ, &classes, 0, &[], Some(doc), ctx) {
                interpreter_error(format_args!(
                    "bootstrap failure exposing '{}': {}",
                    typ.name(),
                    err.message()
                ));
            }
            typ.set_state(TypeState::Ready);
            publish_reps(typ, rep_classes, 0, ctx);
        });
    }

    /// Bootstrap-time realization of a type that only derives: no own
    /// implementation classes, canonical and constructors inherited.
    pub(crate) fn realize_derived(&self, typ: &PyTypeRef, doc: &str, ctx: &Context) {
        self.with_lock(|| {
            let base = typ
                .base
                .clone()
                .unwrap_or_else(|| interpreter_error("derived type without a base"));
            *typ.canonical.write() = *base.canonical.read();
            *typ.constructors.write() = base.constructors.read().clone();
            typ.set_attr_raw(intern_str("__doc__"), ctx.new_str(doc).into_object());
            typ.set_state(TypeState::Exposed);
            typ.set_state(TypeState::Ready);
        });
    }

    /// Auto-discovery: mints a found type for a host class the registry
    /// has never seen. Runs under the factory lock and re-checks first.
    pub(crate) fn discover(&self, obj: &PyObject, ctx: &Context) -> Representation {
        self.with_lock(|| {
            if let Some(rep) = ctx.registry.lookup(obj.host_class()) {
                return rep;
            }
            let name = obj.host_name();
            let class = SelfClass::Class {
                id: obj.host_class(),
                name,
            };
            let typ = PyType::new_shell(
                name,
                vec![ctx.types.object_type.clone()],
                HostClass::Native {
                    id: obj.host_class(),
                    name,
                },
                Box::new([class]),
                1,
                TypeFlags::IMMUTABLE,
            )
            .unwrap_or_else(|msg| interpreter_error(msg));
            typ.set_state(TypeState::Exposed);
            typ.set_state(TypeState::Ready);
            let rep = Representation::Simple(typ);
            ctx.registry.publish(obj.host_class(), name, rep.clone());
            log::debug!("discovered found type '{name}'");
            rep
        })
    }
}

impl std::fmt::Debug for TypeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeFactory").finish_non_exhaustive()
    }
}

fn host_of(class: &SelfClass, base: &PyTypeRef) -> HostClass {
    match class {
        SelfClass::Class { id, name } => HostClass::Native { id: *id, name },
        SelfClass::Any => base.host.clone(),
    }
}

/// Publishes representations for the leading `classes` of a READY type,
/// skipping the first `skip` (inherited) entries. A carrier class gets a
/// shared representation; a sole class is the type's simple
/// representation; anything else is adopted at its index.
fn publish_reps(typ: &PyTypeRef, classes: &[ExposedClass], skip: usize, ctx: &Context) {
    for (index, exposed) in classes.iter().enumerate().skip(skip) {
        let SelfClass::Class { id, name } = exposed.class else {
            continue;
        };
        let rep = if let Some(carrier) = exposed.defs.carrier {
            Representation::Shared { carrier }
        } else if classes.len() == 1 {
            Representation::Simple(typ.clone())
        } else {
            Representation::Adopted {
                owner: typ.clone(),
                index,
            }
        };
        ctx.registry.publish(id, name, rep);
    }
}

fn instance_dict_getter(zelf: &PyObject, ctx: &Context) -> PyResult {
    let instance = zelf.downcast_ref::<SharedInstance>().unwrap();
    let snapshot = crate::builtins::dict::PyDict::default();
    if let Some(dict) = instance.dict() {
        for key in dict.keys() {
            if let Some(value) = dict.get_item(&key) {
                snapshot.set_item(&key, value);
            }
        }
    }
    Ok(snapshot.into_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SubclassSpec, TypeSpec};

    macro_rules! probe_payloads {
        ($($name:ident),+) => {
            $(
                #[derive(Debug)]
                struct $name;
                impl crate::object::PyPayload for $name {
                    const HOST_NAME: &'static str = stringify!($name);
                }
            )+
            fn probe_specs() -> Vec<(TypeSpec, PyObjectRef)> {
                vec![$(
                    (
                        TypeSpec::new(stringify!($name))
                            .primary(ExposedClass::of::<$name>(
                                &expose::ClassDefs::EMPTY,
                            )),
                        PyObjectRef::new($name),
                    ),
                )+]
            }
        };
    }

    probe_payloads!(
        Pr00, Pr01, Pr02, Pr03, Pr04, Pr05, Pr06, Pr07, Pr08, Pr09, Pr10, Pr11,
        Pr12, Pr13, Pr14, Pr15, Pr16, Pr17, Pr18, Pr19
    );

    /// Twenty threads each craft a fresh type; every thread's instances
    /// resolve to that thread's type afterwards.
    #[test]
    fn concurrent_publication() {
        let ctx = Context::genesis();
        let handles: Vec<_> = probe_specs()
            .into_iter()
            .map(|(spec, instance)| {
                std::thread::spawn(move || {
                    let ctx = Context::genesis();
                    let typ = ctx.factory.from_spec(spec, ctx).unwrap();
                    assert!(typ.is_ready());
                    let resolved = crate::ops::type_of(&instance, ctx);
                    assert!(resolved.is(&typ));
                    typ
                })
            })
            .collect();
        let mut types = Vec::new();
        for handle in handles {
            types.push(handle.join().unwrap());
        }
        // All READY types expose a consistent attribute view.
        for typ in &types {
            assert!(typ.lookup("__class__").is_some());
        }
    }

    /// Equal layout keys yield the identical host class; distinct keys do
    /// not.
    #[test]
    fn subclass_synthesis_is_cached_by_layout() {
        let ctx = Context::genesis();
        let list = ctx.types.list_type.clone();
        let a = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("CacheA").base(list.clone()).slot("a"),
                ctx,
            )
            .unwrap();
        let b = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("CacheB").base(list.clone()).slot("a"),
                ctx,
            )
            .unwrap();
        let c = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("CacheC").base(list).slot("b"),
                ctx,
            )
            .unwrap();
        assert!(a.host.same_layout(&b.host));
        assert!(!a.host.same_layout(&c.host));
    }

    /// A subclass that adds nothing over a carrier solid base joins the
    /// base's clique instead of minting a layout.
    #[test]
    fn storage_free_leaf_reuses_carrier_host() {
        let ctx = Context::genesis();
        let a = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("LeafBase")
                    .base(ctx.types.object_type.clone())
                    .slot("x"),
                ctx,
            )
            .unwrap();
        let b = ctx
            .factory
            .from_subclass_spec(SubclassSpec::new("Leaf").base(a.clone()), ctx)
            .unwrap();
        assert!(a.host.same_layout(&b.host));
    }

    #[test]
    fn layout_equivalence_is_an_equivalence_relation() {
        let ctx = Context::genesis();
        let float = ctx.types.float_type.clone();
        let mk = |name: &str| {
            ctx.factory
                .from_subclass_spec(
                    SubclassSpec::new(name).base(float.clone()).slot("tag"),
                    ctx,
                )
                .unwrap()
        };
        let (a, b, c) = (mk("EqA"), mk("EqB"), mk("EqC"));
        // reflexive, symmetric, transitive
        assert!(a.host.same_layout(&a.host));
        assert!(a.host.same_layout(&b.host) && b.host.same_layout(&a.host));
        assert!(b.host.same_layout(&c.host) && a.host.same_layout(&c.host));
    }

    #[test]
    fn incompatible_solid_bases_conflict() {
        let ctx = Context::genesis();
        let spec = SubclassSpec::new("Torn")
            .base(ctx.types.float_type.clone())
            .base(ctx.types.list_type.clone());
        let err = ctx.factory.from_subclass_spec(spec, ctx).unwrap_err();
        assert!(err.message().contains("instance layout conflict"));
    }

    use crate::object::PyObjectRef;
}
