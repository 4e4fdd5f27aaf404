//! The Python type object: name, base, MRO, attribute table, feature
//! flags, accepted representations, and the constructor index. Types are
//! created only by the factory and become visible to other threads when
//! READY.

use crate::expose::{
    ClassDefs, ConstructorDef, ExposedClass, GetSetDef, SelfClass, SlotDef,
};
use crate::builtins::descriptor::SlotFunc;
use crate::function::FuncArgs;
use crate::object::{PyObject, PyObjectRef, PyPayload, PyRef};
use crate::types::{HostClass, TypeFlags, TypeState};
use crate::{Context, PyResult};
use indexmap::IndexMap;
use itertools::Itertools;
use ophidian_common::lock::PyRwLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Attribute tables key on interned names; insertion order is kept only
/// for reproducibility of listings.
pub type PyAttributes = IndexMap<&'static str, PyObjectRef, ahash::RandomState>;

pub struct PyType {
    name: String,
    pub base: Option<PyTypeRef>,
    pub bases: Vec<PyTypeRef>,
    pub mro: PyRwLock<Vec<PyTypeRef>>,
    pub attributes: PyRwLock<PyAttributes>,
    pub flags: TypeFlags,
    state: AtomicU8,
    /// Primary host class of instances.
    pub host: HostClass,
    /// Ordered accepted classes; index 0 is the canonical representation.
    pub accepted: Box<[SelfClass]>,
    /// How many leading entries of `accepted` are representations of this
    /// type (the rest are accepted-only foreign classes).
    pub(crate) reps: usize,
    /// Host constructors indexed by parameter signature.
    pub(crate) constructors: PyRwLock<Vec<&'static ConstructorDef>>,
    /// The primary implementation class, inherited by derived specs.
    pub(crate) canonical: PyRwLock<Option<ExposedClass>>,
}

pub type PyTypeRef = PyRef<PyType>;

impl PyPayload for PyType {
    const HOST_NAME: &'static str = "PyType";
}

impl std::fmt::Debug for PyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[PyType {}]", self.name)
    }
}

impl PyType {
    /// Allocates a linked type: identity, bases, and MRO in place, no
    /// attributes yet. Errors are plain strings; the factory converts.
    pub(crate) fn new_shell(
        name: &str,
        bases: Vec<PyTypeRef>,
        host: HostClass,
        accepted: Box<[SelfClass]>,
        reps: usize,
        flags: TypeFlags,
    ) -> Result<PyTypeRef, String> {
        let mro = if bases.is_empty() {
            Vec::new()
        } else {
            let mut unique = Vec::new();
            for base in &bases {
                if unique.iter().any(|b: &PyTypeRef| b.is(base)) {
                    return Err(format!("duplicate base class {}", base.name()));
                }
                unique.push(base.clone());
            }
            linearise_mro(bases.iter().map(|b| b.mro_vec()).collect())?
        };

        // A subclass of a dict-carrying or slot-carrying type keeps the
        // storage of every ancestor.
        let mut flags = flags;
        for base in &bases {
            flags |= base.flags & (TypeFlags::HAS_DICT | TypeFlags::HAS_SLOTS);
        }

        let typ = PyRef::new(PyType {
            name: name.to_owned(),
            base: bases.first().cloned(),
            bases,
            mro: PyRwLock::new(mro),
            attributes: PyRwLock::new(PyAttributes::default()),
            flags,
            state: AtomicU8::new(TypeState::New as u8),
            host,
            accepted,
            reps,
            constructors: PyRwLock::new(Vec::new()),
            canonical: PyRwLock::new(None),
        });
        typ.mro.write().insert(0, typ.clone());
        typ.set_state(TypeState::Linked);
        Ok(typ)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mro_vec(&self) -> Vec<PyTypeRef> {
        self.mro.read().clone()
    }

    pub(crate) fn state(&self) -> TypeState {
        TypeState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: TypeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.state() == TypeState::Ready
    }

    /// The host classes whose instances this type represents: the leading
    /// window of the accepted vector, before accepted-only foreign
    /// classes.
    pub fn accepted_reps(&self) -> &[SelfClass] {
        &self.accepted[..self.reps]
    }

    /// Attribute from this type's own table.
    pub fn attr(&self, name: &str) -> Option<PyObjectRef> {
        self.attributes.read().get(name).cloned()
    }

    /// First entry for `name` along the MRO, with the defining type.
    pub fn lookup(&self, name: &str) -> Option<(PyObjectRef, PyTypeRef)> {
        for entry in self.mro.read().iter() {
            if let Some(attr) = entry.attr(name) {
                return Some((attr, entry.clone()));
            }
        }
        None
    }

    /// Whether `self` is `other` or derives from it.
    pub fn fast_issubclass(&self, other: &PyTypeRef) -> bool {
        self.mro.read().iter().any(|t| t.is(other))
    }

    pub(crate) fn set_attr_raw(&self, name: &'static str, value: PyObjectRef) {
        self.attributes.write().insert(name, value);
    }

    /// The type of any object; the universal entry point.
    pub fn of(obj: &PyObject) -> PyTypeRef {
        let ctx = Context::genesis();
        ctx.registry.resolve(obj, ctx).python_type(obj)
    }
}

impl PyType {
    /// Attribute assignment on the type object itself.
    pub fn type_set_attr(
        &self,
        name: &str,
        value: PyObjectRef,
        ctx: &Context,
    ) -> PyResult<()> {
        if self.flags.contains(TypeFlags::IMMUTABLE) {
            return Err(ctx.new_type_error(format!(
                "cannot set '{}' attribute of immutable type '{}'",
                name,
                self.name()
            )));
        }
        self.set_attr_raw(crate::intern::intern_str(name), value);
        Ok(())
    }

    pub fn type_del_attr(&self, name: &str, ctx: &Context) -> PyResult<()> {
        if self.flags.contains(TypeFlags::IMMUTABLE) {
            return Err(ctx.new_type_error(format!(
                "cannot delete '{}' attribute of immutable type '{}'",
                name,
                self.name()
            )));
        }
        let removed = self.attributes.write().shift_remove(name);
        if removed.is_none() {
            return Err(ctx.new_attribute_error(format!(
                "type object '{}' has no attribute '{}'",
                self.name(),
                name
            )));
        }
        Ok(())
    }
}

/// C3 linearisation over the MROs of the direct bases. Children precede
/// parents; direct bases keep their left-to-right order; inconsistent
/// hierarchies are rejected.
pub(crate) fn linearise_mro(
    mut bases: Vec<Vec<PyTypeRef>>,
) -> Result<Vec<PyTypeRef>, String> {
    // Local precedence ordering: no direct base may appear in the tail of
    // a later base's MRO.
    for (i, base_mro) in bases.iter().enumerate() {
        let base = &base_mro[0];
        for later in &bases[i + 1..] {
            if later[1..].iter().any(|t| t.is(base)) {
                return Err(
                    "Unable to find mro order which keeps local precedence ordering"
                        .to_owned(),
                );
            }
        }
    }

    let mut result = Vec::new();
    while !bases.is_empty() {
        let head = take_next_base(&mut bases).ok_or_else(|| {
            format!(
                "Cannot create a consistent method resolution order (MRO) for bases {}",
                bases
                    .iter()
                    .map(|x| x.first().unwrap().name().to_owned())
                    .format(", ")
            )
        })?;
        result.push(head);
        bases.retain(|x| !x.is_empty());
    }
    Ok(result)
}

/// A good head is one that appears in no list's tail.
fn take_next_base(bases: &mut Vec<Vec<PyTypeRef>>) -> Option<PyTypeRef> {
    let head = bases.iter().map(|lst| lst[0].clone()).find(|head| {
        !bases.iter().any(|lst| lst[1..].iter().any(|t| t.is(head)))
    })?;
    for lst in bases.iter_mut() {
        if lst[0].is(&head) {
            lst.remove(0);
        }
    }
    Some(head)
}

/// Whether instances of `typ` have a different host shape from instances
/// of its base, i.e. whether `typ` adds storage.
fn shape_differs(typ: &PyTypeRef, base: &PyTypeRef) -> bool {
    !typ.host.same_layout(&base.host)
}

/// The nearest ancestor (or `typ` itself) that adds storage.
pub(crate) fn solid_base(typ: &PyTypeRef, ctx: &Context) -> PyTypeRef {
    let base = match &typ.base {
        Some(base) => solid_base(base, ctx),
        None => ctx.types.object_type.clone(),
    };
    if shape_differs(typ, &base) {
        typ.clone()
    } else {
        base
    }
}

/// Selects the base whose solid base is most derived. Requires a single
/// most-derived candidate; incomparable candidates are a layout conflict.
pub(crate) fn best_base<'a>(
    bases: &'a [PyTypeRef],
    ctx: &Context,
) -> PyResult<(&'a PyTypeRef, PyTypeRef)> {
    let mut base: Option<&'a PyTypeRef> = None;
    let mut winner: Option<PyTypeRef> = None;

    for base_i in bases {
        if !base_i.flags.contains(TypeFlags::BASETYPE) {
            return Err(ctx.new_type_error(format!(
                "type '{}' is not an acceptable base type",
                base_i.name()
            )));
        }
        let candidate = solid_base(base_i, ctx);
        match &winner {
            None => {
                winner = Some(candidate);
                base = Some(base_i);
            }
            Some(w) if w.fast_issubclass(&candidate) => {}
            Some(w) if candidate.fast_issubclass(w) => {
                winner = Some(candidate);
                base = Some(base_i);
            }
            Some(_) => {
                return Err(
                    ctx.new_type_error("multiple bases have instance layout conflict")
                );
            }
        }
    }

    let base = base.expect("best_base called with no bases");
    Ok((base, winner.unwrap()))
}

// Exposure of `type` itself.

fn type_repr(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    let typ = zelf.downcast_ref::<PyType>().unwrap();
    Ok(format!("<class '{}'>", typ.name()))
}

fn type_call(zelf: &PyObject, args: FuncArgs, ctx: &Context) -> PyResult {
    let cls = zelf.downcast_ref::<PyType>().unwrap();
    let mro0 = cls.mro.read()[0].clone();
    crate::callable::call_type(&mro0, args, ctx)
}

fn type_get_name(zelf: &PyObject, ctx: &Context) -> PyResult {
    let typ = zelf.downcast_ref::<PyType>().unwrap();
    Ok(ctx.new_str(typ.name()).into_object())
}

fn type_get_mro(zelf: &PyObject, ctx: &Context) -> PyResult {
    let typ = zelf.downcast_ref::<PyType>().unwrap();
    let items = typ
        .mro_vec()
        .into_iter()
        .map(|t| t.into_object())
        .collect();
    Ok(ctx.new_tuple(items).into_object())
}

fn type_get_base(zelf: &PyObject, ctx: &Context) -> PyResult {
    let typ = zelf.downcast_ref::<PyType>().unwrap();
    Ok(match &typ.base {
        Some(base) => base.clone().into_object(),
        None => ctx.none(),
    })
}

pub(crate) static TYPE_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(type_repr),
        },
        SlotDef {
            name: "__call__",
            func: SlotFunc::Call(type_call),
        },
    ],
    getsets: &[
        GetSetDef {
            name: "__name__",
            doc: None,
            getter: type_get_name,
            setter: None,
        },
        GetSetDef {
            name: "__mro__",
            doc: None,
            getter: type_get_mro,
            setter: None,
        },
        GetSetDef {
            name: "__base__",
            doc: None,
            getter: type_get_base,
            setter: None,
        },
    ],
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyType>(&TYPE_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.type_type,
        &classes(),
        "type(object) -> the object's type",
        ctx,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSpec;

    fn fresh(ctx: &'static Context, name: &str, bases: &[&PyTypeRef]) -> PyTypeRef {
        let mut spec = TypeSpec::new(name);
        for base in bases {
            spec = spec.base((*base).clone());
        }
        ctx.factory.from_spec(spec, ctx).unwrap()
    }

    fn names(mro: &[PyTypeRef]) -> Vec<String> {
        mro.iter().map(|t| t.name().to_owned()).collect()
    }

    #[test]
    fn linearise_keeps_children_before_parents() {
        let ctx = Context::genesis();
        let object = &ctx.types.object_type;
        let a = fresh(ctx, "LinA", &[object]);
        let b = fresh(ctx, "LinB", &[object]);
        let c = fresh(ctx, "LinC", &[&a, &b]);
        assert_eq!(
            names(&c.mro_vec()),
            vec!["LinC", "LinA", "LinB", "object"]
        );
    }

    #[test]
    fn diamond_is_linearised() {
        let ctx = Context::genesis();
        let object = &ctx.types.object_type;
        let top = fresh(ctx, "DiaTop", &[object]);
        let left = fresh(ctx, "DiaLeft", &[&top]);
        let right = fresh(ctx, "DiaRight", &[&top]);
        let bottom = fresh(ctx, "DiaBottom", &[&left, &right]);
        assert_eq!(
            names(&bottom.mro_vec()),
            vec!["DiaBottom", "DiaLeft", "DiaRight", "DiaTop", "object"]
        );
    }

    #[test]
    fn inconsistent_hierarchy_is_rejected() {
        let ctx = Context::genesis();
        let object = &ctx.types.object_type;
        let a = fresh(ctx, "OrdA", &[object]);
        let b = fresh(ctx, "OrdB", &[&a]);
        // (A, B) violates local precedence: A precedes its own subclass.
        let spec = TypeSpec::new("OrdC").base(a.clone()).base(b.clone());
        let err = ctx.factory.from_spec(spec, ctx).unwrap_err();
        assert!(err.message().contains("local precedence"));
    }

    #[test]
    fn immutable_type_rejects_mutation() {
        let ctx = Context::genesis();
        let int = ctx.types.int_type.clone();
        let err = int
            .type_set_attr("shiny", ctx.new_int(1), ctx)
            .unwrap_err();
        assert!(err.message().contains("immutable type 'int'"));
    }

    #[test]
    fn mutable_type_attribute_round_trip() {
        let ctx = Context::genesis();
        let t = fresh(ctx, "MutAttr", &[&ctx.types.object_type]);
        t.type_set_attr("marker", ctx.new_int(11), ctx).unwrap();
        let got = t.attr("marker").unwrap();
        assert_eq!(
            crate::builtins::int::int_value(&got).unwrap(),
            11.into()
        );
        t.type_del_attr("marker", ctx).unwrap();
        let err = t.type_del_attr("marker", ctx).unwrap_err();
        assert!(err.typ().is(&ctx.exceptions.attribute_error));
    }

    /// Store-buffering litmus: with the attribute table behind one lock,
    /// two threads that each write one attribute and then read the other's
    /// can never both observe the pre-write state.
    #[test]
    fn attribute_table_is_sequentially_consistent() {
        let ctx = Context::genesis();
        for round in 0..200 {
            let t = fresh(ctx, &format!("Litmus{round}"), &[&ctx.types.object_type]);
            let t1 = t.clone();
            let t2 = t.clone();
            let a = std::thread::spawn(move || {
                let ctx = Context::genesis();
                t1.type_set_attr("x", ctx.new_int(1), ctx).unwrap();
                t1.attr("y").is_some()
            });
            let b = std::thread::spawn(move || {
                let ctx = Context::genesis();
                t2.type_set_attr("y", ctx.new_int(1), ctx).unwrap();
                t2.attr("x").is_some()
            });
            let saw_y = a.join().unwrap();
            let saw_x = b.join().unwrap();
            assert!(saw_x || saw_y, "both threads read stale state");
        }
    }
}
