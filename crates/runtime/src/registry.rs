//! The process-wide mapping from host class to [`Representation`].
//!
//! Reads are concurrent (shared lock on a hash map); every mutation is
//! performed while the type factory's serialisation lock is held, so a
//! reader that observes a representation observes the fully initialised
//! type behind it.

use crate::representation::Representation;
use crate::{Context, interpreter_error};
use crate::object::PyObject;
use ophidian_common::lock::PyRwLock;
use std::any::TypeId;
use std::collections::HashMap;

pub struct TypeRegistry {
    map: PyRwLock<HashMap<TypeId, Representation, ahash::RandomState>>,
}

impl TypeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            map: PyRwLock::new(HashMap::default()),
        }
    }

    /// Pure lookup: the representation of `host`, if one was published.
    pub fn lookup(&self, host: TypeId) -> Option<Representation> {
        self.map.read().get(&host).cloned()
    }

    /// The representation of `obj`'s host class, registering a found type
    /// for it if the class has never been seen. The slow path re-checks
    /// under the factory lock before minting anything.
    pub fn resolve(&self, obj: &PyObject, ctx: &Context) -> Representation {
        if let Some(rep) = self.lookup(obj.host_class()) {
            return rep;
        }
        ctx.factory.discover(obj, ctx)
    }

    /// Publishes a representation for `host`. Called only while the
    /// factory lock is held. Publishing an identical binding twice is a
    /// no-op; publishing a conflicting one is a broken invariant.
    pub(crate) fn publish(&self, host: TypeId, host_name: &str, rep: Representation) {
        let mut map = self.map.write();
        match map.get(&host) {
            None => {
                log::debug!("registry: {host_name} -> {rep:?}");
                map.insert(host, rep);
            }
            Some(existing) if existing.same_binding(&rep) => {}
            Some(existing) => interpreter_error(format_args!(
                "host class '{host_name}' already bound to {existing:?}, cannot rebind to {rep:?}"
            )),
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("classes", &self.map.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::object::{PyObjectRef, PyPayload};
    use crate::{Context, ops};

    #[derive(Debug)]
    struct Stray;
    impl PyPayload for Stray {
        const HOST_NAME: &'static str = "Stray";
    }

    /// For every live object, either the type's representation window
    /// contains the object's host class, or the type resolves through a
    /// shared representation.
    #[test]
    fn accepted_representation_invariant() {
        let ctx = Context::genesis();
        let samples: Vec<PyObjectRef> = vec![
            ctx.new_int(3),
            ctx.new_float(1.5).into_object(),
            PyObjectRef::new(2.5_f64),
            ctx.new_bool(true),
            ctx.new_str("s").into_object(),
            ctx.new_type_error("boom").into_object(),
        ];
        for obj in &samples {
            let typ = ops::type_of(obj, ctx);
            let shared = matches!(
                ctx.registry.lookup(obj.host_class()),
                Some(crate::Representation::Shared { .. })
            );
            let represented = typ.accepted_reps().iter().any(|c| c.accepts(obj));
            assert!(represented || shared, "{} unaccounted", obj.host_name());
        }
    }

    #[test]
    fn unseen_host_class_is_discovered_as_found_type() {
        let ctx = Context::genesis();
        let obj = PyObjectRef::new(Stray);
        let typ = ops::type_of(&obj, ctx);
        assert_eq!(typ.name(), "Stray");
        assert!(typ.base.as_ref().unwrap().is(&ctx.types.object_type));
        // resolution is stable
        assert!(ops::type_of(&obj, ctx).is(&typ));
    }

    #[derive(Debug)]
    struct Rebound;
    impl PyPayload for Rebound {
        const HOST_NAME: &'static str = "Rebound";
    }

    #[test]
    #[should_panic(expected = "InterpreterError")]
    fn conflicting_binding_is_fatal() {
        let ctx = Context::genesis();
        let host = std::any::TypeId::of::<Rebound>();
        ctx.registry.publish(
            host,
            "Rebound",
            crate::Representation::Simple(ctx.types.int_type.clone()),
        );
        ctx.registry.publish(
            host,
            "Rebound",
            crate::Representation::Simple(ctx.types.float_type.clone()),
        );
    }
}
