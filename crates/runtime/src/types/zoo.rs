//! Holder of the bootstrap types. `init` allocates every shell (name,
//! base, MRO, accepted classes) before the context exists; `extend` then
//! exposes and publishes them in a fixed order: `object`, `type`, the
//! descriptor types, then the remaining builtins in topological order of
//! their bases.
//!
//! The specifications of the bootstrap types live here and in the factory
//! rather than on the implementation classes, so no implementation class
//! ever constructs its own type during initialisation.

use crate::builtins::type_::{PyType, PyTypeRef};
use crate::builtins::{
    bool_, descriptor, dict, float, getset, int, list, object, pystr, singletons,
    tuple, type_,
};
use crate::expose::{ExposedClass, SelfClass};
use crate::types::{HostClass, TypeFlags};
use crate::{Context, interpreter_error};

/// References to the builtin types.
#[derive(Debug, Clone)]
pub struct TypeZoo {
    pub object_type: PyTypeRef,
    pub type_type: PyTypeRef,
    pub wrapper_descriptor_type: PyTypeRef,
    pub method_wrapper_type: PyTypeRef,
    pub method_descriptor_type: PyTypeRef,
    pub builtin_method_type: PyTypeRef,
    pub getset_type: PyTypeRef,
    pub member_descriptor_type: PyTypeRef,
    pub none_type: PyTypeRef,
    pub int_type: PyTypeRef,
    pub bool_type: PyTypeRef,
    pub float_type: PyTypeRef,
    pub str_type: PyTypeRef,
    pub tuple_type: PyTypeRef,
    pub list_type: PyTypeRef,
    pub dict_type: PyTypeRef,
}

/// Allocates one bootstrap shell. The primary host class comes from the
/// first representation class.
pub(crate) fn shell(
    name: &str,
    bases: Vec<PyTypeRef>,
    reps: &[ExposedClass],
    accepted_only: &[ExposedClass],
    flags: TypeFlags,
) -> PyTypeRef {
    let accepted: Box<[SelfClass]> = reps
        .iter()
        .chain(accepted_only)
        .map(|c| c.class)
        .collect();
    let host = match reps[0].class {
        SelfClass::Class { id, name } => HostClass::Native { id, name },
        SelfClass::Any => interpreter_error("bootstrap type without a host class"),
    };
    PyType::new_shell(name, bases, host, accepted, reps.len(), flags)
        .unwrap_or_else(|msg| interpreter_error(msg))
}

const FROZEN: TypeFlags = TypeFlags::IMMUTABLE;
const FROZEN_BASE: TypeFlags = TypeFlags::IMMUTABLE.union(TypeFlags::BASETYPE);

impl TypeZoo {
    #[cold]
    pub(crate) fn init() -> Self {
        // the order matters: every base precedes its subclasses
        let object_type = shell(
            "object",
            vec![],
            &object::classes(),
            &[],
            FROZEN_BASE,
        );
        let type_type = shell(
            "type",
            vec![object_type.clone()],
            &type_::classes(),
            &[],
            FROZEN_BASE.union(TypeFlags::IS_TYPE),
        );
        let int_type = shell(
            "int",
            vec![object_type.clone()],
            &int::rep_classes(),
            &int::accepted_classes(),
            FROZEN_BASE,
        );
        Self {
            wrapper_descriptor_type: shell(
                "wrapper_descriptor",
                vec![object_type.clone()],
                &descriptor::wrapper_classes(),
                &[],
                FROZEN,
            ),
            method_wrapper_type: shell(
                "method-wrapper",
                vec![object_type.clone()],
                &descriptor::bound_wrapper_classes(),
                &[],
                FROZEN,
            ),
            method_descriptor_type: shell(
                "method_descriptor",
                vec![object_type.clone()],
                &descriptor::method_descr_classes(),
                &[],
                FROZEN,
            ),
            builtin_method_type: shell(
                "builtin_function_or_method",
                vec![object_type.clone()],
                &descriptor::builtin_method_classes(),
                &[],
                FROZEN,
            ),
            getset_type: shell(
                "getset_descriptor",
                vec![object_type.clone()],
                &getset::classes(),
                &[],
                FROZEN,
            ),
            member_descriptor_type: shell(
                "member_descriptor",
                vec![object_type.clone()],
                &descriptor::member_descr_classes(),
                &[],
                FROZEN,
            ),
            none_type: shell(
                "NoneType",
                vec![object_type.clone()],
                &singletons::classes(),
                &[],
                FROZEN,
            ),
            bool_type: shell(
                "bool",
                vec![int_type.clone()],
                &bool_::classes(),
                &[],
                FROZEN,
            ),
            float_type: shell(
                "float",
                vec![object_type.clone()],
                &float::classes(),
                &[],
                FROZEN_BASE,
            ),
            str_type: shell(
                "str",
                vec![object_type.clone()],
                &pystr::classes(),
                &[],
                FROZEN_BASE,
            ),
            tuple_type: shell(
                "tuple",
                vec![object_type.clone()],
                &tuple::classes(),
                &[],
                FROZEN_BASE,
            ),
            list_type: shell(
                "list",
                vec![object_type.clone()],
                &list::classes(),
                &[],
                FROZEN_BASE,
            ),
            dict_type: shell(
                "dict",
                vec![object_type.clone()],
                &dict::classes(),
                &[],
                FROZEN_BASE,
            ),
            object_type,
            type_type,
            int_type,
        }
    }

    /// Exposes and publishes the bootstrap types. Runs inside genesis;
    /// everything is visible to other threads only after the whole pass.
    #[cold]
    pub(crate) fn extend(ctx: &Context) {
        object::extend(ctx);
        type_::extend(ctx);
        descriptor::extend(ctx);
        getset::extend(ctx);
        singletons::extend(ctx);
        int::extend(ctx);
        bool_::extend(ctx);
        float::extend(ctx);
        pystr::extend(ctx);
        tuple::extend(ctx);
        list::extend(ctx);
        dict::extend(ctx);
    }
}
