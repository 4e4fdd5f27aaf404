//! `object`, the root of every MRO. Its implementations accept any
//! receiver; everything else a type does not define falls through to
//! these.

use crate::builtins::type_::{PyType, PyTypeRef};
use crate::expose::{
    ClassDefs, ConstructorDef, ExposedClass, GetSetDef, NewDef, ParamClass, SlotDef,
};
use crate::builtins::descriptor::SlotFunc;
use crate::function::{FuncArgs, PySetterValue};
use crate::object::{PyObject, PyPayload};
use crate::types::TypeFlags;
use crate::types::synthesis::{self, SharedInstance};
use crate::{Context, PyResult};

/// Payload of a plain `object()` instance.
#[derive(Debug)]
pub struct PyBaseObject;

impl PyPayload for PyBaseObject {
    const HOST_NAME: &'static str = "PyBaseObject";
}

fn object_repr(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    Ok(format!(
        "<{} object at {:#x}>",
        crate::ops::type_of(zelf, ctx).name(),
        zelf.get_id()
    ))
}

/// Default `__str__` falls through to `repr()`.
fn object_str(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let s = crate::ops::repr(zelf, ctx)?;
    Ok(s.as_str().to_owned())
}

fn object_get_class(zelf: &PyObject, ctx: &Context) -> PyResult {
    Ok(crate::ops::type_of(zelf, ctx).into_object())
}

fn object_set_class(
    zelf: &PyObject,
    value: PySetterValue,
    ctx: &Context,
) -> PyResult<()> {
    let value = match value {
        PySetterValue::Assign(v) => v,
        PySetterValue::Delete => {
            return Err(ctx.new_type_error("can't delete __class__ attribute"));
        }
    };
    let target = value.downcast::<PyType>().map_err(|other| {
        ctx.new_type_error(format!(
            "__class__ must be set to a class, not '{}' object",
            crate::ops::type_of(&*other, ctx).name()
        ))
    })?;
    let current = crate::ops::type_of(zelf, ctx);
    if !current.host.same_layout(&target.host) {
        return Err(ctx.new_type_error(format!(
            "__class__ assignment: '{}' object layout differs from '{}'",
            target.name(),
            current.name()
        )));
    }
    if !current.flags.contains(TypeFlags::REPLACEABLE)
        || !target.flags.contains(TypeFlags::REPLACEABLE)
    {
        return Err(ctx.new_type_error(
            "__class__ assignment only supported for mutable types",
        ));
    }
    synthesis::replace_carried_type(zelf, target, ctx)
}

fn object_new(cls: &PyTypeRef, args: FuncArgs, ctx: &Context) -> PyResult {
    if cls.is(&ctx.types.object_type) {
        if !args.is_empty() {
            return Err(ctx.new_type_error("object() takes no arguments"));
        }
        return Ok(PyBaseObject.into_object());
    }
    synthesis::construct_via_index(cls, &args, ctx)
}

fn base_object_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    if !args.args.is_empty() || !args.kwargs.is_empty() {
        return Err(ctx.new_type_error(format!("{}() takes no arguments", cls.name())));
    }
    synthesis::adopt_instance(cls, PyBaseObject.into_object(), ctx)
}

pub(crate) static OBJECT_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(object_repr),
        },
        SlotDef {
            name: "__str__",
            func: SlotFunc::Stringify(object_str),
        },
    ],
    getsets: &[GetSetDef {
        name: "__class__",
        doc: Some("the object's class"),
        getter: object_get_class,
        setter: Some(object_set_class),
    }],
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type],
        func: base_object_ctor,
    }],
    new: Some(NewDef {
        doc: Some("Create and return a new object."),
        func: object_new,
    }),
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of_universal::<PyBaseObject>(&OBJECT_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.object_type,
        &classes(),
        "The base class of the class hierarchy.",
        ctx,
    );
    // The shared carrier of synthesised instances resolves through the
    // registry as soon as the root type exists.
    SharedInstance::ensure_registered(ctx);
}
