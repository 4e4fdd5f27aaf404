//! The abstract object API: the entry points operator-level machinery
//! calls. Everything here resolves the receiver's representation through
//! the registry, walks the MRO of the resulting type, and dispatches to
//! the implementation selected by the representation index. Nothing is
//! cached between calls.

use crate::builtins::descriptor::{self, PyMethodDescriptor, PyWrapper};
use crate::builtins::pystr::PyStr;
use crate::builtins::type_::{PyType, PyTypeRef};
use crate::function::{FuncArgs, PySetterValue};
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::synthesis::SharedInstance;
use crate::{Context, PyResult};

/// The Python type of any object.
pub fn type_of(obj: &PyObject, ctx: &Context) -> PyTypeRef {
    ctx.registry.resolve(obj, ctx).python_type(obj)
}

/// Invokes a special method by its reserved name: type-only lookup (the
/// instance namespace is never consulted), then representation-indexed
/// dispatch. `None` when the type hierarchy does not define the name.
pub(crate) fn invoke_special(
    obj: &PyObject,
    name: &str,
    args: FuncArgs,
    ctx: &Context,
) -> PyResult<Option<PyObjectRef>> {
    let Some((attr, _defining)) = type_of(obj, ctx).lookup(name) else {
        return Ok(None);
    };
    if let Some(wrapper) = attr.downcast_ref::<PyWrapper>() {
        return wrapper.invoke(obj, args, ctx).map(Some);
    }
    if let Some(method) = attr.downcast_ref::<PyMethodDescriptor>() {
        return method.invoke(obj, args, ctx).map(Some);
    }
    Err(ctx.new_type_error(format!(
        "'{}' object: special method '{}' is not a slot wrapper",
        type_of(obj, ctx).name(),
        name
    )))
}

fn expect_str(result: PyObjectRef, what: &str, ctx: &Context) -> PyResult<PyRef<PyStr>> {
    match result.downcast::<PyStr>() {
        Ok(s) => Ok(s),
        Err(other) => match other.downcast_ref::<String>() {
            Some(s) => Ok(ctx.new_str(s)),
            None => Err(ctx.new_type_error(format!(
                "{what} returned non-string (type {})",
                type_of(&*other, ctx).name()
            ))),
        },
    }
}

pub fn repr(obj: &PyObject, ctx: &Context) -> PyResult<PyRef<PyStr>> {
    match invoke_special(obj, "__repr__", FuncArgs::default(), ctx)? {
        Some(result) => expect_str(result, "__repr__", ctx),
        // every MRO ends at object; a typeless repr is still printable
        None => Ok(ctx.new_str(&format!("<{} at {:#x}>", obj.host_name(), obj.get_id()))),
    }
}

pub fn str_of(obj: &PyObject, ctx: &Context) -> PyResult<PyRef<PyStr>> {
    match invoke_special(obj, "__str__", FuncArgs::default(), ctx)? {
        Some(result) => expect_str(result, "__str__", ctx),
        None => repr(obj, ctx),
    }
}

pub fn neg(obj: &PyObject, ctx: &Context) -> PyResult {
    invoke_special(obj, "__neg__", FuncArgs::default(), ctx)?.ok_or_else(|| {
        ctx.new_type_error(format!(
            "bad operand type for unary -: '{}'",
            type_of(obj, ctx).name()
        ))
    })
}

pub fn add(a: &PyObjectRef, b: &PyObjectRef, ctx: &Context) -> PyResult {
    invoke_special(&**a, "__add__", FuncArgs::from(vec![b.clone()]), ctx)?.ok_or_else(
        || {
            ctx.new_type_error(format!(
                "unsupported operand type(s) for +: '{}' and '{}'",
                type_of(&**a, ctx).name(),
                type_of(&**b, ctx).name()
            ))
        },
    )
}

/// Truthiness: `__bool__` when defined, every object truthy otherwise.
pub fn is_true(obj: &PyObject, ctx: &Context) -> PyResult<bool> {
    match invoke_special(obj, "__bool__", FuncArgs::default(), ctx)? {
        Some(result) => result.downcast_ref::<bool>().copied().ok_or_else(|| {
            ctx.new_type_error(format!(
                "__bool__ should return bool, returned {}",
                type_of(&*result, ctx).name()
            ))
        }),
        None => Ok(true),
    }
}

/// Attribute access through the MRO and the descriptor protocol: data
/// descriptors first, then the object's own namespace, then non-data
/// descriptors and plain class attributes.
pub fn get_attr(obj: &PyObjectRef, name: &str, ctx: &Context) -> PyResult {
    let cls = type_of(&**obj, ctx);
    let type_attr = cls.lookup(name);

    if let Some((attr, _)) = &type_attr
        && descriptor::is_data_descriptor(&**attr)
        && let Some(bound) = descriptor::bind_for_instance(attr, obj, ctx)?
    {
        return Ok(bound);
    }

    // A type's own namespace: attributes along its MRO are served
    // unbound.
    if let Some(typ) = obj.downcast_ref::<PyType>()
        && let Some((attr, _)) = typ.lookup(name)
    {
        return Ok(attr);
    }

    // The instance dictionary, for layouts that carry one.
    if let Some(instance) = obj.downcast_ref::<SharedInstance>()
        && let Some(dict) = instance.dict()
        && let Some(value) = dict.get_item(name)
    {
        return Ok(value);
    }

    if let Some((attr, _)) = type_attr {
        if let Some(bound) = descriptor::bind_for_instance(&attr, obj, ctx)? {
            return Ok(bound);
        }
        return Ok(attr);
    }

    Err(no_attribute(&**obj, name, ctx))
}

pub fn set_attr(
    obj: &PyObject,
    name: &str,
    value: PyObjectRef,
    ctx: &Context,
) -> PyResult<()> {
    mutate_attr(obj, name, PySetterValue::Assign(value), ctx)
}

pub fn del_attr(obj: &PyObject, name: &str, ctx: &Context) -> PyResult<()> {
    mutate_attr(obj, name, PySetterValue::Delete, ctx)
}

fn mutate_attr(
    obj: &PyObject,
    name: &str,
    value: PySetterValue,
    ctx: &Context,
) -> PyResult<()> {
    let cls = type_of(obj, ctx);
    if let Some((attr, _)) = cls.lookup(name)
        && let Some(result) = descriptor::data_descr_set(&*attr, obj, value.clone(), ctx)
    {
        return result;
    }

    if let Some(typ) = obj.downcast_ref::<PyType>() {
        return match value {
            PySetterValue::Assign(v) => typ.type_set_attr(name, v, ctx),
            PySetterValue::Delete => typ.type_del_attr(name, ctx),
        };
    }

    if let Some(instance) = obj.downcast_ref::<SharedInstance>()
        && let Some(dict) = instance.dict()
    {
        return match value {
            PySetterValue::Assign(v) => {
                dict.set_item(name, v);
                Ok(())
            }
            PySetterValue::Delete => match dict.del_item(name) {
                Some(_) => Ok(()),
                None => Err(no_attribute(obj, name, ctx)),
            },
        };
    }

    Err(no_attribute(obj, name, ctx))
}

#[cold]
fn no_attribute(
    obj: &PyObject,
    name: &str,
    ctx: &Context,
) -> crate::PyBaseExceptionRef {
    ctx.new_attribute_error(format!(
        "'{}' object has no attribute '{}'",
        type_of(obj, ctx).name(),
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::float::PyFloat;
    use crate::builtins::int::int_value;
    use crate::types::SubclassSpec;

    /// Negating the adopted native representation yields a native result;
    /// negating the crafted representation stays crafted.
    #[test]
    fn simple_dispatch_per_representation() {
        let ctx = Context::genesis();

        let native = PyObjectRef::new(42.0_f64);
        let negated = neg(&native, ctx).unwrap();
        assert_eq!(negated.downcast_ref::<f64>().copied(), Some(-42.0));

        let crafted = ctx.new_float(42.0).into_object();
        let negated = neg(&crafted, ctx).unwrap();
        assert_eq!(negated.downcast_ref::<PyFloat>().unwrap().to_f64(), -42.0);
    }

    /// `bool` is accepted as `self` of int methods without representing
    /// int: the inherited `__neg__` finds the bool-accepting entry.
    #[test]
    fn accepted_foreign_receiver_dispatch() {
        let ctx = Context::genesis();
        let truth = ctx.new_bool(true);
        let negated = neg(&truth, ctx).unwrap();
        assert_eq!(int_value(&negated).unwrap(), (-1).into());
    }

    #[test]
    fn binary_dispatch_mixes_accepted_receivers() {
        let ctx = Context::genesis();
        let two = ctx.new_int(2);
        let truth = ctx.new_bool(true);
        let three = add(&two, &truth, ctx).unwrap();
        assert_eq!(int_value(&three).unwrap(), 3.into());
        // the facade agrees with the registry-backed resolution
        assert!(crate::builtins::PyType::of(&three).is(&ctx.types.int_type));
    }

    /// Explicitly fetching `int.__neg__` and applying it to a bool
    /// receiver goes through the same acceptance walk.
    #[test]
    fn bound_wrapper_on_foreign_receiver() {
        let ctx = Context::genesis();
        let truth = ctx.new_bool(true);
        let bound = get_attr(&truth, "__neg__", ctx).unwrap();
        let result = crate::callable::call(&bound, FuncArgs::default(), ctx).unwrap();
        assert_eq!(int_value(&result).unwrap(), (-1).into());
    }

    #[test]
    fn wrong_receiver_reports_owner_and_actual() {
        let ctx = Context::genesis();
        let (descr, _) = ctx.types.float_type.lookup("__neg__").unwrap();
        let err = crate::callable::call(
            &descr,
            FuncArgs::from(vec![ctx.new_str("nope").into_object()]),
            ctx,
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            "descriptor '__neg__' requires a 'float' object but received a 'str'"
        );
    }

    #[test]
    fn str_falls_back_to_repr() {
        let ctx = Context::genesis();
        let obj = crate::callable::call(
            ctx.types.object_type.as_object(),
            FuncArgs::default(),
            ctx,
        )
        .unwrap();
        let s = str_of(&obj, ctx).unwrap();
        assert!(s.as_str().starts_with("<object object at 0x"));
    }

    #[test]
    fn descriptor_repr_formats() {
        let ctx = Context::genesis();
        let (neg_descr, _) = ctx.types.float_type.lookup("__neg__").unwrap();
        assert_eq!(
            repr(&neg_descr, ctx).unwrap().as_str(),
            "<slot wrapper '__neg__' of 'float' objects>"
        );

        let (upper, _) = ctx.types.str_type.lookup("upper").unwrap();
        assert_eq!(
            repr(&upper, ctx).unwrap().as_str(),
            "<method 'upper' of 'str' objects>"
        );

        let (real, _) = ctx.types.int_type.lookup("real").unwrap();
        assert_eq!(
            repr(&real, ctx).unwrap().as_str(),
            "<attribute 'real' of 'int' objects>"
        );

        let value = ctx.new_int(7);
        let bound = get_attr(&value, "bit_length", ctx).unwrap();
        let text = repr(&bound, ctx).unwrap();
        assert!(
            text.as_str()
                .starts_with("<built-in method bit_length of int object at 0x")
        );
    }

    #[test]
    fn value_repr_formats() {
        let ctx = Context::genesis();
        let show = |obj: &PyObjectRef| repr(obj, ctx).unwrap().as_str().to_owned();

        assert_eq!(show(&ctx.new_int(-7)), "-7");
        assert_eq!(show(&ctx.new_bool(true)), "True");
        assert_eq!(show(&ctx.new_float(42.0).into_object()), "42.0");
        assert_eq!(show(&PyObjectRef::new(0.5_f64)), "0.5");
        assert_eq!(show(&ctx.new_str("a'b").into_object()), r"'a\'b'");
        assert_eq!(show(&ctx.none()), "None");

        let tuple = ctx
            .new_tuple(vec![ctx.new_int(1)])
            .into_object();
        assert_eq!(show(&tuple), "(1,)");

        let list = crate::builtins::PyList::new(vec![ctx.new_int(1), ctx.new_int(2)]);
        assert_eq!(show(&PyObjectRef::new(list)), "[1, 2]");

        let dict = crate::builtins::PyDict::default();
        dict.set_item("k", ctx.new_str("v").into_object());
        assert_eq!(show(&PyObjectRef::new(dict)), "{'k': 'v'}");

        // a bound slot wrapper prints as a method-wrapper
        let bound = get_attr(&ctx.new_int(1), "__neg__", ctx).unwrap();
        assert!(show(&bound).starts_with("<method-wrapper '__neg__' of int object at 0x"));
    }

    #[test]
    fn method_dispatch_binds_and_parses() {
        let ctx = Context::genesis();
        let value = ctx.new_int(255);
        let bound = get_attr(&value, "bit_length", ctx).unwrap();
        let bits = crate::callable::call(&bound, FuncArgs::default(), ctx).unwrap();
        assert_eq!(int_value(&bits).unwrap(), 8.into());
    }

    /// Slot storage behaves like an optional member: unset reads raise,
    /// deletion is possible once and raises afterwards.
    #[test]
    fn slot_members_and_instance_dict() {
        let ctx = Context::genesis();
        let typ = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("Carrier")
                    .base(ctx.types.object_type.clone())
                    .slot("payload")
                    .with_dict(true),
                ctx,
            )
            .unwrap();
        let instance =
            crate::callable::call(typ.as_object(), FuncArgs::default(), ctx).unwrap();

        // unset slot
        let err = get_attr(&instance, "payload", ctx).unwrap_err();
        assert!(err.typ().is(&ctx.exceptions.attribute_error));

        set_attr(&instance, "payload", ctx.new_int(5), ctx).unwrap();
        let got = get_attr(&instance, "payload", ctx).unwrap();
        assert_eq!(int_value(&got).unwrap(), 5.into());

        del_attr(&instance, "payload", ctx).unwrap();
        let err = del_attr(&instance, "payload", ctx).unwrap_err();
        assert!(err.typ().is(&ctx.exceptions.attribute_error));

        // dict-backed attributes appear after assignment only
        assert!(get_attr(&instance, "free", ctx).is_err());
        set_attr(&instance, "free", ctx.new_str("text").into_object(), ctx).unwrap();
        let got = get_attr(&instance, "free", ctx).unwrap();
        assert_eq!(
            got.downcast_ref::<crate::builtins::pystr::PyStr>()
                .unwrap()
                .as_str(),
            "text"
        );
    }

    #[test]
    fn class_assignment_on_immutable_instances_is_rejected() {
        let ctx = Context::genesis();
        let three = ctx.new_int(3);
        // same layout on both sides, but int instances are not replaceable
        let err = set_attr(
            &three,
            "__class__",
            ctx.types.int_type.clone().into_object(),
            ctx,
        )
        .unwrap_err();
        assert!(err.message().contains("mutable types"));
    }

    #[test]
    fn type_attribute_round_trip_via_abstract_api() {
        let ctx = Context::genesis();
        let t = ctx
            .factory
            .from_spec(crate::types::TypeSpec::new("Bag"), ctx)
            .unwrap();
        let obj = t.into_object();
        set_attr(&obj, "marker", ctx.new_int(7), ctx).unwrap();
        let got = get_attr(&obj, "marker", ctx).unwrap();
        assert_eq!(int_value(&got).unwrap(), 7.into());
        del_attr(&obj, "marker", ctx).unwrap();
        assert!(get_attr(&obj, "marker", ctx).is_err());
    }

    #[test]
    fn readonly_getset_rejects_stores() {
        let ctx = Context::genesis();
        let value = ctx.new_int(3);
        let err = set_attr(&value, "real", ctx.new_int(4), ctx).unwrap_err();
        assert!(err.typ().is(&ctx.exceptions.attribute_error));
        assert!(err.message().contains("readonly"));
    }

    #[test]
    fn instance_of_synthesised_float_subclass_uses_float_methods() {
        let ctx = Context::genesis();
        let typ = ctx
            .factory
            .from_subclass_spec(
                SubclassSpec::new("Measured")
                    .base(ctx.types.float_type.clone())
                    .slot("unit"),
                ctx,
            )
            .unwrap();
        let instance = crate::callable::call(
            typ.as_object(),
            FuncArgs::from(vec![ctx.new_float(1.5).into_object()]),
            ctx,
        )
        .unwrap();
        assert!(type_of(&instance, ctx).is(&typ));
        // float.__neg__ accepts the synthesised instance through its
        // embedded canonical base.
        let negated = neg(&instance, ctx).unwrap();
        assert_eq!(
            crate::builtins::float::float_value(&negated),
            Some(-1.5)
        );
    }
}
