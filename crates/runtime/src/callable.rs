//! The universal call interface. Knows the closed set of callable
//! payloads directly and falls back to the `__call__` special method for
//! everything else.

use crate::builtins::descriptor::{
    PyBoundMethod, PyBoundWrapper, PyMethodDescriptor, PyNewMethod, PyStaticMethod,
    PyWrapper,
};
use crate::builtins::type_::{PyType, PyTypeRef};
use crate::function::FuncArgs;
use crate::object::{PyObject, PyObjectRef};
use crate::{Context, PyResult, ops};

/// Calls `callable` with positional and keyword arguments.
pub fn call(callable: &PyObject, mut args: FuncArgs, ctx: &Context) -> PyResult {
    if let Some(typ) = callable.downcast_ref::<PyType>() {
        let cls = typ.mro.read()[0].clone();
        return call_type(&cls, args, ctx);
    }
    if let Some(bound) = callable.downcast_ref::<PyBoundWrapper>() {
        return bound.invoke(args, ctx);
    }
    if let Some(wrapper) = callable.downcast_ref::<PyWrapper>() {
        let zelf = take_self(wrapper.name, &mut args, ctx)?;
        return wrapper.invoke(&*zelf, args, ctx);
    }
    if let Some(bound) = callable.downcast_ref::<PyBoundMethod>() {
        return bound.invoke(args, ctx);
    }
    if let Some(method) = callable.downcast_ref::<PyMethodDescriptor>() {
        let zelf = take_self(method.name, &mut args, ctx)?;
        return method.invoke(&*zelf, args, ctx);
    }
    if let Some(stat) = callable.downcast_ref::<PyStaticMethod>() {
        return stat.invoke(args, ctx);
    }
    if let Some(new) = callable.downcast_ref::<PyNewMethod>() {
        return new.invoke(args, ctx);
    }
    match ops::invoke_special(callable, "__call__", args, ctx)? {
        Some(result) => Ok(result),
        None => Err(ctx.new_type_error(format!(
            "'{}' object is not callable",
            ops::type_of(callable, ctx).name()
        ))),
    }
}

/// The `posArgs`/`kwNames` shape of the call interface: the last
/// `kw_names.len()` values are keyword arguments in call order.
pub fn call_with_keywords(
    callable: &PyObject,
    values: Vec<PyObjectRef>,
    kw_names: Vec<String>,
    ctx: &Context,
) -> PyResult {
    call(callable, FuncArgs::with_kw_names(values, kw_names), ctx)
}

/// Instantiation through a type object: `__new__` resolved along the
/// MRO, the type prepended as its first argument.
pub fn call_type(cls: &PyTypeRef, args: FuncArgs, ctx: &Context) -> PyResult {
    // type(x) is the type query, not a construction.
    if cls.is(&ctx.types.type_type) && args.args.len() == 1 && args.kwargs.is_empty() {
        return Ok(ops::type_of(&*args.args[0], ctx).into_object());
    }
    let Some((new_attr, _)) = cls.lookup("__new__") else {
        return Err(ctx.new_type_error(format!(
            "cannot create '{}' instances",
            cls.name()
        )));
    };
    let mut call_args = args;
    call_args.prepend_arg(cls.clone().into_object());
    call(&*new_attr, call_args, ctx)
}

fn take_self(
    name: &str,
    args: &mut FuncArgs,
    ctx: &Context,
) -> PyResult<PyObjectRef> {
    args.take_positional().ok_or_else(|| {
        ctx.new_type_error(format!(
            "descriptor '{name}' needs an argument to bind to"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;
    use crate::builtins::int::int_value;

    #[test]
    fn type_of_one_argument_is_a_query() {
        let ctx = Context::genesis();
        let result = call(
            ctx.types.type_type.as_object(),
            FuncArgs::from(vec![ctx.new_int(1)]),
            ctx,
        )
        .unwrap();
        let typ = result.downcast::<crate::builtins::type_::PyType>().unwrap();
        assert!(typ.mro.read()[0].is(&ctx.types.int_type));
    }

    #[test]
    fn calling_a_builtin_type_constructs() {
        let ctx = Context::genesis();
        let result = call(
            ctx.types.float_type.as_object(),
            FuncArgs::from(vec![ctx.new_str("2.5").into_object()]),
            ctx,
        )
        .unwrap();
        assert_eq!(result.downcast_ref::<f64>().copied(), Some(2.5));
    }

    #[test]
    fn keyword_call_shape() {
        let ctx = Context::genesis();
        let dict = crate::builtins::dict::PyDict::default();
        dict.set_item("k", ctx.new_int(1));
        let obj = crate::object::PyObjectRef::new(dict);
        let bound = ops::get_attr(&obj, "get", ctx).unwrap();

        // both parameters of dict.get are positional-only
        let result = call(
            &bound,
            FuncArgs::from(vec![ctx.new_str("missing").into_object(), ctx.new_int(9)]),
            ctx,
        )
        .unwrap();
        assert_eq!(int_value(&result).unwrap(), 9.into());

        // a keyword for a positional-only parameter is rejected
        let err = call_with_keywords(
            &bound,
            vec![ctx.new_str("missing").into_object(), ctx.new_int(9)],
            vec!["default".to_owned()],
            ctx,
        )
        .unwrap_err();
        assert!(err.message().contains("positional-only"));
    }

    #[test]
    fn non_callable_object_raises() {
        let ctx = Context::genesis();
        let err = call(&ctx.new_int(3), FuncArgs::default(), ctx).unwrap_err();
        assert_eq!(err.message(), "'int' object is not callable");
    }
}
