//! The exception types, arranged in cliques: groups of types sharing one
//! host representation and hence mutually `__class__`-assignable. The
//! root clique carrier stores the type and the argument tuple; types that
//! add storage (`StopIteration.value`, `NameError.name`) start cliques of
//! their own, and storage-free leaves reuse their base's carrier.

use crate::builtins::descriptor::SlotFunc;
use crate::builtins::pystr::str_value;
use crate::builtins::tuple::PyTuple;
use crate::builtins::type_::{PyTypeRef, PyType};
use crate::expose::{
    ClassDefs, ConstructorDef, ExposedClass, GetSetDef, NewDef, ParamClass, SlotDef,
};
use crate::function::{FuncArgs, PySetterValue};
use crate::object::{PyObject, PyObjectRef, PyPayload, PyRef};
use crate::types::synthesis;
use crate::types::zoo::shell;
use crate::types::{TypeFlags, TypeZoo};
use crate::{Context, PyResult};
use ophidian_common::lock::PyRwLock;

/// Carrier of the root exception clique.
pub struct PyBaseException {
    typ: PyRwLock<PyTypeRef>,
    args: PyRwLock<PyRef<PyTuple>>,
}

pub type PyBaseExceptionRef = PyRef<PyBaseException>;

impl PyPayload for PyBaseException {
    const HOST_NAME: &'static str = "PyBaseException";
}

impl std::fmt::Debug for PyBaseException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?})", self.typ.read().name(), self.args.read().len())
    }
}

impl PyBaseException {
    pub fn new(typ: PyTypeRef, args: PyRef<PyTuple>) -> Self {
        Self {
            typ: PyRwLock::new(typ),
            args: PyRwLock::new(args),
        }
    }

    pub fn typ(&self) -> PyTypeRef {
        self.typ.read().clone()
    }

    pub(crate) fn set_typ(&self, typ: PyTypeRef) {
        *self.typ.write() = typ;
    }

    pub fn args(&self) -> PyRef<PyTuple> {
        self.args.read().clone()
    }

    pub fn set_args(&self, args: PyRef<PyTuple>) {
        *self.args.write() = args;
    }

    /// The conventional message: the sole string argument, or empty.
    pub fn message(&self) -> String {
        let args = self.args();
        match args.as_slice() {
            [single] => str_value(&**single).map(str::to_owned).unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// `StopIteration`: its `value` is storage the root clique lacks, so it
/// carries its own representation.
pub struct PyStopIteration {
    base: PyBaseException,
    value: PyRwLock<Option<PyObjectRef>>,
}

impl PyPayload for PyStopIteration {
    const HOST_NAME: &'static str = "PyStopIteration";

    fn base_view(&self) -> Option<&PyObject> {
        Some(&self.base)
    }
}

impl std::fmt::Debug for PyStopIteration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StopIteration")
    }
}

/// `NameError` and its storage-free leaves: the `name` field starts the
/// third clique.
pub struct PyNameError {
    base: PyBaseException,
    name: PyRwLock<Option<PyObjectRef>>,
}

impl PyPayload for PyNameError {
    const HOST_NAME: &'static str = "PyNameError";

    fn base_view(&self) -> Option<&PyObject> {
        Some(&self.base)
    }
}

impl std::fmt::Debug for PyNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NameError")
    }
}

/// Rebinds the carried type of an exception payload. `false` when `obj`
/// is not an exception carrier.
pub(crate) fn replace_exception_type(obj: &PyObject, target: &PyTypeRef) -> bool {
    if let Some(exc) = obj.downcast_ref::<PyBaseException>() {
        exc.set_typ(target.clone());
        return true;
    }
    if let Some(exc) = obj.downcast_ref::<PyStopIteration>() {
        exc.base.set_typ(target.clone());
        return true;
    }
    if let Some(exc) = obj.downcast_ref::<PyNameError>() {
        exc.base.set_typ(target.clone());
        return true;
    }
    false
}

fn base_exception_carrier(obj: &PyObject) -> PyTypeRef {
    obj.downcast_ref::<PyBaseException>().unwrap().typ()
}

fn stop_iteration_carrier(obj: &PyObject) -> PyTypeRef {
    obj.downcast_ref::<PyStopIteration>().unwrap().base.typ()
}

fn name_error_carrier(obj: &PyObject) -> PyTypeRef {
    obj.downcast_ref::<PyNameError>().unwrap().base.typ()
}

// Slot and accessor implementations. Receivers arrive as the clique
// carrier view, so the root implementations serve every clique through
// the host-class chain.

fn exc_args_view(zelf: &PyObject) -> PyRef<PyTuple> {
    zelf.downcast_ref::<PyBaseException>().unwrap().args()
}

fn exc_repr(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let exc = zelf.downcast_ref::<PyBaseException>().unwrap();
    let args = exc.args();
    let inner = match args.as_slice() {
        [single] => crate::ops::repr(&**single, ctx)?.as_str().to_owned(),
        many => {
            let mut parts = Vec::with_capacity(many.len());
            for item in many {
                parts.push(crate::ops::repr(&**item, ctx)?.as_str().to_owned());
            }
            parts.join(", ")
        }
    };
    Ok(format!("{}({})", exc.typ().name(), inner))
}

fn exc_str(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let args = exc_args_view(zelf);
    match args.as_slice() {
        [] => Ok(String::new()),
        [single] => match str_value(&**single) {
            Some(s) => Ok(s.to_owned()),
            None => Ok(crate::ops::str_of(&**single, ctx)?.as_str().to_owned()),
        },
        _ => exc_repr(zelf, ctx).map(|r| {
            // str() of a multi-argument exception prints the tuple
            let open = r.find('(').unwrap_or(0);
            format!("({}", &r[open + 1..])
        }),
    }
}

fn exc_get_args(zelf: &PyObject, _ctx: &Context) -> PyResult {
    Ok(exc_args_view(zelf).into_object())
}

fn exc_set_args(zelf: &PyObject, value: PySetterValue, ctx: &Context) -> PyResult<()> {
    let exc = zelf.downcast_ref::<PyBaseException>().unwrap();
    match value {
        PySetterValue::Assign(v) => {
            let tuple = v.downcast::<PyTuple>().map_err(|_| {
                ctx.new_type_error("__args__ must be a tuple".to_owned())
            })?;
            exc.set_args(tuple);
            Ok(())
        }
        PySetterValue::Delete => {
            Err(ctx.new_type_error("args may not be deleted".to_owned()))
        }
    }
}

/// `__new__` of the clique root: locates a matching constructor of the
/// actual requested subclass through its constructor index.
fn exc_new(cls: &PyTypeRef, args: FuncArgs, ctx: &Context) -> PyResult {
    synthesis::construct_via_index(cls, &args, ctx)
}

fn base_exception_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    let canonical = PyBaseException::new(
        cls.clone(),
        ctx.new_tuple(args.args.clone()),
    )
    .into_object();
    synthesis::adopt_instance(cls, canonical, ctx)
}

fn stop_iteration_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    let canonical = PyStopIteration {
        base: PyBaseException::new(cls.clone(), ctx.new_tuple(args.args.clone())),
        value: PyRwLock::new(args.args.first().cloned()),
    }
    .into_object();
    synthesis::adopt_instance(cls, canonical, ctx)
}

fn name_error_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    let canonical = PyNameError {
        base: PyBaseException::new(cls.clone(), ctx.new_tuple(args.args.clone())),
        name: PyRwLock::new(None),
    }
    .into_object();
    synthesis::adopt_instance(cls, canonical, ctx)
}

fn stop_iteration_get_value(zelf: &PyObject, ctx: &Context) -> PyResult {
    let exc = zelf.downcast_ref::<PyStopIteration>().unwrap();
    Ok(exc.value.read().clone().unwrap_or_else(|| ctx.none()))
}

fn stop_iteration_set_value(
    zelf: &PyObject,
    value: PySetterValue,
    _ctx: &Context,
) -> PyResult<()> {
    let exc = zelf.downcast_ref::<PyStopIteration>().unwrap();
    *exc.value.write() = match value {
        PySetterValue::Assign(v) => Some(v),
        PySetterValue::Delete => None,
    };
    Ok(())
}

fn name_error_get_name(zelf: &PyObject, ctx: &Context) -> PyResult {
    let exc = zelf.downcast_ref::<PyNameError>().unwrap();
    Ok(exc.name.read().clone().unwrap_or_else(|| ctx.none()))
}

fn name_error_set_name(
    zelf: &PyObject,
    value: PySetterValue,
    _ctx: &Context,
) -> PyResult<()> {
    let exc = zelf.downcast_ref::<PyNameError>().unwrap();
    *exc.name.write() = match value {
        PySetterValue::Assign(v) => Some(v),
        PySetterValue::Delete => None,
    };
    Ok(())
}

static BASE_EXCEPTION_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(exc_repr),
        },
        SlotDef {
            name: "__str__",
            func: SlotFunc::Stringify(exc_str),
        },
    ],
    getsets: &[GetSetDef {
        name: "args",
        doc: None,
        getter: exc_get_args,
        setter: Some(exc_set_args),
    }],
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type, ParamClass::Args],
        func: base_exception_ctor,
    }],
    new: Some(NewDef {
        doc: Some("Create and return a new exception."),
        func: exc_new,
    }),
    carrier: Some(base_exception_carrier),
    ..ClassDefs::EMPTY
};

static STOP_ITERATION_DEFS: ClassDefs = ClassDefs {
    getsets: &[GetSetDef {
        name: "value",
        doc: Some("generator return value"),
        getter: stop_iteration_get_value,
        setter: Some(stop_iteration_set_value),
    }],
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type, ParamClass::Args],
        func: stop_iteration_ctor,
    }],
    carrier: Some(stop_iteration_carrier),
    ..ClassDefs::EMPTY
};

static NAME_ERROR_DEFS: ClassDefs = ClassDefs {
    getsets: &[GetSetDef {
        name: "name",
        doc: Some("name that could not be resolved"),
        getter: name_error_get_name,
        setter: Some(name_error_set_name),
    }],
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type, ParamClass::Args],
        func: name_error_ctor,
    }],
    carrier: Some(name_error_carrier),
    ..ClassDefs::EMPTY
};

/// References to the exception types.
#[derive(Debug, Clone)]
pub struct ExceptionZoo {
    pub base_exception: PyTypeRef,
    pub exception: PyTypeRef,
    pub type_error: PyTypeRef,
    pub attribute_error: PyTypeRef,
    pub value_error: PyTypeRef,
    pub name_error: PyTypeRef,
    pub unbound_local_error: PyTypeRef,
    pub stop_iteration: PyTypeRef,
}

const EXC_FLAGS: TypeFlags = TypeFlags::IMMUTABLE
    .union(TypeFlags::BASETYPE)
    .union(TypeFlags::REPLACEABLE);

fn derived_shell(name: &str, base: &PyTypeRef) -> PyTypeRef {
    PyType::new_shell(
        name,
        vec![base.clone()],
        base.host.clone(),
        base.accepted[..1].to_vec().into_boxed_slice(),
        1,
        EXC_FLAGS,
    )
    .unwrap_or_else(|msg| crate::interpreter_error(msg))
}

impl ExceptionZoo {
    #[cold]
    pub(crate) fn init(types: &TypeZoo) -> Self {
        let base_exception = shell(
            "BaseException",
            vec![types.object_type.clone()],
            &[ExposedClass::of::<PyBaseException>(&BASE_EXCEPTION_DEFS)],
            &[],
            EXC_FLAGS,
        );
        let exception = derived_shell("Exception", &base_exception);
        let type_error = derived_shell("TypeError", &exception);
        let attribute_error = derived_shell("AttributeError", &exception);
        let value_error = derived_shell("ValueError", &exception);
        let name_error = shell(
            "NameError",
            vec![exception.clone()],
            &[ExposedClass::of::<PyNameError>(&NAME_ERROR_DEFS)],
            &[],
            EXC_FLAGS,
        );
        let unbound_local_error = derived_shell("UnboundLocalError", &name_error);
        let stop_iteration = shell(
            "StopIteration",
            vec![exception.clone()],
            &[ExposedClass::of::<PyStopIteration>(&STOP_ITERATION_DEFS)],
            &[],
            EXC_FLAGS,
        );
        Self {
            base_exception,
            exception,
            type_error,
            attribute_error,
            value_error,
            name_error,
            unbound_local_error,
            stop_iteration,
        }
    }

    #[cold]
    pub(crate) fn extend(ctx: &Context) {
        let exc = &ctx.exceptions;
        ctx.factory.realize_builtin(
            &exc.base_exception,
            &[ExposedClass::of::<PyBaseException>(&BASE_EXCEPTION_DEFS)],
            "Common base class of all exceptions",
            ctx,
        );
        ctx.factory
            .realize_derived(&exc.exception, "Common base class of all non-exit exceptions.", ctx);
        ctx.factory
            .realize_derived(&exc.type_error, "Inappropriate argument type.", ctx);
        ctx.factory.realize_derived(
            &exc.attribute_error,
            "Attribute not found.",
            ctx,
        );
        ctx.factory.realize_derived(
            &exc.value_error,
            "Inappropriate argument value (of correct type).",
            ctx,
        );
        ctx.factory.realize_builtin(
            &exc.name_error,
            &[ExposedClass::of::<PyNameError>(&NAME_ERROR_DEFS)],
            "Name not found globally.",
            ctx,
        );
        ctx.factory.realize_derived(
            &exc.unbound_local_error,
            "Local name referenced but not bound to a value.",
            ctx,
        );
        ctx.factory.realize_builtin(
            &exc.stop_iteration,
            &[ExposedClass::of::<PyStopIteration>(&STOP_ITERATION_DEFS)],
            "Signal the end from iterator.__next__().",
            ctx,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable;
    use crate::types::TypeSpec;

    #[test]
    fn message_and_repr() {
        let ctx = Context::genesis();
        let err = ctx.new_type_error("bad thing");
        assert_eq!(err.message(), "bad thing");
        let repr = crate::ops::repr(err.as_object(), ctx).unwrap();
        assert_eq!(repr.as_str(), "TypeError('bad thing')");
    }

    #[test]
    fn clique_class_reassignment() {
        let ctx = Context::genesis();
        // A crafted exception subtype joins the root clique.
        let te = ctx
            .factory
            .from_spec(
                TypeSpec::new("TE").base(ctx.exceptions.type_error.clone()),
                ctx,
            )
            .unwrap();
        let e = callable::call(te.as_object(), FuncArgs::default(), ctx).unwrap();
        assert!(crate::ops::type_of(&e, ctx).is(&te));

        // Reassignment within the clique succeeds.
        let be = ctx
            .factory
            .from_spec(
                TypeSpec::new("BE").base(ctx.exceptions.base_exception.clone()),
                ctx,
            )
            .unwrap();
        crate::ops::set_attr(&e, "__class__", be.clone().into_object(), ctx).unwrap();
        assert!(crate::ops::type_of(&e, ctx).is(&be));

        // Reassignment across layouts fails, mentioning the layout.
        let err = crate::ops::set_attr(
            &e,
            "__class__",
            ctx.types.list_type.clone().into_object(),
            ctx,
        )
        .unwrap_err();
        assert!(err.message().contains("layout differs"));
    }

    #[test]
    fn stop_iteration_carries_value_in_its_own_clique() {
        let ctx = Context::genesis();
        let si = callable::call(
            ctx.exceptions.stop_iteration.as_object(),
            FuncArgs::from(vec![ctx.new_int(42)]),
            ctx,
        )
        .unwrap();
        assert!(crate::ops::type_of(&si, ctx).is(&ctx.exceptions.stop_iteration));
        let value = crate::ops::get_attr(&si, "value", ctx).unwrap();
        assert_eq!(crate::builtins::int::int_value(&value).unwrap(), 42.into());

        // Cross-clique __class__ assignment is a layout error.
        let err = crate::ops::set_attr(
            &si,
            "__class__",
            ctx.exceptions.value_error.clone().into_object(),
            ctx,
        )
        .unwrap_err();
        assert!(err.message().contains("layout differs"));
    }

    #[test]
    fn inherited_repr_crosses_clique_storage() {
        let ctx = Context::genesis();
        // StopIteration has no __repr__ of its own; BaseException's
        // implementation accepts it through the embedded carrier.
        let si = callable::call(
            ctx.exceptions.stop_iteration.as_object(),
            FuncArgs::from(vec![ctx.new_str("done").into_object()]),
            ctx,
        )
        .unwrap();
        let repr = crate::ops::repr(&si, ctx).unwrap();
        assert_eq!(repr.as_str(), "StopIteration('done')");
    }

    #[test]
    fn name_error_leaf_shares_the_name_clique() {
        let ctx = Context::genesis();
        let exc = &ctx.exceptions;
        assert!(exc.unbound_local_error.host.same_layout(&exc.name_error.host));
        assert!(!exc.name_error.host.same_layout(&exc.exception.host));
    }
}
