//! `float`. A crafted boxed payload plus the host's native `f64` adopted
//! as a second representation: methods invoked on a raw `f64` object stay
//! in the native world, methods on the crafted payload stay crafted.

use crate::builtins::descriptor::SlotFunc;
use crate::builtins::type_::PyTypeRef;
use crate::expose::{
    ClassDefs, ConstructorDef, ExposedClass, GetSetDef, MethodDef, NewDef, ParamClass,
    SlotDef,
};
use crate::function::{FuncArgs, ParamDef};
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::types::synthesis;
use crate::{Context, PyResult};
use num_traits::ToPrimitive;

#[derive(Debug)]
pub struct PyFloat {
    value: f64,
}

impl PyFloat {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn to_f64(&self) -> f64 {
        self.value
    }
}

impl PyPayload for PyFloat {
    const HOST_NAME: &'static str = "PyFloat";
}

/// The float value of any receiver `float` methods accept.
pub fn float_value(obj: &PyObject) -> Option<f64> {
    if let Some(boxed) = obj.downcast_ref::<PyFloat>() {
        Some(boxed.value)
    } else {
        obj.downcast_ref::<f64>().copied()
    }
}

/// `repr()` of a float keeps a trailing `.0` on integral values.
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_finite() && value == value.trunc() && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn float_repr_slot(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok(float_repr(float_value(zelf).unwrap()))
}

fn float_neg_boxed(zelf: &PyObject, _ctx: &Context) -> PyResult {
    let v = zelf.downcast_ref::<PyFloat>().unwrap();
    Ok(PyFloat::new(-v.value).into_object())
}

fn float_neg_native(zelf: &PyObject, _ctx: &Context) -> PyResult {
    let v = zelf.downcast_ref::<f64>().unwrap();
    Ok(PyObjectRef::new(-*v))
}

fn float_abs_boxed(zelf: &PyObject, _ctx: &Context) -> PyResult {
    let v = zelf.downcast_ref::<PyFloat>().unwrap();
    Ok(PyFloat::new(v.value.abs()).into_object())
}

fn float_abs_native(zelf: &PyObject, _ctx: &Context) -> PyResult {
    let v = zelf.downcast_ref::<f64>().unwrap();
    Ok(PyObjectRef::new(v.abs()))
}

fn float_add(zelf: &PyObject, other: &PyObject, ctx: &Context) -> PyResult {
    let a = float_value(zelf).unwrap();
    let b = coerce_operand(other).ok_or_else(|| {
        ctx.new_type_error(format!(
            "unsupported operand type(s) for +: 'float' and '{}'",
            crate::ops::type_of(other, ctx).name()
        ))
    })?;
    Ok(PyObjectRef::new(a + b))
}

fn float_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(float_value(zelf).unwrap() != 0.0)
}

fn float_is_integer(zelf: &PyObject, _frame: &[PyObjectRef], ctx: &Context) -> PyResult {
    let v = float_value(zelf).unwrap();
    Ok(ctx.new_bool(v.is_finite() && v == v.trunc()))
}

fn float_get_real(zelf: &PyObject, _ctx: &Context) -> PyResult {
    Ok(PyObjectRef::new(float_value(zelf).unwrap()))
}

fn coerce_operand(obj: &PyObject) -> Option<f64> {
    float_value(obj)
        .or_else(|| crate::builtins::int::int_value(obj).and_then(|v| v.to_f64()))
}

fn coerce_to_float(arg: &PyObjectRef, ctx: &Context) -> PyResult<f64> {
    if let Some(v) = coerce_operand(&*arg) {
        return Ok(v);
    }
    if let Some(s) = crate::builtins::pystr::str_value(&*arg) {
        return s.trim().parse::<f64>().map_err(|_| {
            ctx.new_value_error(format!("could not convert string to float: '{s}'"))
        });
    }
    Err(ctx.new_type_error(format!(
        "float() argument must be a string or a number, not '{}'",
        crate::ops::type_of(&*arg, ctx).name()
    )))
}

fn float_new(cls: &PyTypeRef, mut args: FuncArgs, ctx: &Context) -> PyResult {
    let value = match args.take_positional() {
        Some(arg) => coerce_to_float(&arg, ctx)?,
        None => 0.0,
    };
    if cls.is(&ctx.types.float_type) {
        Ok(PyObjectRef::new(value))
    } else {
        synthesis::adopt_instance(cls, PyFloat::new(value).into_object(), ctx)
    }
}

fn float_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    float_new(cls, args.clone(), ctx)
}

static IS_INTEGER_PARAMS: [ParamDef; 0] = [];

macro_rules! float_slot_defs {
    ($neg:ident, $abs:ident) => {
        &[
            SlotDef {
                name: "__repr__",
                func: SlotFunc::Stringify(float_repr_slot),
            },
            SlotDef {
                name: "__neg__",
                func: SlotFunc::Unary($neg),
            },
            SlotDef {
                name: "__abs__",
                func: SlotFunc::Unary($abs),
            },
            SlotDef {
                name: "__add__",
                func: SlotFunc::Binary(float_add),
            },
            SlotDef {
                name: "__bool__",
                func: SlotFunc::Boolean(float_bool),
            },
        ]
    };
}

static FLOAT_METHODS: [MethodDef; 1] = [MethodDef {
    name: "is_integer",
    params: &IS_INTEGER_PARAMS,
    doc: Some("Return True if the float is an integer."),
    func: float_is_integer,
}];

static FLOAT_GETSETS: [GetSetDef; 1] = [GetSetDef {
    name: "real",
    doc: Some("the real part of a complex number"),
    getter: float_get_real,
    setter: None,
}];

pub(crate) static FLOAT_DEFS: ClassDefs = ClassDefs {
    slots: float_slot_defs!(float_neg_boxed, float_abs_boxed),
    methods: &FLOAT_METHODS,
    getsets: &FLOAT_GETSETS,
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type, ParamClass::Args],
        func: float_ctor,
    }],
    new: Some(NewDef {
        doc: Some("Convert a string or number to a floating point number."),
        func: float_new,
    }),
    ..ClassDefs::EMPTY
};

pub(crate) static FLOAT_F64_DEFS: ClassDefs = ClassDefs {
    slots: float_slot_defs!(float_neg_native, float_abs_native),
    methods: &FLOAT_METHODS,
    getsets: &FLOAT_GETSETS,
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![
        ExposedClass::of::<PyFloat>(&FLOAT_DEFS),
        ExposedClass::of::<f64>(&FLOAT_F64_DEFS),
    ]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.float_type,
        &classes(),
        "Convert a string or number to a floating point number.",
        ctx,
    );
}
