//! `int`. The crafted payload is an arbitrary-precision integer; the
//! host's native `i64` is adopted for the common small case, and the
//! primitive `bool` is accepted as a receiver of `int` methods without
//! being a representation of `int`.

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
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

#[derive(Debug)]
pub struct PyInt {
    value: BigInt,
}

impl PyInt {
    pub fn new(value: BigInt) -> Self {
        Self { value }
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.value
    }
}

impl PyPayload for PyInt {
    const HOST_NAME: &'static str = "PyInt";
}

/// The integer value of any receiver `int` methods accept.
pub fn int_value(obj: &PyObject) -> Option<BigInt> {
    if let Some(big) = obj.downcast_ref::<PyInt>() {
        Some(big.value.clone())
    } else if let Some(small) = obj.downcast_ref::<i64>() {
        Some(BigInt::from(*small))
    } else {
        obj.downcast_ref::<bool>().map(|b| BigInt::from(*b as i64))
    }
}

/// Smallest-fitting integer object: machine word when possible.
pub(crate) fn int_from_bigint(value: BigInt) -> PyObjectRef {
    match value.to_i64() {
        Some(small) => PyObjectRef::new(small),
        None => PyInt::new(value).into_object(),
    }
}

fn int_repr(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok(int_value(zelf).unwrap().to_string())
}

/// Negation of the crafted representation stays crafted.
fn int_neg_big(zelf: &PyObject, _ctx: &Context) -> PyResult {
    let v = zelf.downcast_ref::<PyInt>().unwrap();
    Ok(PyInt::new(-v.value.clone()).into_object())
}

/// Negation of a machine-word receiver (adopted `i64` or accepted `bool`).
fn int_neg_machine(zelf: &PyObject, _ctx: &Context) -> PyResult {
    Ok(int_from_bigint(-int_value(zelf).unwrap()))
}

fn int_add(zelf: &PyObject, other: &PyObject, ctx: &Context) -> PyResult {
    let a = int_value(zelf).unwrap();
    let b = int_value(other).ok_or_else(|| {
        ctx.new_type_error(format!(
            "unsupported operand type(s) for +: 'int' and '{}'",
            crate::ops::type_of(other, ctx).name()
        ))
    })?;
    Ok(int_from_bigint(a + b))
}

fn int_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(!int_value(zelf).unwrap().is_zero())
}

fn int_bit_length(zelf: &PyObject, _frame: &[PyObjectRef], ctx: &Context) -> PyResult {
    let bits = int_value(zelf).unwrap().abs().bits();
    Ok(ctx.new_int(bits as i64))
}

fn int_get_real(zelf: &PyObject, _ctx: &Context) -> PyResult {
    Ok(int_from_bigint(int_value(zelf).unwrap()))
}

fn coerce_to_int(arg: &PyObjectRef, ctx: &Context) -> PyResult<BigInt> {
    if let Some(v) = int_value(&*arg) {
        return Ok(v);
    }
    if let Some(f) = crate::builtins::float::float_value(&*arg) {
        return Ok(BigInt::from(f.trunc() as i128));
    }
    if let Some(s) = crate::builtins::pystr::str_value(&*arg) {
        return s.trim().parse::<BigInt>().map_err(|_| {
            ctx.new_value_error(format!(
                "invalid literal for int() with base 10: '{s}'"
            ))
        });
    }
    Err(ctx.new_type_error(format!(
        "int() argument must be a string or a number, not '{}'",
        crate::ops::type_of(&*arg, ctx).name()
    )))
}

fn int_new(cls: &PyTypeRef, mut args: FuncArgs, ctx: &Context) -> PyResult {
    let value = match args.take_positional() {
        Some(arg) => coerce_to_int(&arg, ctx)?,
        None => BigInt::from(0),
    };
    if cls.is(&ctx.types.int_type) {
        Ok(int_from_bigint(value))
    } else {
        synthesis::adopt_instance(cls, PyInt::new(value).into_object(), ctx)
    }
}

fn int_ctor(cls: &PyTypeRef, args: &FuncArgs, ctx: &Context) -> PyResult {
    int_new(cls, args.clone(), ctx)
}

static BIT_LENGTH_PARAMS: [ParamDef; 0] = [];

macro_rules! int_common_defs {
    ($neg:ident) => {
        &[
            SlotDef {
                name: "__repr__",
                func: SlotFunc::Stringify(int_repr),
            },
            SlotDef {
                name: "__neg__",
                func: SlotFunc::Unary($neg),
            },
            SlotDef {
                name: "__add__",
                func: SlotFunc::Binary(int_add),
            },
            SlotDef {
                name: "__bool__",
                func: SlotFunc::Boolean(int_bool),
            },
        ]
    };
}

static INT_METHODS: [MethodDef; 1] = [MethodDef {
    name: "bit_length",
    params: &BIT_LENGTH_PARAMS,
    doc: Some("Number of bits necessary to represent self in binary."),
    func: int_bit_length,
}];

static INT_GETSETS: [GetSetDef; 1] = [GetSetDef {
    name: "real",
    doc: Some("the real part of a complex number"),
    getter: int_get_real,
    setter: None,
}];

pub(crate) static INT_DEFS: ClassDefs = ClassDefs {
    slots: int_common_defs!(int_neg_big),
    methods: &INT_METHODS,
    getsets: &INT_GETSETS,
    constructors: &[ConstructorDef {
        signature: &[ParamClass::Type, ParamClass::Args],
        func: int_ctor,
    }],
    new: Some(NewDef {
        doc: Some("int([x]) -> integer"),
        func: int_new,
    }),
    ..ClassDefs::EMPTY
};

pub(crate) static INT_I64_DEFS: ClassDefs = ClassDefs {
    slots: int_common_defs!(int_neg_machine),
    methods: &INT_METHODS,
    getsets: &INT_GETSETS,
    ..ClassDefs::EMPTY
};

pub(crate) static INT_BOOL_DEFS: ClassDefs = ClassDefs {
    slots: int_common_defs!(int_neg_machine),
    methods: &INT_METHODS,
    getsets: &INT_GETSETS,
    ..ClassDefs::EMPTY
};

pub(crate) fn rep_classes() -> Vec<ExposedClass> {
    vec![
        ExposedClass::of::<PyInt>(&INT_DEFS),
        ExposedClass::of::<i64>(&INT_I64_DEFS),
    ]
}

/// `bool` serves as `self` of int methods without representing int.
pub(crate) fn accepted_classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<bool>(&INT_BOOL_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin_with(
        &ctx.types.int_type,
        &rep_classes(),
        &accepted_classes(),
        "int([x]) -> integer",
        ctx,
    );
}
