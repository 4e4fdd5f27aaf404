//! `str`: a crafted payload over an owned string, with the host's
//! `String` adopted so plain host strings pass as objects unboxed.

use crate::builtins::descriptor::SlotFunc;
use crate::expose::{ClassDefs, ExposedClass, MethodDef, SlotDef};
use crate::function::ParamDef;
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::{Context, PyResult};

#[derive(Debug)]
pub struct PyStr {
    value: String,
}

impl PyStr {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl PyPayload for PyStr {
    const HOST_NAME: &'static str = "PyStr";
}

/// The text of any receiver `str` methods accept.
pub fn str_value(obj: &PyObject) -> Option<&str> {
    if let Some(s) = obj.downcast_ref::<PyStr>() {
        Some(s.as_str())
    } else {
        obj.downcast_ref::<String>().map(|s| s.as_str())
    }
}

/// Single-quoted form with minimal escaping, the shape `repr()` prints.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn str_repr(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok(quote(str_value(zelf).unwrap()))
}

fn str_str(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok(str_value(zelf).unwrap().to_owned())
}

fn str_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(!str_value(zelf).unwrap().is_empty())
}

fn str_add(zelf: &PyObject, other: &PyObject, ctx: &Context) -> PyResult {
    let a = str_value(zelf).unwrap();
    let b = str_value(other).ok_or_else(|| {
        ctx.new_type_error(format!(
            "can only concatenate str (not \"{}\") to str",
            crate::ops::type_of(other, ctx).name()
        ))
    })?;
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(a);
    joined.push_str(b);
    Ok(ctx.new_str(&joined).into_object())
}

fn str_upper(zelf: &PyObject, _frame: &[PyObjectRef], ctx: &Context) -> PyResult {
    Ok(ctx.new_str(&str_value(zelf).unwrap().to_uppercase()).into_object())
}

static UPPER_PARAMS: [ParamDef; 0] = [];

macro_rules! str_slot_defs {
    () => {
        &[
            SlotDef {
                name: "__repr__",
                func: SlotFunc::Stringify(str_repr),
            },
            SlotDef {
                name: "__str__",
                func: SlotFunc::Stringify(str_str),
            },
            SlotDef {
                name: "__add__",
                func: SlotFunc::Binary(str_add),
            },
            SlotDef {
                name: "__bool__",
                func: SlotFunc::Boolean(str_bool),
            },
        ]
    };
}

static STR_METHODS: [MethodDef; 1] = [MethodDef {
    name: "upper",
    params: &UPPER_PARAMS,
    doc: Some("Return a copy of the string converted to uppercase."),
    func: str_upper,
}];

pub(crate) static STR_DEFS: ClassDefs = ClassDefs {
    slots: str_slot_defs!(),
    methods: &STR_METHODS,
    ..ClassDefs::EMPTY
};

pub(crate) static STR_STRING_DEFS: ClassDefs = ClassDefs {
    slots: str_slot_defs!(),
    methods: &STR_METHODS,
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![
        ExposedClass::of::<PyStr>(&STR_DEFS),
        ExposedClass::of::<String>(&STR_STRING_DEFS),
    ]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.str_type,
        &classes(),
        "str(object='') -> str",
        ctx,
    );
}
