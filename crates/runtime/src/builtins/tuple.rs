use crate::builtins::descriptor::SlotFunc;
use crate::expose::{ClassDefs, ExposedClass, SlotDef};
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::{Context, PyResult};
use itertools::Itertools;

#[derive(Debug)]
pub struct PyTuple {
    elements: Box<[PyObjectRef]>,
}

impl PyTuple {
    pub fn new(elements: Vec<PyObjectRef>) -> Self {
        Self {
            elements: elements.into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[PyObjectRef] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl PyPayload for PyTuple {
    const HOST_NAME: &'static str = "PyTuple";
}

fn tuple_repr(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let tuple = zelf.downcast_ref::<PyTuple>().unwrap();
    let mut parts = Vec::with_capacity(tuple.len());
    for item in tuple.as_slice() {
        parts.push(crate::ops::repr(&*item, ctx)?.as_str().to_owned());
    }
    Ok(match parts.len() {
        1 => format!("({},)", parts[0]),
        _ => format!("({})", parts.iter().format(", ")),
    })
}

fn tuple_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(!zelf.downcast_ref::<PyTuple>().unwrap().is_empty())
}

pub(crate) static TUPLE_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(tuple_repr),
        },
        SlotDef {
            name: "__bool__",
            func: SlotFunc::Boolean(tuple_bool),
        },
    ],
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyTuple>(&TUPLE_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.tuple_type,
        &classes(),
        "Built-in immutable sequence.",
        ctx,
    );
}
