use crate::builtins::descriptor::SlotFunc;
use crate::expose::{ClassDefs, ExposedClass, MethodDef, SlotDef};
use crate::function::ParamDef;
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::{Context, PyResult};
use itertools::Itertools;
use ophidian_common::lock::PyRwLock;

#[derive(Debug, Default)]
pub struct PyList {
    elements: PyRwLock<Vec<PyObjectRef>>,
}

impl PyList {
    pub fn new(elements: Vec<PyObjectRef>) -> Self {
        Self {
            elements: PyRwLock::new(elements),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    pub fn to_vec(&self) -> Vec<PyObjectRef> {
        self.elements.read().clone()
    }

    pub fn push(&self, item: PyObjectRef) {
        self.elements.write().push(item);
    }
}

impl PyPayload for PyList {
    const HOST_NAME: &'static str = "PyList";
}

fn list_repr(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let list = zelf.downcast_ref::<PyList>().unwrap();
    let mut parts = Vec::new();
    for item in list.to_vec() {
        parts.push(crate::ops::repr(&*item, ctx)?.as_str().to_owned());
    }
    Ok(format!("[{}]", parts.iter().format(", ")))
}

fn list_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(!zelf.downcast_ref::<PyList>().unwrap().is_empty())
}

fn list_append(zelf: &PyObject, frame: &[PyObjectRef], ctx: &Context) -> PyResult {
    let list = zelf.downcast_ref::<PyList>().unwrap();
    list.push(frame[0].clone());
    Ok(ctx.none())
}

static APPEND_PARAMS: [ParamDef; 1] = [ParamDef::positional_only("object")];

static LIST_METHODS: [MethodDef; 1] = [MethodDef {
    name: "append",
    params: &APPEND_PARAMS,
    doc: Some("Append object to the end of the list."),
    func: list_append,
}];

pub(crate) static LIST_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(list_repr),
        },
        SlotDef {
            name: "__bool__",
            func: SlotFunc::Boolean(list_bool),
        },
    ],
    methods: &LIST_METHODS,
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyList>(&LIST_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.list_type,
        &classes(),
        "Built-in mutable sequence.",
        ctx,
    );
}
