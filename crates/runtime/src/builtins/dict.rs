//! `dict`, string-keyed. The core only needs dictionaries for keyword
//! collection and instance attribute storage, both of which key on
//! strings; general hashing of arbitrary objects belongs to the full
//! runtime, not the type core.

use crate::builtins::descriptor::SlotFunc;
use crate::builtins::pystr::str_value;
use crate::expose::{ClassDefs, ExposedClass, MethodDef, SlotDef};
use crate::function::ParamDef;
use crate::object::{PyObject, PyObjectRef, PyPayload};
use crate::{Context, PyResult};
use indexmap::IndexMap;
use itertools::Itertools;
use ophidian_common::lock::PyRwLock;

#[derive(Debug, Default)]
pub struct PyDict {
    entries: PyRwLock<IndexMap<String, PyObjectRef, ahash::RandomState>>,
}

impl PyDict {
    pub fn set_item(&self, key: &str, value: PyObjectRef) {
        self.entries.write().insert(key.to_owned(), value);
    }

    pub fn get_item(&self, key: &str) -> Option<PyObjectRef> {
        self.entries.read().get(key).cloned()
    }

    pub fn del_item(&self, key: &str) -> Option<PyObjectRef> {
        self.entries.write().shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl PyPayload for PyDict {
    const HOST_NAME: &'static str = "PyDict";
}

fn dict_repr(zelf: &PyObject, ctx: &Context) -> PyResult<String> {
    let dict = zelf.downcast_ref::<PyDict>().unwrap();
    let snapshot: Vec<(String, PyObjectRef)> = dict
        .entries
        .read()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut parts = Vec::with_capacity(snapshot.len());
    for (key, value) in snapshot {
        parts.push(format!(
            "{}: {}",
            crate::builtins::pystr::quote(&key),
            crate::ops::repr(&*value, ctx)?.as_str()
        ));
    }
    Ok(format!("{{{}}}", parts.iter().format(", ")))
}

fn dict_bool(zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(!zelf.downcast_ref::<PyDict>().unwrap().is_empty())
}

fn dict_get(zelf: &PyObject, frame: &[PyObjectRef], ctx: &Context) -> PyResult {
    let dict = zelf.downcast_ref::<PyDict>().unwrap();
    let key = str_value(&*frame[0]).ok_or_else(|| {
        ctx.new_type_error(format!(
            "dict keys are strings in the type core, not '{}'",
            crate::ops::type_of(&*frame[0], ctx).name()
        ))
    })?;
    Ok(dict.get_item(key).unwrap_or_else(|| frame[1].clone()))
}

static GET_PARAMS: [ParamDef; 2] = [
    ParamDef::positional_only("key"),
    ParamDef::positional_only("default").with_default("None"),
];

static DICT_METHODS: [MethodDef; 1] = [MethodDef {
    name: "get",
    params: &GET_PARAMS,
    doc: Some("Return the value for key if key is in the dictionary, else default."),
    func: dict_get,
}];

pub(crate) static DICT_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(dict_repr),
        },
        SlotDef {
            name: "__bool__",
            func: SlotFunc::Boolean(dict_bool),
        },
    ],
    methods: &DICT_METHODS,
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyDict>(&DICT_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.dict_type,
        &classes(),
        "dict() -> new empty dictionary",
        ctx,
    );
}
