use crate::builtins::descriptor::SlotFunc;
use crate::expose::{ClassDefs, ExposedClass, SlotDef};
use crate::object::{PyObject, PyPayload};
use crate::{Context, PyResult};

/// Payload of the `None` singleton.
#[derive(Debug)]
pub struct PyNone;

impl PyPayload for PyNone {
    const HOST_NAME: &'static str = "PyNone";
}

fn none_repr(_zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok("None".to_owned())
}

fn none_bool(_zelf: &PyObject, _ctx: &Context) -> PyResult<bool> {
    Ok(false)
}

pub(crate) static NONE_DEFS: ClassDefs = ClassDefs {
    slots: &[
        SlotDef {
            name: "__repr__",
            func: SlotFunc::Stringify(none_repr),
        },
        SlotDef {
            name: "__bool__",
            func: SlotFunc::Boolean(none_bool),
        },
    ],
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyNone>(&NONE_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.none_type,
        &classes(),
        "The type of the None singleton.",
        ctx,
    );
}
