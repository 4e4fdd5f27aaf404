//! `bool`. There is no crafted payload: the host's primitive `bool` is
//! the adopted representation, and the two singletons in the context are
//! the only instances handed out. Everything arithmetic is inherited
//! from `int`, which accepts `bool` receivers.

use crate::builtins::descriptor::SlotFunc;
use crate::builtins::type_::PyTypeRef;
use crate::expose::{ClassDefs, ExposedClass, NewDef, SlotDef};
use crate::function::FuncArgs;
use crate::object::PyObject;
use crate::{Context, PyResult};

fn bool_repr(zelf: &PyObject, _ctx: &Context) -> PyResult<String> {
    let b = zelf.downcast_ref::<bool>().unwrap();
    Ok(if *b { "True" } else { "False" }.to_owned())
}

fn bool_new(cls: &PyTypeRef, mut args: FuncArgs, ctx: &Context) -> PyResult {
    if !cls.is(&ctx.types.bool_type) {
        return Err(ctx.new_type_error(format!(
            "bool.__new__({}): bool is not an acceptable base type",
            cls.name()
        )));
    }
    let truth = match args.take_positional() {
        Some(arg) => crate::ops::is_true(&*arg, ctx)?,
        None => false,
    };
    Ok(ctx.new_bool(truth))
}

pub(crate) static BOOL_DEFS: ClassDefs = ClassDefs {
    slots: &[SlotDef {
        name: "__repr__",
        func: SlotFunc::Stringify(bool_repr),
    }],
    new: Some(NewDef {
        doc: Some("bool(x) -> True when x is truthy"),
        func: bool_new,
    }),
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<bool>(&BOOL_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.bool_type,
        &classes(),
        "bool(x) -> bool",
        ctx,
    );
}
