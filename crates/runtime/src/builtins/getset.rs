//! Get-set descriptors: computed attributes with parallel
//! getter/setter vectors, one pair per accepted host class.

use crate::builtins::descriptor::{IndexedImpl, select_impl};
use crate::builtins::type_::PyTypeRef;
use crate::expose::SelfClass;
use crate::function::PySetterValue;
use crate::object::{PyObject, PyPayload};
use crate::types::slot::{GetterFunc, SetterFunc};
use crate::{Context, PyResult};

pub(crate) struct GetSetSlot {
    pub index: usize,
    pub self_class: SelfClass,
    pub getter: GetterFunc,
    pub setter: Option<SetterFunc>,
}

impl IndexedImpl for GetSetSlot {
    fn accepted_index(&self) -> usize {
        self.index
    }
    fn self_class(&self) -> &SelfClass {
        &self.self_class
    }
}

pub struct PyGetSet {
    pub typ: PyTypeRef,
    pub name: &'static str,
    pub doc: Option<&'static str>,
    pub(crate) slots: Box<[GetSetSlot]>,
}

impl PyPayload for PyGetSet {
    const HOST_NAME: &'static str = "PyGetSet";
}

impl std::fmt::Debug for PyGetSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attribute '{}' of '{}'", self.name, self.typ.name())
    }
}

impl PyGetSet {
    pub fn get(&self, obj: &PyObject, ctx: &Context) -> PyResult {
        let slot = select_impl(&self.slots, obj, &self.typ, self.name, ctx)?;
        let view = slot.self_class.view(obj).unwrap_or(obj);
        (slot.getter)(view, ctx)
    }

    pub fn set(
        &self,
        obj: &PyObject,
        value: PySetterValue,
        ctx: &Context,
    ) -> PyResult<()> {
        let slot = select_impl(&self.slots, obj, &self.typ, self.name, ctx)?;
        match slot.setter {
            Some(setter) => {
                let view = slot.self_class.view(obj).unwrap_or(obj);
                setter(view, value, ctx)
            }
            None => Err(ctx.new_attribute_error("readonly attribute".to_owned())),
        }
    }

    pub(crate) fn repr_str(&self) -> String {
        format!(
            "<attribute '{}' of '{}' objects>",
            self.name,
            self.typ.name()
        )
    }
}

fn getset_repr(obj: &PyObject, _ctx: &Context) -> PyResult<String> {
    Ok(obj.downcast_ref::<PyGetSet>().unwrap().repr_str())
}

use crate::builtins::descriptor::SlotFunc;
use crate::expose::{ClassDefs, ExposedClass, SlotDef};

pub(crate) static GETSET_DEFS: ClassDefs = ClassDefs {
    slots: &[SlotDef {
        name: "__repr__",
        func: SlotFunc::Stringify(getset_repr),
    }],
    ..ClassDefs::EMPTY
};

pub(crate) fn classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyGetSet>(&GETSET_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.getset_type,
        &classes(),
        "getset descriptor",
        ctx,
    );
}
