//! The process-wide context: registry, factory, bootstrap types, and the
//! shared singletons. `Context::genesis()` is the single initialisation
//! point; its completion happens-before any access to the returned
//! reference.

use crate::builtins::float::PyFloat;
use crate::builtins::pystr::PyStr;
use crate::builtins::singletons::PyNone;
use crate::builtins::tuple::PyTuple;
use crate::builtins::type_::PyTypeRef;
use crate::exceptions::ExceptionZoo;
use crate::object::{PyObjectRef, PyRef};
use crate::registry::TypeRegistry;
use crate::types::{TypeFactory, TypeZoo};
use crate::{PyBaseException, PyBaseExceptionRef};
use ophidian_common::{static_cell, static_cell::StaticCell};

#[derive(Debug)]
pub struct Context {
    pub none: PyRef<PyNone>,
    pub true_value: PyRef<bool>,
    pub false_value: PyRef<bool>,
    pub empty_tuple: PyRef<PyTuple>,

    pub types: TypeZoo,
    pub exceptions: ExceptionZoo,
    pub registry: TypeRegistry,
    pub factory: TypeFactory,
}

static_cell! {
    static GENESIS: Context;
}

impl Context {
    pub fn genesis() -> &'static Self {
        GENESIS.get_or_init(Self::init_genesis)
    }

    #[cold]
    fn init_genesis() -> Self {
        let types = TypeZoo::init();
        let exceptions = ExceptionZoo::init(&types);
        let ctx = Self {
            none: PyRef::new(PyNone),
            true_value: PyRef::new(true),
            false_value: PyRef::new(false),
            empty_tuple: PyRef::new(PyTuple::new(Vec::new())),
            types,
            exceptions,
            registry: TypeRegistry::new(),
            factory: TypeFactory::new(),
        };
        TypeZoo::extend(&ctx);
        ExceptionZoo::extend(&ctx);
        log::debug!("type system genesis complete");
        ctx
    }

    pub fn intern_str(&self, s: &str) -> &'static str {
        crate::intern::intern_str(s)
    }

    // object constructors

    pub fn none(&self) -> PyObjectRef {
        self.none.clone().into_object()
    }

    pub fn new_bool(&self, value: bool) -> PyObjectRef {
        let cell = if value { &self.true_value } else { &self.false_value };
        cell.clone().into_object()
    }

    /// Machine integers live unboxed as adopted `i64` payloads.
    pub fn new_int(&self, value: i64) -> PyObjectRef {
        PyObjectRef::new(value)
    }

    pub fn new_float(&self, value: f64) -> PyRef<PyFloat> {
        PyRef::new(PyFloat::new(value))
    }

    pub fn new_str(&self, value: &str) -> PyRef<PyStr> {
        PyRef::new(PyStr::new(value))
    }

    pub fn new_tuple(&self, elements: Vec<PyObjectRef>) -> PyRef<PyTuple> {
        if elements.is_empty() {
            self.empty_tuple.clone()
        } else {
            PyRef::new(PyTuple::new(elements))
        }
    }

    // exception constructors

    pub fn new_exception(
        &self,
        typ: PyTypeRef,
        args: Vec<PyObjectRef>,
    ) -> PyBaseExceptionRef {
        PyRef::new(PyBaseException::new(typ, self.new_tuple(args)))
    }

    pub fn new_exception_msg(
        &self,
        typ: PyTypeRef,
        msg: impl Into<String>,
    ) -> PyBaseExceptionRef {
        let msg = self.new_str(&msg.into()).into_object();
        self.new_exception(typ, vec![msg])
    }

    pub fn new_type_error(&self, msg: impl Into<String>) -> PyBaseExceptionRef {
        self.new_exception_msg(self.exceptions.type_error.clone(), msg)
    }

    pub fn new_attribute_error(&self, msg: impl Into<String>) -> PyBaseExceptionRef {
        self.new_exception_msg(self.exceptions.attribute_error.clone(), msg)
    }

    pub fn new_value_error(&self, msg: impl Into<String>) -> PyBaseExceptionRef {
        self.new_exception_msg(self.exceptions.value_error.clone(), msg)
    }

    pub fn new_name_error(&self, msg: impl Into<String>) -> PyBaseExceptionRef {
        self.new_exception_msg(self.exceptions.name_error.clone(), msg)
    }
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Context>();
    assert_send_sync::<StaticCell<Context>>();
};
