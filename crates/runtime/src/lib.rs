//! The type and dispatch core of the ophidian runtime: a registry relating
//! every host (Rust) class to a Python type, a serialised type factory, a
//! representation-indexed special-method dispatch engine, and layout-keyed
//! subclass synthesis.
//!
//! The crate is deliberately interpreter-free: bytecode, imports, and call
//! sites live elsewhere and talk to this core through [`ops`],
//! [`callable`], and [`Context`].

pub mod builtins;
pub mod callable;
mod context;
pub mod exceptions;
pub mod expose;
pub mod function;
mod intern;
pub mod object;
pub mod ops;
mod registry;
mod representation;
pub mod types;

pub use context::Context;
pub use exceptions::{PyBaseException, PyBaseExceptionRef};
pub use object::{PyObject, PyObjectPayload, PyObjectRef, PyPayload, PyRef};
pub use registry::TypeRegistry;
pub use representation::{Representation, TypeCarrierFn};

pub use ophidian_common as common;

/// The result of any operation that can surface a Python-level error.
pub type PyResult<T = PyObjectRef> = Result<T, PyBaseExceptionRef>;

/// A broken core invariant. Not recoverable and not a Python error: the
/// process image is unsound once one of these fires.
#[cold]
pub(crate) fn interpreter_error(msg: impl core::fmt::Display) -> ! {
    panic!("InterpreterError: {msg}")
}
