//! Function shapes that special methods, accessors, and constructors take.
//! Every implementation receives the context last; the receiver arrives as
//! a borrowed object view already matched to the implementation's declared
//! host class.

use crate::builtins::type_::PyTypeRef;
use crate::function::{FuncArgs, PySetterValue};
use crate::object::{PyObject, PyObjectRef};
use crate::{Context, PyResult};

pub type UnaryFunc = fn(&PyObject, &Context) -> PyResult;
pub type BinaryFunc = fn(&PyObject, &PyObject, &Context) -> PyResult;
pub type StringifyFunc = fn(&PyObject, &Context) -> PyResult<String>;
pub type BooleanFunc = fn(&PyObject, &Context) -> PyResult<bool>;
pub type CallFunc = fn(&PyObject, FuncArgs, &Context) -> PyResult;

/// A regular named method: receiver plus the frame the parser bound.
pub type MethodFunc = fn(&PyObject, &[PyObjectRef], &Context) -> PyResult;
/// A static method: just the bound frame.
pub type StaticFunc = fn(&[PyObjectRef], &Context) -> PyResult;

pub type GetterFunc = fn(&PyObject, &Context) -> PyResult;
pub type SetterFunc = fn(&PyObject, PySetterValue, &Context) -> PyResult<()>;

/// `__new__`: consumes the requested type as first argument.
pub type NewFunc = fn(&PyTypeRef, FuncArgs, &Context) -> PyResult;
/// One indexed host constructor, invoked on behalf of the requested type.
pub type ConstructorFn = fn(&PyTypeRef, &FuncArgs, &Context) -> PyResult;
