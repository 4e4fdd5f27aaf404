pub mod bool_;
pub mod descriptor;
pub mod dict;
pub mod float;
pub mod getset;
pub mod int;
pub mod list;
pub mod object;
pub mod pystr;
pub mod singletons;
pub mod tuple;
pub mod type_;

pub use descriptor::{PyBoundMethod, PyBoundWrapper, PyMemberDescriptor, PyMethodDescriptor, PyNewMethod, PyStaticMethod, PyWrapper};
pub use dict::PyDict;
pub use float::PyFloat;
pub use getset::PyGetSet;
pub use int::PyInt;
pub use list::PyList;
pub use object::PyBaseObject;
pub use pystr::PyStr;
pub use singletons::PyNone;
pub use tuple::PyTuple;
pub use type_::{PyAttributes, PyType, PyTypeRef};
