mod core;
mod payload;

pub use self::core::{PyObject, PyObjectPayload, PyObjectRef, PyRef};
pub use self::payload::PyPayload;
