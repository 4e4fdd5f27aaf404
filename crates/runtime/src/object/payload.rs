use super::core::{PyObject, PyObjectRef, PyRef};
use std::any::TypeId;
use std::fmt;

/// A Rust type whose values may live as Python objects. The implementing
/// type *is* the host class: its `TypeId` keys the registry.
///
/// Most payloads are crafted for one Python type (`PyFloat`, `PyStr`).
/// Plain host types can be adopted as well; the impls for `f64`, `i64`,
/// `bool`, and `String` below make the host's native values first-class
/// objects of `float`, `int`, `bool`, and `str`.
pub trait PyPayload: fmt::Debug + Send + Sync + Sized + 'static {
    /// Short host-class name for error text and found types.
    const HOST_NAME: &'static str;

    #[inline]
    fn host_class() -> TypeId {
        TypeId::of::<Self>()
    }

    /// The embedded canonical instance, for payloads that extend another
    /// host class by composition (synthesised instances, exception
    /// subclasses with storage). `None` for root payloads.
    #[inline]
    fn base_view(&self) -> Option<&PyObject> {
        None
    }

    #[inline]
    fn into_ref(self) -> PyRef<Self> {
        PyRef::new(self)
    }

    #[inline]
    fn into_object(self) -> PyObjectRef {
        PyRef::new(self).into()
    }
}

impl PyPayload for f64 {
    const HOST_NAME: &'static str = "f64";
}

impl PyPayload for i64 {
    const HOST_NAME: &'static str = "i64";
}

impl PyPayload for bool {
    const HOST_NAME: &'static str = "bool";
}

impl PyPayload for String {
    const HOST_NAME: &'static str = "String";
}
