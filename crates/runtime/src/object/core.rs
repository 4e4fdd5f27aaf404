//! The erased object handle. An object is a reference-counted payload; it
//! does *not* carry a type pointer. Its Python type is derived by asking
//! the registry for the representation of its host class, which is the
//! `TypeId` of the payload. Payloads that do carry their own (mutable)
//! type resolve through a `Shared` representation instead.

use super::payload::PyPayload;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Object-safe erasure of [`PyPayload`]. Implemented for every payload via
/// a blanket impl; user code implements [`PyPayload`] only.
pub trait PyObjectPayload: Any + fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    /// Short name of the host class, used for found types and error text.
    fn host_name(&self) -> &'static str;
    /// The next object in the host-class chain: the embedded canonical
    /// instance of a synthesised or clique payload, if any.
    fn base_view(&self) -> Option<&PyObject>;
}

impl<T: PyPayload> PyObjectPayload for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    #[inline]
    fn host_name(&self) -> &'static str {
        T::HOST_NAME
    }

    #[inline]
    fn base_view(&self) -> Option<&PyObject> {
        PyPayload::base_view(self)
    }
}

/// Borrowed form of an object; analogous to a `&obj` in the host runtime.
pub type PyObject = dyn PyObjectPayload;

impl dyn PyObjectPayload {
    /// The host class of this object.
    #[inline]
    pub fn host_class(&self) -> TypeId {
        self.as_any().type_id()
    }

    #[inline]
    pub fn payload_is<T: PyPayload>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: PyPayload>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Address-based identity, the value behind `id()` and `is`.
    #[inline]
    pub fn get_id(&self) -> usize {
        self.as_any() as *const dyn Any as *const () as usize
    }

    #[inline]
    pub fn is(&self, other: &PyObject) -> bool {
        self.get_id() == other.get_id()
    }

    /// Walks the host-class chain looking for `target`, returning the view
    /// whose host class matches. Direct hit first, then embedded bases.
    pub fn view_as_host(&self, target: TypeId) -> Option<&PyObject> {
        let mut cur: &PyObject = self;
        loop {
            if cur.host_class() == target {
                return Some(cur);
            }
            cur = cur.base_view()?;
        }
    }
}

/// Owned, cheaply clonable handle to an object.
pub struct PyObjectRef {
    inner: Arc<PyObject>,
}

impl Clone for PyObjectRef {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Deref for PyObjectRef {
    type Target = PyObject;
    #[inline]
    fn deref(&self) -> &PyObject {
        &*self.inner
    }
}

impl fmt::Debug for PyObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl PyObjectRef {
    pub fn new<T: PyPayload>(payload: T) -> Self {
        PyRef::new(payload).into()
    }

    pub fn downcast<T: PyPayload>(self) -> Result<PyRef<T>, Self> {
        if self.payload_is::<T>() {
            let any = self.inner.into_any();
            let inner = any
                .downcast::<T>()
                .unwrap_or_else(|_| unreachable!("payload type checked above"));
            Ok(PyRef { inner })
        } else {
            Err(self)
        }
    }
}

/// Statically typed handle to an object whose payload is known to be `T`.
pub struct PyRef<T: PyPayload> {
    inner: Arc<T>,
}

impl<T: PyPayload> Clone for PyRef<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: PyPayload> Deref for PyRef<T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: PyPayload> fmt::Debug for PyRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<T: PyPayload> PyRef<T> {
    pub fn new(payload: T) -> Self {
        Self {
            inner: Arc::new(payload),
        }
    }

    #[inline]
    pub fn as_object(&self) -> &PyObject {
        let obj: &T = &self.inner;
        obj
    }

    #[inline]
    pub fn into_object(self) -> PyObjectRef {
        PyObjectRef { inner: self.inner }
    }

    /// Identity comparison with another typed handle.
    #[inline]
    pub fn is(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub fn get_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T: PyPayload> From<PyRef<T>> for PyObjectRef {
    #[inline]
    fn from(r: PyRef<T>) -> Self {
        r.into_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Marker(u32);
    impl PyPayload for Marker {
        const HOST_NAME: &'static str = "Marker";
    }

    #[test]
    fn downcast_round_trip() {
        let obj = PyObjectRef::new(Marker(3));
        assert!(obj.payload_is::<Marker>());
        assert_eq!(obj.downcast_ref::<Marker>().unwrap().0, 3);
        let typed = obj.clone().downcast::<Marker>().unwrap();
        assert_eq!(typed.0, 3);
        assert!(typed.as_object().is(&obj));
    }

    #[test]
    fn downcast_miss_returns_object() {
        let obj = PyObjectRef::new(Marker(0));
        let back = obj.clone().downcast::<f64>().unwrap_err();
        assert!(back.is(&obj));
    }

    #[test]
    fn host_class_is_payload_type() {
        let obj = PyObjectRef::new(4.5_f64);
        assert_eq!(obj.host_class(), std::any::TypeId::of::<f64>());
        assert_eq!(obj.host_name(), "f64");
    }
}
