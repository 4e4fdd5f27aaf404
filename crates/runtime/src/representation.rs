//! How a host class relates to a Python type. Every host class that ever
//! appears as the class of a live object resolves to exactly one
//! representation.

use crate::builtins::type_::PyTypeRef;
use crate::object::PyObject;

/// Resolves an object of one host class to its Python type and to its
/// index within that type's accepted-representations vector.
#[derive(Clone)]
pub enum Representation {
    /// The representation *is* the type: one crafted host class, one type.
    Simple(PyTypeRef),
    /// A host class accepted at `index` of `owner`'s accepted vector.
    /// Covers both crafted primaries of multi-representation types and
    /// adopted native classes (`f64` under `float`).
    Adopted { owner: PyTypeRef, index: usize },
    /// A host class cited by many types (subclass layouts, exception
    /// cliques). The type is read from the instance itself through the
    /// carrier function.
    Shared { carrier: TypeCarrierFn },
}

/// Reads the current Python type out of an instance of a carrier payload.
pub type TypeCarrierFn = fn(&PyObject) -> PyTypeRef;

impl Representation {
    /// The Python type of `obj`, which must be an instance of a host class
    /// this representation was published for.
    pub fn python_type(&self, obj: &PyObject) -> PyTypeRef {
        match self {
            Self::Simple(typ) => typ.clone(),
            Self::Adopted { owner, .. } => owner.clone(),
            Self::Shared { carrier } => carrier(obj),
        }
    }

    /// Index of the represented host class within its type's accepted
    /// vector. A shared class is always the canonical representation of
    /// the types citing it.
    pub fn index(&self) -> usize {
        match self {
            Self::Simple(_) | Self::Shared { .. } => 0,
            Self::Adopted { index, .. } => *index,
        }
    }

    /// Whether two representations are the same binding. Re-registering a
    /// host class with the same binding is a no-op; with a different one,
    /// a fatal programming error.
    pub fn same_binding(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Simple(a), Self::Simple(b)) => a.is(b),
            (
                Self::Adopted { owner: a, index: i },
                Self::Adopted { owner: b, index: j },
            ) => a.is(b) && i == j,
            (Self::Shared { carrier: a }, Self::Shared { carrier: b }) => {
                std::ptr::fn_addr_eq(*a, *b)
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple(t) => write!(f, "Simple({})", t.name()),
            Self::Adopted { owner, index } => {
                write!(f, "Adopted({}[{}])", owner.name(), index)
            }
            Self::Shared { .. } => f.write_str("Shared"),
        }
    }
}
