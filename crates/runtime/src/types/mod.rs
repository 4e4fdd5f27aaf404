pub(crate) mod factory;
pub mod slot;
mod spec;
pub mod synthesis;
pub(crate) mod zoo;

pub use factory::TypeFactory;
pub use spec::{SubclassSpec, TypeSpec};
pub use synthesis::{SharedInstance, SyntheticLayout};
pub use zoo::TypeZoo;

use crate::object::PyPayload;
use std::any::TypeId;
use std::sync::Arc;

bitflags::bitflags! {
    /// Feature flags of a type. Fixed once the type is linked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u64 {
        /// Instances carry their own type and admit `__class__` assignment
        /// to a layout-equivalent type.
        const REPLACEABLE = 1 << 0;
        /// Attribute table is frozen after publication.
        const IMMUTABLE = 1 << 1;
        /// Instances own an attribute dictionary.
        const HAS_DICT = 1 << 2;
        /// Instances carry named slot storage.
        const HAS_SLOTS = 1 << 3;
        /// The type of types.
        const IS_TYPE = 1 << 4;
        /// May appear as a base of a new class.
        const BASETYPE = 1 << 5;
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self::BASETYPE
    }
}

/// Lifecycle of a type inside the factory. No observer ever sees a
/// non-ready type through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeState {
    /// Allocated, no MRO.
    New = 0,
    /// Base, MRO, and features in place.
    Linked = 1,
    /// Attribute table populated, constructor index built.
    Exposed = 2,
    /// Published; visible to other threads.
    Ready = 3,
}

impl TypeState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::New,
            1 => Self::Linked,
            2 => Self::Exposed,
            _ => Self::Ready,
        }
    }
}

/// Identity of the host class backing instances of a type. Native classes
/// are ordinary Rust payload types; synthesised classes are layouts minted
/// by subclass synthesis and compared by pointer.
#[derive(Clone)]
pub enum HostClass {
    Native { id: TypeId, name: &'static str },
    Synthetic(Arc<SyntheticLayout>),
}

impl HostClass {
    pub fn of<T: PyPayload>() -> Self {
        Self::Native {
            id: TypeId::of::<T>(),
            name: T::HOST_NAME,
        }
    }

    /// The `TypeId` instances of this host class resolve through. All
    /// synthesised layouts share the carrier payload's id.
    pub fn id(&self) -> TypeId {
        match self {
            Self::Native { id, .. } => *id,
            Self::Synthetic(_) => TypeId::of::<SharedInstance>(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Native { name, .. } => name,
            Self::Synthetic(layout) => layout.describe(),
        }
    }

    /// Layout identity: the relation behind `__class__` compatibility.
    pub fn same_layout(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native { id: a, .. }, Self::Native { id: b, .. }) => a == b,
            (Self::Synthetic(a), Self::Synthetic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for HostClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { name, .. } => write!(f, "Native({name})"),
            Self::Synthetic(layout) => write!(f, "Synthetic({})", layout.describe()),
        }
    }
}
