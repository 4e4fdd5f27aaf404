//! Builders the factory consumes. `TypeSpec` describes a crafted type
//! (implementation classes, features, documentation); `SubclassSpec`
//! describes a Python-defined subclass (bases, slot names, dict flag).

use crate::builtins::type_::PyTypeRef;
use crate::expose::{ClassDefs, ExposedClass};
use crate::types::TypeFlags;

pub struct TypeSpec {
    pub(crate) name: String,
    pub(crate) bases: Vec<PyTypeRef>,
    pub(crate) primary: Option<ExposedClass>,
    pub(crate) adopted: Vec<ExposedClass>,
    pub(crate) accepted: Vec<ExposedClass>,
    pub(crate) sources: Vec<&'static ClassDefs>,
    pub(crate) features: TypeFlags,
    pub(crate) doc: Option<String>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            primary: None,
            adopted: Vec::new(),
            accepted: Vec::new(),
            sources: Vec::new(),
            features: TypeFlags::default(),
            doc: None,
        }
    }

    /// Adds a Python base. The default base, when none is given, is
    /// `object`.
    pub fn base(mut self, base: PyTypeRef) -> Self {
        self.bases.push(base);
        self
    }

    /// Overrides the primary host class; without this the primary is
    /// inherited from the base (the clique arrangement).
    pub fn primary(mut self, class: ExposedClass) -> Self {
        self.primary = Some(class);
        self
    }

    /// Adopts an additional host class as a representation of this type.
    pub fn adopt(mut self, class: ExposedClass) -> Self {
        self.adopted.push(class);
        self
    }

    /// Accepts a foreign host class as `self` of this type's methods
    /// without representing the type.
    pub fn accept(mut self, class: ExposedClass) -> Self {
        self.accepted.push(class);
        self
    }

    /// An auxiliary class whose method definitions populate the type.
    pub fn methods(mut self, defs: &'static ClassDefs) -> Self {
        self.sources.push(defs);
        self
    }

    pub fn add(mut self, features: TypeFlags) -> Self {
        self.features |= features;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

pub struct SubclassSpec {
    pub(crate) name: String,
    pub(crate) bases: Vec<PyTypeRef>,
    pub(crate) slots: Vec<String>,
    pub(crate) has_dict: bool,
    pub(crate) doc: Option<String>,
}

impl SubclassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            slots: Vec::new(),
            has_dict: false,
            doc: None,
        }
    }

    pub fn base(mut self, base: PyTypeRef) -> Self {
        self.bases.push(base);
        self
    }

    pub fn slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(name.into());
        self
    }

    pub fn slots(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.slots.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_dict(mut self, has_dict: bool) -> Self {
        self.has_dict = has_dict;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}
