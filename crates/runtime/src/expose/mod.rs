//! Exposure: turning the definition tables of implementation host classes
//! into attribute specifications the factory builds descriptors from.
//!
//! A type may gather implementations from several host classes (its
//! crafted primary, adopted native classes, accepted foreign classes, and
//! auxiliary method sources). Exposure merges them by attribute name; the
//! entries collected for one name become the representation-indexed
//! implementation vector of the resulting descriptor.

pub mod special;

use crate::builtins::descriptor::SlotFunc;
use crate::object::{PyObject, PyPayload};
use crate::representation::TypeCarrierFn;
use crate::types::slot::{
    ConstructorFn, GetterFunc, MethodFunc, NewFunc, SetterFunc, StaticFunc,
};
use crate::function::ParamDef;
use crate::{Context, PyResult};
use indexmap::IndexMap;
use std::any::TypeId;

/// The receiver class an implementation declares for `self`.
#[derive(Clone, Copy)]
pub enum SelfClass {
    /// Accepts any receiver; used by `object` and auxiliary method sources.
    Any,
    Class { id: TypeId, name: &'static str },
}

impl SelfClass {
    pub fn of<T: PyPayload>() -> Self {
        Self::Class {
            id: TypeId::of::<T>(),
            name: T::HOST_NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "object",
            Self::Class { name, .. } => name,
        }
    }

    /// Whether an instance may serve as `self` for an implementation
    /// declared on this class. Walks the receiver's host-class chain, so
    /// a synthesised instance is accepted by its canonical base's
    /// implementations.
    pub fn accepts(&self, obj: &PyObject) -> bool {
        match self {
            Self::Any => true,
            Self::Class { id, .. } => obj.view_as_host(*id).is_some(),
        }
    }

    /// The receiver view an implementation of this class operates on.
    pub fn view<'a>(&self, obj: &'a PyObject) -> Option<&'a PyObject> {
        match self {
            Self::Any => Some(obj),
            Self::Class { id, .. } => obj.view_as_host(*id),
        }
    }
}

impl std::fmt::Debug for SelfClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One implementation host class together with its definition tables.
#[derive(Clone, Copy)]
pub struct ExposedClass {
    /// Identity of the class (registry key, accepted-vector entry).
    pub class: SelfClass,
    /// What exposed implementations record as their `self` class.
    pub receiver: SelfClass,
    pub defs: &'static ClassDefs,
}

impl ExposedClass {
    pub fn of<T: PyPayload>(defs: &'static ClassDefs) -> Self {
        Self {
            class: SelfClass::of::<T>(),
            receiver: SelfClass::of::<T>(),
            defs,
        }
    }

    /// A class whose implementations accept any receiver (`object`).
    pub fn of_universal<T: PyPayload>(defs: &'static ClassDefs) -> Self {
        Self {
            class: SelfClass::of::<T>(),
            receiver: SelfClass::Any,
            defs,
        }
    }
}

/// Definition tables of one implementation class. The closed annotation
/// vocabulary of the original system maps onto these tables: slot entries
/// are special methods, `params` carry the binding-mode and literal-default
/// markers, `carrier` marks a class whose instances hold their own type.
pub struct ClassDefs {
    pub slots: &'static [SlotDef],
    pub methods: &'static [MethodDef],
    pub statics: &'static [StaticDef],
    pub getsets: &'static [GetSetDef],
    pub members: &'static [MemberDef],
    pub constructors: &'static [ConstructorDef],
    pub new: Option<NewDef>,
    pub carrier: Option<TypeCarrierFn>,
}

impl ClassDefs {
    pub const EMPTY: ClassDefs = ClassDefs {
        slots: &[],
        methods: &[],
        statics: &[],
        getsets: &[],
        members: &[],
        constructors: &[],
        new: None,
        carrier: None,
    };
}

pub struct SlotDef {
    pub name: &'static str,
    pub func: SlotFunc,
}

pub struct MethodDef {
    pub name: &'static str,
    pub params: &'static [ParamDef],
    pub doc: Option<&'static str>,
    pub func: MethodFunc,
}

pub struct StaticDef {
    pub name: &'static str,
    pub params: &'static [ParamDef],
    pub doc: Option<&'static str>,
    pub func: StaticFunc,
}

pub struct GetSetDef {
    pub name: &'static str,
    pub doc: Option<&'static str>,
    pub getter: GetterFunc,
    pub setter: Option<SetterFunc>,
}

pub struct MemberDef {
    pub name: &'static str,
    pub doc: Option<&'static str>,
    pub readonly: bool,
    pub getter: GetterFunc,
    pub setter: Option<SetterFunc>,
}

/// Coarse parameter classes that key the constructor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// The requested type, always passed first.
    Type,
    /// One object argument.
    Object,
    /// The remaining argument vector, unconstrained.
    Args,
}

pub struct ConstructorDef {
    pub signature: &'static [ParamClass],
    pub func: ConstructorFn,
}

impl ConstructorDef {
    /// Whether a call with `argc` arguments (excluding the type) matches.
    pub fn matches(&self, argc: usize) -> bool {
        let fixed = self
            .signature
            .iter()
            .filter(|p| matches!(p, ParamClass::Object))
            .count();
        let variadic = self.signature.contains(&ParamClass::Args);
        if variadic { argc >= fixed } else { argc == fixed }
    }
}

pub struct NewDef {
    pub doc: Option<&'static str>,
    pub func: NewFunc,
}

/// One entry of a wrapper descriptor's implementation vector.
pub(crate) struct WrapperEntry {
    pub index: usize,
    pub self_class: SelfClass,
    pub func: SlotFunc,
}

pub(crate) struct MethodEntry {
    pub index: usize,
    pub self_class: SelfClass,
    pub func: MethodFunc,
}

pub(crate) struct GetSetEntry {
    pub index: usize,
    pub self_class: SelfClass,
    pub getter: GetterFunc,
    pub setter: Option<SetterFunc>,
}

/// Attribute specification produced by exposure, consumed by the factory.
pub(crate) enum AttrSpec {
    Wrapper {
        name: &'static str,
        doc: &'static str,
        entries: Vec<WrapperEntry>,
    },
    Method {
        name: &'static str,
        params: &'static [ParamDef],
        doc: Option<&'static str>,
        entries: Vec<MethodEntry>,
    },
    Static {
        name: &'static str,
        params: &'static [ParamDef],
        doc: Option<&'static str>,
        func: StaticFunc,
    },
    GetSet {
        name: &'static str,
        doc: Option<&'static str>,
        entries: Vec<GetSetEntry>,
    },
    Member {
        name: &'static str,
        doc: Option<&'static str>,
        readonly: bool,
        getter: GetterFunc,
        setter: Option<SetterFunc>,
    },
    New {
        doc: Option<&'static str>,
        func: NewFunc,
    },
}

pub(crate) struct Exposure {
    pub attrs: Vec<AttrSpec>,
    pub constructors: Vec<&'static ConstructorDef>,
}

/// Scans the implementation classes of a type under construction and
/// merges their definitions into one specification per attribute name.
/// `classes` are in accepted order starting at accepted index
/// `first_index` (non-zero when leading accepted entries are inherited
/// and not re-exposed); `sources` are auxiliary method-source tables
/// whose implementations accept any receiver.
pub(crate) fn scan(
    classes: &[ExposedClass],
    first_index: usize,
    sources: &[&'static ClassDefs],
    type_name: &str,
    ctx: &Context,
) -> PyResult<Exposure> {
    let mut attrs: IndexMap<&'static str, AttrSpec, ahash::RandomState> =
        IndexMap::default();
    let mut constructors = Vec::new();

    let universal = |defs: &'static ClassDefs| ExposedClass {
        // Identity is irrelevant for a method source; nothing is published
        // for it and its entries accept any receiver.
        class: SelfClass::Any,
        receiver: SelfClass::Any,
        defs,
    };
    let all: Vec<ExposedClass> = classes
        .iter()
        .copied()
        .chain(sources.iter().copied().map(universal))
        .collect();

    for (offset, exposed) in all.iter().enumerate() {
        let index = first_index + offset;
        let defs = exposed.defs;

        for slot in defs.slots {
            let known = special::find(slot.name).ok_or_else(|| {
                ctx.new_type_error(format!(
                    "exposing '{}' on '{type_name}': not a known special method",
                    slot.name
                ))
            })?;
            if known.kind != slot.func.kind() {
                return Err(ctx.new_type_error(format!(
                    "exposing '{}' on '{type_name}': implementation does not have \
                     the special method's signature",
                    slot.name
                )));
            }
            let entry = WrapperEntry {
                index,
                self_class: exposed.receiver,
                func: slot.func,
            };
            match attrs
                .entry(slot.name)
                .or_insert_with(|| AttrSpec::Wrapper {
                    name: slot.name,
                    doc: known.doc,
                    entries: Vec::new(),
                }) {
                AttrSpec::Wrapper { entries, .. } => entries.push(entry),
                _ => {
                    return Err(mixed_kind_error(ctx, type_name, slot.name));
                }
            }
        }

        for method in defs.methods {
            let entry = MethodEntry {
                index,
                self_class: exposed.receiver,
                func: method.func,
            };
            match attrs
                .entry(method.name)
                .or_insert_with(|| AttrSpec::Method {
                    name: method.name,
                    params: method.params,
                    doc: method.doc,
                    entries: Vec::new(),
                }) {
                AttrSpec::Method { entries, .. } => entries.push(entry),
                _ => return Err(mixed_kind_error(ctx, type_name, method.name)),
            }
        }

        for getset in defs.getsets {
            let entry = GetSetEntry {
                index,
                self_class: exposed.receiver,
                getter: getset.getter,
                setter: getset.setter,
            };
            match attrs
                .entry(getset.name)
                .or_insert_with(|| AttrSpec::GetSet {
                    name: getset.name,
                    doc: getset.doc,
                    entries: Vec::new(),
                }) {
                AttrSpec::GetSet { entries, .. } => entries.push(entry),
                _ => return Err(mixed_kind_error(ctx, type_name, getset.name)),
            }
        }

        for member in defs.members {
            attrs.entry(member.name).or_insert(AttrSpec::Member {
                name: member.name,
                doc: member.doc,
                readonly: member.readonly,
                getter: member.getter,
                setter: member.setter,
            });
        }

        for stat in defs.statics {
            attrs.entry(stat.name).or_insert(AttrSpec::Static {
                name: stat.name,
                params: stat.params,
                doc: stat.doc,
                func: stat.func,
            });
        }

        if let Some(new) = &defs.new {
            attrs.entry("__new__").or_insert(AttrSpec::New {
                doc: new.doc,
                func: new.func,
            });
        }

        constructors.extend(defs.constructors.iter());
    }

    Ok(Exposure {
        attrs: attrs.into_values().collect(),
        constructors,
    })
}

fn mixed_kind_error(
    ctx: &Context,
    type_name: &str,
    attr: &str,
) -> crate::PyBaseExceptionRef {
    ctx.new_type_error(format!(
        "exposing '{attr}' on '{type_name}': conflicting attribute kinds \
         across implementation classes"
    ))
}
