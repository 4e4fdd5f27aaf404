//! Descriptor objects held in type attribute tables: slot wrappers for
//! special methods, method descriptors for regular methods, member
//! descriptors for field access, plus the bound forms handed to user code.
//!
//! A descriptor that serves a multi-representation type stores one
//! implementation per accepted host class; the entry used at call time is
//! chosen by the receiver's representation index, falling back to the
//! first entry whose declared `self` class accepts the receiver.

use crate::builtins::type_::{PyType, PyTypeRef};
use crate::expose::SelfClass;
use crate::function::{ArgParser, FuncArgs, PySetterValue};
use crate::object::{PyObject, PyObjectRef, PyPayload, PyRef};
use crate::types::slot::{
    BinaryFunc, BooleanFunc, CallFunc, GetterFunc, MethodFunc, NewFunc, SetterFunc,
    StaticFunc, StringifyFunc, UnaryFunc,
};
use crate::types::synthesis::SharedInstance;
use crate::{Context, PyResult};

/// Type-erased implementation of one special method. Each variant knows
/// its own calling shape and enforces it before entering the function.
#[derive(Clone, Copy)]
pub enum SlotFunc {
    Unary(UnaryFunc),
    Binary(BinaryFunc),
    Stringify(StringifyFunc),
    Boolean(BooleanFunc),
    Call(CallFunc),
}

impl std::fmt::Debug for SlotFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Unary(_) => "Unary",
            Self::Binary(_) => "Binary",
            Self::Stringify(_) => "Stringify",
            Self::Boolean(_) => "Boolean",
            Self::Call(_) => "Call",
        };
        write!(f, "SlotFunc::{kind}(...)")
    }
}

impl SlotFunc {
    pub(crate) fn invoke(
        &self,
        name: &str,
        obj: &PyObject,
        args: FuncArgs,
        ctx: &Context,
    ) -> PyResult {
        match self {
            Self::Unary(func) => {
                reject_args(name, &args, ctx)?;
                func(obj, ctx)
            }
            Self::Binary(func) => {
                let other = exactly_one(name, args, ctx)?;
                func(obj, &*other, ctx)
            }
            Self::Stringify(func) => {
                reject_args(name, &args, ctx)?;
                let s = func(obj, ctx)?;
                Ok(ctx.new_str(&s).into_object())
            }
            Self::Boolean(func) => {
                reject_args(name, &args, ctx)?;
                Ok(ctx.new_bool(func(obj, ctx)?))
            }
            Self::Call(func) => func(obj, args, ctx),
        }
    }
}

fn reject_args(name: &str, args: &FuncArgs, ctx: &Context) -> PyResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ctx.new_type_error(format!("{name}() takes no arguments")))
    }
}

fn exactly_one(name: &str, mut args: FuncArgs, ctx: &Context) -> PyResult<PyObjectRef> {
    if args.args.len() == 1 && args.kwargs.is_empty() {
        Ok(args.args.pop().unwrap())
    } else {
        Err(ctx.new_type_error(format!(
            "{name}() takes exactly one argument ({} given)",
            args.args.len() + args.kwargs.len()
        )))
    }
}

/// An entry of an implementation vector, tagged with the accepted index it
/// was collected for.
pub(crate) trait IndexedImpl {
    fn accepted_index(&self) -> usize;
    fn self_class(&self) -> &SelfClass;
}

/// Representation-indexed selection: prefer the entry at the receiver's
/// accepted index when the receiver's own type defines the descriptor;
/// otherwise (inherited method, subclass layout, foreign accepted class)
/// take the first entry whose declared `self` class accepts the receiver.
pub(crate) fn select_impl<'a, T: IndexedImpl>(
    entries: &'a [T],
    obj: &PyObject,
    owner: &PyTypeRef,
    name: &str,
    ctx: &Context,
) -> PyResult<&'a T> {
    let rep = ctx.registry.resolve(obj, ctx);
    let typ = rep.python_type(obj);
    if typ.is(owner) {
        let index = rep.index();
        if let Some(entry) = entries
            .iter()
            .find(|e| e.accepted_index() == index && e.self_class().accepts(obj))
        {
            return Ok(entry);
        }
    }
    entries
        .iter()
        .find(|e| e.self_class().accepts(obj))
        .ok_or_else(|| {
            ctx.new_type_error(format!(
                "descriptor '{}' requires a '{}' object but received a '{}'",
                name,
                owner.name(),
                typ.name()
            ))
        })
}

// wrapper_descriptor

pub(crate) struct WrappedSlot {
    pub index: usize,
    pub self_class: SelfClass,
    pub func: SlotFunc,
}

impl IndexedImpl for WrappedSlot {
    fn accepted_index(&self) -> usize {
        self.index
    }
    fn self_class(&self) -> &SelfClass {
        &self.self_class
    }
}

/// One special method of one type: the implementation vector behind a name
/// like `__neg__`.
pub struct PyWrapper {
    pub typ: PyTypeRef,
    pub name: &'static str,
    pub(crate) wrapped: Box<[WrappedSlot]>,
    pub doc: Option<&'static str>,
}

impl PyPayload for PyWrapper {
    const HOST_NAME: &'static str = "PyWrapper";
}

impl std::fmt::Debug for PyWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot wrapper '{}' of '{}'", self.name, self.typ.name())
    }
}

impl PyWrapper {
    pub fn invoke(&self, obj: &PyObject, args: FuncArgs, ctx: &Context) -> PyResult {
        let slot = select_impl(&self.wrapped, obj, &self.typ, self.name, ctx)?;
        let view = slot.self_class.view(obj).unwrap_or(obj);
        slot.func.invoke(self.name, view, args, ctx)
    }

    pub(crate) fn repr_str(&self) -> String {
        format!(
            "<slot wrapper '{}' of '{}' objects>",
            self.name,
            self.typ.name()
        )
    }
}

/// A slot wrapper bound to an instance, as produced by `x.__neg__`.
#[derive(Debug)]
pub struct PyBoundWrapper {
    pub wrapper: PyRef<PyWrapper>,
    pub obj: PyObjectRef,
}

impl PyPayload for PyBoundWrapper {
    const HOST_NAME: &'static str = "PyBoundWrapper";
}

impl PyBoundWrapper {
    pub fn invoke(&self, args: FuncArgs, ctx: &Context) -> PyResult {
        self.wrapper.invoke(&*self.obj, args, ctx)
    }

    pub(crate) fn repr_str(&self, ctx: &Context) -> String {
        format!(
            "<method-wrapper '{}' of {} object at {:#x}>",
            self.wrapper.name,
            crate::ops::type_of(&*self.obj, ctx).name(),
            self.obj.get_id()
        )
    }
}

// method_descriptor

pub(crate) struct MethodSlot {
    pub index: usize,
    pub self_class: SelfClass,
    pub func: MethodFunc,
}

impl IndexedImpl for MethodSlot {
    fn accepted_index(&self) -> usize {
        self.index
    }
    fn self_class(&self) -> &SelfClass {
        &self.self_class
    }
}

/// A regular named method with a parsed signature, one implementation per
/// accepted host class.
pub struct PyMethodDescriptor {
    pub typ: PyTypeRef,
    pub name: &'static str,
    pub doc: Option<&'static str>,
    pub(crate) parser: ArgParser,
    pub(crate) impls: Box<[MethodSlot]>,
}

impl PyPayload for PyMethodDescriptor {
    const HOST_NAME: &'static str = "PyMethodDescriptor";
}

impl std::fmt::Debug for PyMethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "method descriptor for '{}'", self.name)
    }
}

impl PyMethodDescriptor {
    pub fn invoke(&self, obj: &PyObject, args: FuncArgs, ctx: &Context) -> PyResult {
        let slot = select_impl(&self.impls, obj, &self.typ, self.name, ctx)?;
        let view = slot.self_class.view(obj).unwrap_or(obj);
        let frame = self.parser.bind(args, ctx)?;
        (slot.func)(view, &frame, ctx)
    }

    pub(crate) fn repr_str(&self) -> String {
        format!(
            "<method '{}' of '{}' objects>",
            self.name,
            self.typ.name()
        )
    }
}

/// A method descriptor bound to an instance.
#[derive(Debug)]
pub struct PyBoundMethod {
    pub descr: PyRef<PyMethodDescriptor>,
    pub obj: PyObjectRef,
}

impl PyPayload for PyBoundMethod {
    const HOST_NAME: &'static str = "PyBoundMethod";
}

impl PyBoundMethod {
    pub fn invoke(&self, args: FuncArgs, ctx: &Context) -> PyResult {
        self.descr.invoke(&*self.obj, args, ctx)
    }

    pub(crate) fn repr_str(&self, ctx: &Context) -> String {
        format!(
            "<built-in method {} of {} object at {:#x}>",
            self.descr.name,
            crate::ops::type_of(&*self.obj, ctx).name(),
            self.obj.get_id()
        )
    }
}

// staticmethod

/// A method not bound to `self`.
pub struct PyStaticMethod {
    pub typ: PyTypeRef,
    pub name: &'static str,
    pub doc: Option<&'static str>,
    pub(crate) parser: ArgParser,
    pub(crate) func: StaticFunc,
}

impl PyPayload for PyStaticMethod {
    const HOST_NAME: &'static str = "PyStaticMethod";
}

impl std::fmt::Debug for PyStaticMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "static method '{}.{}'", self.typ.name(), self.name)
    }
}

impl PyStaticMethod {
    pub fn invoke(&self, args: FuncArgs, ctx: &Context) -> PyResult {
        let frame = self.parser.bind(args, ctx)?;
        (self.func)(&frame, ctx)
    }

    pub(crate) fn repr_str(&self) -> String {
        format!("<built-in function {}>", self.name)
    }
}

// __new__

/// `__new__`: consumes the requested type as its first argument and
/// constructs an instance, typically through the type's constructor index.
pub struct PyNewMethod {
    pub typ: PyTypeRef,
    pub doc: Option<&'static str>,
    pub(crate) func: NewFunc,
}

impl PyPayload for PyNewMethod {
    const HOST_NAME: &'static str = "PyNewMethod";
}

impl std::fmt::Debug for PyNewMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "__new__ of '{}'", self.typ.name())
    }
}

impl PyNewMethod {
    pub fn invoke(&self, mut args: FuncArgs, ctx: &Context) -> PyResult {
        let cls = args.take_positional().ok_or_else(|| {
            ctx.new_type_error(format!(
                "{}.__new__(): not enough arguments",
                self.typ.name()
            ))
        })?;
        let cls = cls.downcast::<PyType>().map_err(|other| {
            ctx.new_type_error(format!(
                "{}.__new__(X): X is not a type object ({})",
                self.typ.name(),
                crate::ops::type_of(&*other, ctx).name()
            ))
        })?;
        if !cls.fast_issubclass(&self.typ) {
            return Err(ctx.new_type_error(format!(
                "{}.__new__({}): {} is not a subtype of {}",
                self.typ.name(),
                cls.name(),
                cls.name(),
                self.typ.name()
            )));
        }
        (self.func)(&cls, args, ctx)
    }

    pub(crate) fn repr_str(&self) -> String {
        format!(
            "<built-in method __new__ of type object at {:#x}>",
            self.typ.get_id()
        )
    }
}

// member_descriptor

pub enum MemberAccess {
    /// Direct slot storage of a synthesised instance.
    Slot(usize),
    /// Accessor functions over a crafted payload's field.
    Fn {
        get: GetterFunc,
        set: Option<SetterFunc>,
    },
}

/// Direct field access with readonly and optional semantics.
pub struct PyMemberDescriptor {
    pub typ: PyTypeRef,
    pub name: String,
    pub doc: Option<String>,
    pub readonly: bool,
    pub access: MemberAccess,
}

impl PyPayload for PyMemberDescriptor {
    const HOST_NAME: &'static str = "PyMemberDescriptor";
}

impl std::fmt::Debug for PyMemberDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "member '{}' of '{}'", self.name, self.typ.name())
    }
}

impl PyMemberDescriptor {
    fn applies_to<'a>(&self, obj: &'a PyObject, ctx: &Context) -> PyResult<&'a PyObject> {
        let typ = crate::ops::type_of(obj, ctx);
        if !typ.fast_issubclass(&self.typ) {
            return Err(ctx.new_type_error(format!(
                "descriptor '{}' for '{}' objects doesn't apply to a '{}' object",
                self.name,
                self.typ.name(),
                typ.name()
            )));
        }
        Ok(obj)
    }

    pub fn get(&self, obj: &PyObject, ctx: &Context) -> PyResult {
        let obj = self.applies_to(obj, ctx)?;
        match &self.access {
            MemberAccess::Slot(index) => {
                let instance = obj
                    .downcast_ref::<SharedInstance>()
                    .expect("slot member on a non-synthesised instance");
                instance.get_slot(*index).ok_or_else(|| {
                    ctx.new_attribute_error(self.name.clone())
                })
            }
            MemberAccess::Fn { get, .. } => get(obj, ctx),
        }
    }

    pub fn set(
        &self,
        obj: &PyObject,
        value: PySetterValue,
        ctx: &Context,
    ) -> PyResult<()> {
        let obj = self.applies_to(obj, ctx)?;
        if self.readonly {
            return Err(ctx.new_attribute_error("readonly attribute".to_owned()));
        }
        match &self.access {
            MemberAccess::Slot(index) => {
                let instance = obj
                    .downcast_ref::<SharedInstance>()
                    .expect("slot member on a non-synthesised instance");
                match value {
                    PySetterValue::Assign(v) => {
                        instance.set_slot(*index, Some(v));
                        Ok(())
                    }
                    PySetterValue::Delete => {
                        if instance.set_slot(*index, None).is_none() {
                            Err(ctx.new_attribute_error(self.name.clone()))
                        } else {
                            Ok(())
                        }
                    }
                }
            }
            MemberAccess::Fn { set, .. } => match set {
                Some(set) => set(obj, value, ctx),
                None => Err(ctx.new_attribute_error("readonly attribute".to_owned())),
            },
        }
    }

    pub(crate) fn repr_str(&self) -> String {
        format!(
            "<member '{}' of '{}' objects>",
            self.name,
            self.typ.name()
        )
    }
}

// Attribute-protocol helpers over the closed descriptor set. The original
// runtime asks `instanceof Descriptor`; the payload set is closed, so a
// downcast chain plays that role.

/// Binds `attr` (found on the type of `obj`) for instance access. `None`
/// means `attr` is a plain value.
pub(crate) fn bind_for_instance(
    attr: &PyObjectRef,
    obj: &PyObjectRef,
    ctx: &Context,
) -> PyResult<Option<PyObjectRef>> {
    if let Ok(wrapper) = attr.clone().downcast::<PyWrapper>() {
        return Ok(Some(
            PyBoundWrapper {
                wrapper,
                obj: obj.clone(),
            }
            .into_object(),
        ));
    }
    if let Ok(descr) = attr.clone().downcast::<PyMethodDescriptor>() {
        return Ok(Some(
            PyBoundMethod {
                descr,
                obj: obj.clone(),
            }
            .into_object(),
        ));
    }
    if let Some(getset) = attr.downcast_ref::<crate::builtins::getset::PyGetSet>() {
        return getset.get(&**obj, ctx).map(Some);
    }
    if let Some(member) = attr.downcast_ref::<PyMemberDescriptor>() {
        return member.get(&**obj, ctx).map(Some);
    }
    if attr.payload_is::<PyStaticMethod>() || attr.payload_is::<PyNewMethod>() {
        return Ok(Some(attr.clone()));
    }
    Ok(None)
}

/// Whether `attr` intercepts instance stores (a data descriptor).
pub(crate) fn is_data_descriptor(attr: &PyObject) -> bool {
    attr.payload_is::<crate::builtins::getset::PyGetSet>()
        || attr.payload_is::<PyMemberDescriptor>()
}

/// Routes an instance store/delete through a data descriptor. `None` when
/// `attr` is not a data descriptor.
pub(crate) fn data_descr_set(
    attr: &PyObject,
    obj: &PyObject,
    value: PySetterValue,
    ctx: &Context,
) -> Option<PyResult<()>> {
    if let Some(getset) = attr.downcast_ref::<crate::builtins::getset::PyGetSet>() {
        return Some(getset.set(obj, value, ctx));
    }
    if let Some(member) = attr.downcast_ref::<PyMemberDescriptor>() {
        return Some(member.set(obj, value, ctx));
    }
    None
}

// Exposure of the descriptor types themselves, so `repr()` and `type()`
// work on descriptors.

use crate::expose::{ClassDefs, ExposedClass, SlotDef};

macro_rules! stringify_slot {
    ($fname:ident, $payload:ty, |$zelf:ident, $ctx:ident| $body:expr) => {
        fn $fname(obj: &PyObject, $ctx: &Context) -> PyResult<String> {
            let $zelf = obj.downcast_ref::<$payload>().unwrap();
            Ok($body)
        }
    };
}

stringify_slot!(wrapper_repr, PyWrapper, |zelf, _ctx| zelf.repr_str());
stringify_slot!(bound_wrapper_repr, PyBoundWrapper, |zelf, ctx| zelf
    .repr_str(ctx));
stringify_slot!(method_descr_repr, PyMethodDescriptor, |zelf, _ctx| zelf
    .repr_str());
stringify_slot!(bound_method_repr, PyBoundMethod, |zelf, ctx| zelf.repr_str(ctx));
stringify_slot!(static_method_repr, PyStaticMethod, |zelf, _ctx| zelf.repr_str());
stringify_slot!(new_method_repr, PyNewMethod, |zelf, _ctx| zelf.repr_str());
stringify_slot!(member_descr_repr, PyMemberDescriptor, |zelf, _ctx| zelf
    .repr_str());

macro_rules! repr_only_defs {
    ($defs:ident, $func:ident) => {
        pub(crate) static $defs: ClassDefs = ClassDefs {
            slots: &[SlotDef {
                name: "__repr__",
                func: SlotFunc::Stringify($func),
            }],
            ..ClassDefs::EMPTY
        };
    };
}

repr_only_defs!(WRAPPER_DESCR_DEFS, wrapper_repr);
repr_only_defs!(BOUND_WRAPPER_DEFS, bound_wrapper_repr);
repr_only_defs!(METHOD_DESCR_DEFS, method_descr_repr);
repr_only_defs!(BOUND_METHOD_DEFS, bound_method_repr);
repr_only_defs!(STATIC_METHOD_DEFS, static_method_repr);
repr_only_defs!(NEW_METHOD_DEFS, new_method_repr);
repr_only_defs!(MEMBER_DESCR_DEFS, member_descr_repr);

pub(crate) fn wrapper_classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyWrapper>(&WRAPPER_DESCR_DEFS)]
}

pub(crate) fn bound_wrapper_classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyBoundWrapper>(&BOUND_WRAPPER_DEFS)]
}

pub(crate) fn method_descr_classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyMethodDescriptor>(&METHOD_DESCR_DEFS)]
}

pub(crate) fn builtin_method_classes() -> Vec<ExposedClass> {
    vec![
        ExposedClass::of::<PyBoundMethod>(&BOUND_METHOD_DEFS),
        ExposedClass::of::<PyStaticMethod>(&STATIC_METHOD_DEFS),
        ExposedClass::of::<PyNewMethod>(&NEW_METHOD_DEFS),
    ]
}

pub(crate) fn member_descr_classes() -> Vec<ExposedClass> {
    vec![ExposedClass::of::<PyMemberDescriptor>(&MEMBER_DESCR_DEFS)]
}

pub(crate) fn extend(ctx: &Context) {
    ctx.factory.realize_builtin(
        &ctx.types.wrapper_descriptor_type,
        &wrapper_classes(),
        "slot wrapper descriptor",
        ctx,
    );
    ctx.factory.realize_builtin(
        &ctx.types.method_wrapper_type,
        &bound_wrapper_classes(),
        "bound slot wrapper",
        ctx,
    );
    ctx.factory.realize_builtin(
        &ctx.types.method_descriptor_type,
        &method_descr_classes(),
        "method descriptor",
        ctx,
    );
    ctx.factory.realize_builtin(
        &ctx.types.builtin_method_type,
        &builtin_method_classes(),
        "built-in function or method",
        ctx,
    );
    ctx.factory.realize_builtin(
        &ctx.types.member_descriptor_type,
        &member_descr_classes(),
        "member descriptor",
        ctx,
    );
}
