use crate::object::PyObjectRef;
use indexmap::IndexMap;

/// Positional and keyword arguments of one call, as they arrive from a
/// call site. Keyword order is preserved.
#[derive(Debug, Default, Clone)]
pub struct FuncArgs {
    pub args: Vec<PyObjectRef>,
    pub kwargs: IndexMap<String, PyObjectRef>,
}

#[derive(Debug, Default)]
pub struct PosArgs(Vec<PyObjectRef>);

impl PosArgs {
    pub fn new(args: Vec<PyObjectRef>) -> Self {
        Self(args)
    }

    pub fn into_vec(self) -> Vec<PyObjectRef> {
        self.0
    }
}

impl From<Vec<PyObjectRef>> for PosArgs {
    fn from(args: Vec<PyObjectRef>) -> Self {
        Self(args)
    }
}

#[derive(Debug, Default)]
pub struct KwArgs(pub IndexMap<String, PyObjectRef>);

impl<A> From<A> for FuncArgs
where
    A: Into<PosArgs>,
{
    fn from(args: A) -> Self {
        Self {
            args: args.into().into_vec(),
            kwargs: IndexMap::new(),
        }
    }
}

impl FuncArgs {
    pub fn new<A, K>(args: A, kwargs: K) -> Self
    where
        A: Into<PosArgs>,
        K: Into<KwArgs>,
    {
        let PosArgs(args) = args.into();
        let KwArgs(kwargs) = kwargs.into();
        Self { args, kwargs }
    }

    /// Positional arguments plus keyword names paired in call order, the
    /// shape of the universal call interface.
    pub fn with_kw_names(
        mut values: Vec<PyObjectRef>,
        kw_names: impl IntoIterator<Item = String>,
    ) -> Self {
        let kw_names: Vec<String> = kw_names.into_iter().collect();
        let split = values.len() - kw_names.len();
        let kw_values = values.split_off(split);
        Self {
            args: values,
            kwargs: kw_names.into_iter().zip(kw_values).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    pub fn prepend_arg(&mut self, item: PyObjectRef) {
        self.args.reserve_exact(1);
        self.args.insert(0, item);
    }

    pub fn take_positional(&mut self) -> Option<PyObjectRef> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.remove(0))
        }
    }
}

impl From<KwArgs> for FuncArgs {
    fn from(kwargs: KwArgs) -> Self {
        Self {
            args: Vec::new(),
            kwargs: kwargs.0,
        }
    }
}

impl From<Vec<(String, PyObjectRef)>> for KwArgs {
    fn from(pairs: Vec<(String, PyObjectRef)>) -> Self {
        Self(pairs.into_iter().collect())
    }
}

/// The value side of an attribute mutation: a `__set__`/`setattr` carries
/// an assignment, a `__delete__`/`delattr` carries a deletion.
#[derive(Debug, Clone)]
pub enum PySetterValue<T = PyObjectRef> {
    Assign(T),
    Delete,
}
