use crate::lock::OnceCell;

/// A once-initialised process-wide cell. Completion of the initialiser
/// happens-before every `get` that observes the value.
pub struct StaticCell<T: 'static> {
    inner: OnceCell<T>,
}

impl<T> StaticCell<T> {
    #[doc(hidden)]
    pub const fn _from_once_cell(inner: OnceCell<T>) -> Self {
        Self { inner }
    }

    pub fn get(&'static self) -> Option<&'static T> {
        self.inner.get()
    }

    pub fn set(&'static self, value: T) -> Result<(), T> {
        self.inner.set(value)
    }

    pub fn get_or_init<F>(&'static self, f: F) -> &'static T
    where
        F: FnOnce() -> T,
    {
        self.inner.get_or_init(f)
    }
}

#[macro_export]
macro_rules! static_cell {
    ($($(#[$attr:meta])* $vis:vis static $name:ident: $t:ty;)+) => {
        $($(#[$attr])*
        $vis static $name: $crate::static_cell::StaticCell<$t> =
            $crate::static_cell::StaticCell::_from_once_cell($crate::lock::OnceCell::new());)+
    };
}
