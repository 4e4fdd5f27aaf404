//! Attribute names are interned so attribute tables can key on `&'static
//! str` and compare by pointer-width equality. Names are never reclaimed;
//! the set of attribute names in a process is effectively finite.

use ophidian_common::lock::{Lazy, PyMutex};
use std::collections::HashSet;

static POOL: Lazy<PyMutex<HashSet<&'static str, ahash::RandomState>>> =
    Lazy::new(|| PyMutex::new(HashSet::default()));

pub fn intern_str(s: &str) -> &'static str {
    let mut pool = POOL.lock();
    if let Some(interned) = pool.get(s) {
        return interned;
    }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    pool.insert(leaked);
    leaked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern_str("__neg__");
        let b = intern_str(&String::from("__neg__"));
        assert!(std::ptr::eq(a, b));
    }
}
