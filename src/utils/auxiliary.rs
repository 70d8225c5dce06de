use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// Single threaded shared ownership used by every handle of the framework.
pub type SharableRef<T> = Rc<RefCell<T>>;

pub trait SharableRefExt<T> {
    fn new_sharable(inner: T) -> SharableRef<T>;

    fn deref(&self) -> Ref<T>;

    fn deref_mut(&mut self) -> RefMut<T>;
}

impl<T> SharableRefExt<T> for SharableRef<T> {
    fn new_sharable(inner: T) -> SharableRef<T> {
        Rc::new(RefCell::new(inner))
    }

    fn deref_mut(&mut self) -> RefMut<T> {
        self.borrow_mut()
    }

    fn deref(&self) -> Ref<T> {
        self.borrow()
    }
}

/// Compares two pin names ignoring ascii case, so "p9_14" and "P9_14" name the same pin.
pub(crate) fn same_pin_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
