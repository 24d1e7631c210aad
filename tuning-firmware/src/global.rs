//! A global, lock-protected slot for the driver a concrete board installs.
//!
//! Mirrors the install/try_lock/Proxy pattern used for this board family's
//! global UART: a `'static` [`spin::Mutex<Option<D>>`] that starts empty,
//! is installed once at boot, and handed out to callers (including ISRs)
//! as a [`Proxy`] that panics if taken before installation.

use core::ops::{Deref, DerefMut};

pub struct GlobalDriver<D: 'static> {
    inner: spin::Mutex<Option<D>>,
}

impl<D> GlobalDriver<D> {
    pub const fn new() -> Self {
        GlobalDriver {
            inner: spin::Mutex::new(None),
        }
    }

    pub fn install(&self, driver: D) {
        *self.inner.lock() = Some(driver);
    }

    pub fn lock(&self) -> Proxy<'_, D> {
        // unwrap is ok: callers only reach the main loop after install()
        Proxy::new(self.inner.lock()).expect("driver not installed")
    }

    pub fn try_lock(&self) -> Option<Proxy<'_, D>> {
        Proxy::new(self.inner.try_lock()?)
    }
}

impl<D> Default for GlobalDriver<D> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Proxy<'a, D> {
    guard: spin::MutexGuard<'a, Option<D>>,
}

impl<'a, D> Proxy<'a, D> {
    fn new(guard: spin::MutexGuard<'a, Option<D>>) -> Option<Self> {
        if guard.is_none() {
            None
        } else {
            Some(Proxy { guard })
        }
    }
}

impl<'a, D> Deref for Proxy<'a, D> {
    type Target = D;

    fn deref(&self) -> &Self::Target {
        // unwrap is ok, new() guarantees this is_some()
        self.guard.as_ref().unwrap()
    }
}

impl<'a, D> DerefMut for Proxy<'a, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // unwrap is ok, new() guarantees this is_some()
        self.guard.as_mut().unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn try_lock_none_before_install() {
        let slot: GlobalDriver<u32> = GlobalDriver::new();
        assert!(slot.try_lock().is_none());
    }

    #[test]
    fn install_then_lock_sees_value() {
        let slot: GlobalDriver<u32> = GlobalDriver::new();
        slot.install(7);
        assert_eq!(*slot.lock(), 7);
    }
}
