#[cfg(not(feature = "esp"))]
use std::{
    future::poll_fn,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    task::Poll,
};
use std::{sync::Arc, time::Duration};

#[cfg(feature = "esp")]
use esp_idf_svc::hal::{
    delay::FreeRtos,
    task::{asynch::Notification as AsyncNotif, block_on},
};
#[cfg(not(feature = "esp"))]
use futures::task::AtomicWaker;

#[cfg(not(feature = "esp"))]
/// Shared flag signalled whenever there is work for the update loop.
/// It can be awaited from async code or waited on from blocking code.
pub struct Notification {
    inner: Arc<NotificationInner>,
}

#[cfg(not(feature = "esp"))]
/// Cloneable handle used to signal a `Notification`.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotificationInner>,
}

#[cfg(not(feature = "esp"))]
struct NotificationInner {
    notified: Mutex<bool>,
    condvar: Condvar,
    waker: AtomicWaker,
}

#[cfg(not(feature = "esp"))]
impl NotificationInner {
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.notified.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes the pending signal, if any
    fn take(&self) -> bool {
        std::mem::replace(&mut *self.flag(), false)
    }
}

#[cfg(not(feature = "esp"))]
impl Notification {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                notified: Mutex::new(false),
                condvar: Condvar::new(),
                waker: AtomicWaker::new(),
            }),
        }
    }

    /// Waits until the notification is signalled, consuming the signal.
    pub async fn wait(&self) {
        poll_fn(|cx| {
            self.inner.waker.register(cx.waker());
            if self.inner.take() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// Blocks the current thread until the notification is signalled.
    pub fn blocking_wait(&self) {
        let mut notified = self.inner.flag();
        while !*notified {
            notified = self
                .inner
                .condvar
                .wait(notified)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *notified = false;
    }

    /// Blocks the current thread until the notification is signalled or `timeout` elapses.
    ///
    /// # Returns
    ///
    /// True if a signal was consumed, false on timeout.
    pub fn blocking_wait_timeout(&self, timeout: Duration) -> bool {
        let notified = self.inner.flag();
        let (mut notified, _) = self
            .inner
            .condvar
            .wait_timeout_while(notified, timeout, |notified| !*notified)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *notified, false)
    }
}

#[cfg(not(feature = "esp"))]
impl From<&Notification> for Notifier {
    fn from(value: &Notification) -> Self {
        Self {
            inner: value.inner.clone(),
        }
    }
}

#[cfg(not(feature = "esp"))]
impl Notifier {
    /// Signals the notification, waking both blocking and async waiters.
    pub fn notify(&self) {
        *self.inner.flag() = true;
        self.inner.condvar.notify_all();
        self.inner.waker.wake();
    }
}

/// Shared flag signalled whenever there is work for the update loop, backed by the task
/// notification of the hal.
#[cfg(feature = "esp")]
pub struct Notification {
    notif: Arc<AsyncNotif>,
}

/// Cloneable handle used to signal a `Notification`.
#[cfg(feature = "esp")]
#[derive(Clone)]
pub struct Notifier {
    notif: Arc<AsyncNotif>,
}

#[cfg(feature = "esp")]
impl Notification {
    pub fn new() -> Self {
        Self {
            notif: Arc::new(AsyncNotif::new()),
        }
    }

    /// Waits until the notification is signalled, consuming the signal.
    pub async fn wait(&self) {
        self.notif.wait().await;
    }

    /// Blocks the current task until the notification is signalled.
    pub fn blocking_wait(&self) {
        block_on(self.notif.wait());
    }

    /// Blocks the current task until the notification is signalled or `timeout` elapses.
    /// The signal is checked once every tick.
    ///
    /// # Returns
    ///
    /// True if a signal was consumed, false on timeout.
    pub fn blocking_wait_timeout(&self, timeout: Duration) -> bool {
        use futures::FutureExt;

        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.notif.wait().now_or_never().is_some() {
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            FreeRtos::delay_ms(1);
        }
    }
}

#[cfg(feature = "esp")]
impl From<&Notification> for Notifier {
    fn from(value: &Notification) -> Self {
        Self {
            notif: value.notif.clone(),
        }
    }
}

#[cfg(feature = "esp")]
impl Notifier {
    /// Signals the notification, waking the task waiting on it.
    pub fn notify(&self) {
        // False only means nobody is waiting yet, the signal is kept for the next wait
        let _ = self.notif.notify_lsb();
    }
}

impl Notification {
    pub fn notifier(&self) -> Notifier {
        Notifier::from(self)
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test0_wait_returns_after_notify() {
        let notification = Notification::new();
        notification.notifier().notify();
        block_on(notification.wait());
        assert!(!notification.blocking_wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test1_blocking_wait_timeout_without_signal() {
        let notification = Notification::new();
        assert!(!notification.blocking_wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test2_notify_from_another_thread() {
        let notification = Notification::new();
        let notifier = notification.notifier();
        let handle = std::thread::spawn(move || notifier.notify());
        notification.blocking_wait();
        handle.join().unwrap();
    }
}
