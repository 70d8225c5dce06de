use std::collections::VecDeque;

use crate::{
    microcontroller_src::board::SharableHardware,
    utils::{
        auxiliary::{SharableRef, SharableRefExt},
        notification::Notifier,
    },
};

/// An operation waiting for the update loop. It is completed exactly once, against the
/// hardware, and then handed its result to the user callback.
pub(crate) trait InterruptDriver<'a> {
    fn update_interrupt(self: Box<Self>, hardware: &SharableHardware<'a>);
}

/// FIFO of pending operations shared between the microcontroller and every driver handle.
/// Pushing an operation signals the notification of the microcontroller.
#[derive(Clone)]
pub(crate) struct PendingOperations<'a> {
    queue: SharableRef<VecDeque<Box<dyn InterruptDriver<'a> + 'a>>>,
    notifier: Notifier,
}

impl<'a> PendingOperations<'a> {
    pub fn new(notifier: Notifier) -> Self {
        PendingOperations {
            queue: SharableRef::new_sharable(VecDeque::new()),
            notifier,
        }
    }

    pub fn push(&mut self, operation: Box<dyn InterruptDriver<'a> + 'a>) {
        self.queue.deref_mut().push_back(operation);
        self.notifier.notify();
    }

    /// Removes every operation queued so far. Operations pushed while the returned ones are
    /// being completed stay for the next update.
    pub fn take_all(&mut self) -> VecDeque<Box<dyn InterruptDriver<'a> + 'a>> {
        std::mem::take(&mut *self.queue.deref_mut())
    }

    pub fn len(&self) -> usize {
        self.queue.deref().len()
    }
}
