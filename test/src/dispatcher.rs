use std::cell::RefCell;
use std::rc::Rc;

use cinnabar_common::{Dispatcher, Hash, Message};

/// Records every dispatched message, in dispatch order, for assertions.
/// Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct RecordingDispatcher {
    messages: Rc<RefCell<Vec<(Hash, Message)>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything dispatched so far.
    pub fn take(&self) -> Vec<(Hash, Message)> {
        self.messages.borrow_mut().drain(..).collect()
    }

    pub fn messages(&self) -> Vec<(Hash, Message)> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, shard_hash: Hash, message: Message) {
        self.messages.borrow_mut().push((shard_hash, message));
    }
}
