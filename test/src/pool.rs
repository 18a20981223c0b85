use std::collections::VecDeque;

use cinnabar_common::{Transaction, TxPool};

/// An in-memory FIFO transaction pool.
#[derive(Clone, Debug, Default)]
pub struct MemPool {
    transactions: VecDeque<Transaction>,
}

impl MemPool {
    pub fn new(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        Self {
            transactions: transactions.into_iter().collect(),
        }
    }

    pub fn push(&mut self, transaction: Transaction) {
        self.transactions.push_back(transaction);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TxPool for MemPool {
    fn drain(&mut self, max: usize) -> Vec<Transaction> {
        let count = max.min(self.transactions.len());
        self.transactions.drain(..count).collect()
    }
}
