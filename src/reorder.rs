//! Restores frame-index order across parallel workers.
//!
//! Workers push `(index, item)` in completion order; the iterator buffers
//! out-of-order items and yields them strictly by index. After all senders
//! disconnect, whatever is buffered drains in ascending order.

use crate::error::PixResult;
use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeMap;

pub(crate) struct Reorder<T> {
    sender: Sender<(usize, T)>,
}

impl<T> Clone for Reorder<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

pub(crate) struct ReorderIter<T> {
    receiver: Receiver<(usize, T)>,
    next_index: usize,
    pending: BTreeMap<usize, T>,
}

pub(crate) fn new<T>(depth: usize) -> (Reorder<T>, ReorderIter<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(depth);
    (Reorder { sender }, ReorderIter { receiver, next_index: 0, pending: BTreeMap::new() })
}

impl<T: Send + 'static> Reorder<T> {
    #[inline]
    pub fn push(&self, index: usize, item: T) -> PixResult<()> {
        self.sender.send((index, item))?;
        Ok(())
    }
}

impl<T> Iterator for ReorderIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while self.pending.keys().next() != Some(&self.next_index) {
            match self.receiver.recv() {
                Ok((index, item)) => {
                    self.pending.insert(index, item);
                },
                // All senders gone; dump the buffer
                Err(_) => break,
            }
        }
        let (index, item) = self.pending.pop_first()?;
        self.next_index = index + 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_in_index_order() {
        let (q, iter) = new(8);
        for i in [3, 0, 2, 1] {
            q.push(i, i * 10).unwrap();
        }
        drop(q);
        assert_eq!(iter.collect::<Vec<_>>(), [0, 10, 20, 30]);
    }

    #[test]
    fn drains_buffer_after_disconnect() {
        let (q, iter) = new(8);
        q.push(1, "b").unwrap();
        q.push(0, "a").unwrap();
        q.push(5, "gap").unwrap();
        drop(q);
        assert_eq!(iter.collect::<Vec<_>>(), ["a", "b", "gap"]);
    }
}
