//! Change ledger.
//!
//! Every connector write made during an external call is journaled so a
//! failed call can be undone. Committed writes can additionally be kept as a
//! history for "why does this connector hold this value?" queries.

use crate::connector::ConnectorId;
use crate::constraint::ConstraintId;

/// One committed connector transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord<T> {
    /// Global ordering across the network's lifetime
    pub seq: u64,
    pub connector: ConnectorId,
    pub old: Option<T>,
    pub new: Option<T>,
    /// Constraint that derived the change; `None` for client writes
    pub origin: Option<ConstraintId>,
    /// Cascade depth at which the write happened (0 = client write)
    pub depth: u32,
}

impl<T> ChangeRecord<T> {
    pub fn is_retraction(&self) -> bool {
        self.new.is_none()
    }
}

/// Undo journal plus optional history.
#[derive(Debug)]
pub struct Ledger<T> {
    /// Writes of the open transaction, oldest first
    pending: Vec<ChangeRecord<T>>,
    history: Vec<ChangeRecord<T>>,
    record_history: bool,
    next_seq: u64,
}

impl<T: Copy> Ledger<T> {
    pub fn new(record_history: bool) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            record_history,
            next_seq: 0,
        }
    }

    pub fn enable(&mut self) {
        self.record_history = true;
    }

    /// Stop keeping history; already committed records stay.
    pub fn disable(&mut self) {
        self.record_history = false;
    }

    /// Journal a write of the open transaction.
    pub fn record(
        &mut self,
        connector: ConnectorId,
        old: Option<T>,
        new: Option<T>,
        origin: Option<ConstraintId>,
        depth: u32,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(ChangeRecord { seq, connector, old, new, origin, depth });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Keep the open transaction's writes.
    pub fn commit(&mut self) {
        if self.record_history {
            self.history.append(&mut self.pending);
        } else {
            self.pending.clear();
        }
    }

    /// Discard the open transaction, returning `(connector, value to restore)`
    /// pairs newest first.
    pub fn rollback(&mut self) -> Vec<(ConnectorId, Option<T>)> {
        self.pending
            .drain(..)
            .rev()
            .map(|record| (record.connector, record.old))
            .collect()
    }

    /// Get all committed entries
    pub fn entries(&self) -> &[ChangeRecord<T>] {
        &self.history
    }

    /// Most recent committed change of a connector.
    pub fn last_change(&self, connector: ConnectorId) -> Option<&ChangeRecord<T>> {
        self.history.iter().rev().find(|r| r.connector == connector)
    }

    /// Clear all committed entries
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::SlotId;

    fn connector(index: u32) -> ConnectorId {
        ConnectorId(SlotId { index, generation: 0 })
    }

    #[test]
    fn rollback_restores_newest_first() {
        let mut ledger = Ledger::new(true);
        ledger.record(connector(0), None, Some(1), None, 0);
        ledger.record(connector(1), None, Some(2), None, 1);
        ledger.record(connector(0), Some(1), None, None, 2);

        let undo = ledger.rollback();
        assert_eq!(
            undo,
            vec![(connector(0), Some(1)), (connector(1), None), (connector(0), None)]
        );
        assert!(ledger.entries().is_empty());
        assert_eq!(ledger.pending_len(), 0);
    }

    #[test]
    fn commit_keeps_history_only_when_enabled() {
        let mut ledger = Ledger::new(false);
        ledger.record(connector(0), None, Some(1), None, 0);
        ledger.commit();
        assert!(ledger.entries().is_empty());

        ledger.enable();
        ledger.record(connector(0), Some(1), Some(2), None, 0);
        ledger.record(connector(0), Some(2), None, None, 0);
        ledger.commit();

        assert_eq!(ledger.entries().len(), 2);
        let last = ledger.last_change(connector(0)).unwrap();
        assert!(last.is_retraction());
        assert_eq!(last.seq, 2);
    }
}
