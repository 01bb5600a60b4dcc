//! Mutation records
//!
//! Child-list mutations under the connected document are queued on the
//! tree and drained by the window's flush, the way a MutationObserver on
//! `document.body` with `{ childList: true, subtree: true }` delivers them.

use crate::NodeId;

/// Child-list mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Position in the tree's record stream, assigned when queued
    pub sequence: u64,
    /// Parent whose child list changed
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeId, previous_sibling: Option<NodeId>, next_sibling: Option<NodeId>) -> Self {
        Self {
            sequence: 0,
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
            previous_sibling,
            next_sibling,
        }
    }

    pub fn removed(target: NodeId, node: NodeId, previous_sibling: Option<NodeId>, next_sibling: Option<NodeId>) -> Self {
        Self {
            sequence: 0,
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
            previous_sibling,
            next_sibling,
        }
    }
}

/// Pending records, oldest first
#[derive(Debug, Default)]
pub struct MutationQueue {
    records: Vec<MutationRecord>,
    next_sequence: u64,
}

impl MutationQueue {
    pub fn push_record(&mut self, mut record: MutationRecord) {
        record.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(record);
    }

    /// Sequence the next queued record will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_records_drains() {
        let mut queue = MutationQueue::default();
        queue.push_record(MutationRecord::removed(NodeId(1), NodeId(2), None, None));
        queue.push_record(MutationRecord::added(NodeId(3), NodeId(2), None, None));
        assert_eq!(queue.len(), 2);

        let records = queue.take_records();
        assert_eq!(records[0].removed_nodes, vec![NodeId(2)]);
        assert_eq!(records[1].added_nodes, vec![NodeId(2)]);
        assert!(queue.is_empty());
        assert_eq!(queue.next_sequence(), 2);
    }

    #[test]
    fn test_sequence_survives_drain() {
        let mut queue = MutationQueue::default();
        queue.push_record(MutationRecord::removed(NodeId(1), NodeId(2), None, None));
        queue.take_records();
        queue.push_record(MutationRecord::added(NodeId(1), NodeId(2), None, None));
        assert_eq!(queue.take_records()[0].sequence, 1);
    }
}
