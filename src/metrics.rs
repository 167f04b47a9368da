//! Process-wide navigation counters.
//! Cheap relaxed atomics; read them with [`snapshot`].
use std::sync::atomic::{AtomicU64, Ordering};

static SELECTIONS: AtomicU64 = AtomicU64::new(0);
static DEAD_ENDS: AtomicU64 = AtomicU64::new(0);
static EDITS: AtomicU64 = AtomicU64::new(0);
static EDIT_FAILURES: AtomicU64 = AtomicU64::new(0);
static ACK_FAILURES: AtomicU64 = AtomicU64::new(0);
static STARTS: AtomicU64 = AtomicU64::new(0);
static STOPS: AtomicU64 = AtomicU64::new(0);
static CHAIN_STEPS: AtomicU64 = AtomicU64::new(0);
static LIST_REPLIES: AtomicU64 = AtomicU64::new(0);

/// Acknowledged selection (action or dead end).
pub fn inc_selection() {
    SELECTIONS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_dead_end() {
    DEAD_ENDS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_edit() {
    EDITS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_edit_failed() {
    EDIT_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_ack_failed() {
    ACK_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_start() {
    STARTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_stop() {
    STOPS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_chain_step() {
    CHAIN_STEPS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_list_reply() {
    LIST_REPLIES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Snapshot {
    pub selections: u64,
    pub dead_ends: u64,
    pub edits: u64,
    pub edit_failures: u64,
    pub ack_failures: u64,
    pub starts: u64,
    pub stops: u64,
    pub chain_steps: u64,
    pub list_replies: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        selections: SELECTIONS.load(Ordering::Relaxed),
        dead_ends: DEAD_ENDS.load(Ordering::Relaxed),
        edits: EDITS.load(Ordering::Relaxed),
        edit_failures: EDIT_FAILURES.load(Ordering::Relaxed),
        ack_failures: ACK_FAILURES.load(Ordering::Relaxed),
        starts: STARTS.load(Ordering::Relaxed),
        stops: STOPS.load(Ordering::Relaxed),
        chain_steps: CHAIN_STEPS.load(Ordering::Relaxed),
        list_replies: LIST_REPLIES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are global and other tests run in parallel, so only assert growth.
    #[test]
    fn counters_only_grow() {
        let before = snapshot();
        inc_edit();
        inc_edit_failed();
        inc_start();
        let after = snapshot();
        assert!(after.edits > before.edits);
        assert!(after.edit_failures > before.edit_failures);
        assert!(after.starts > before.starts);
    }
}
