//! Run-scoped reservation ledger.
//!
//! Records the slots already handed out during one planner run so that no
//! two relocated meetings land on the same start, and no relocated meeting
//! overlaps another one placed earlier in the run. Entries are only ever
//! added; the ledger is dropped when the run ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::time::Slot;

/// Slots claimed during the current run, keyed by start instant.
#[derive(Debug, Default, Clone)]
pub struct ReservationLedger {
    reserved: BTreeMap<DateTime<Utc>, Slot>,
}

impl ReservationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a claimed slot starts at `start`.
    pub fn is_reserved(&self, start: DateTime<Utc>) -> bool {
        self.reserved.contains_key(&start)
    }

    /// Returns true if `slot` shares a start with, or overlaps, a claimed slot.
    pub fn conflicts(&self, slot: &Slot) -> bool {
        self.is_reserved(slot.start)
            || self
                .reserved
                .range(..slot.end)
                .any(|(_, claimed)| claimed.end > slot.start)
    }

    /// Claims `slot` if it does not conflict.
    ///
    /// Check and insert happen in one step: returns `true` when the caller now
    /// owns the slot, `false` when someone else got there first.
    #[must_use]
    pub fn try_reserve(&mut self, slot: Slot) -> bool {
        if self.conflicts(&slot) {
            return false;
        }
        self.reserved.insert(slot.start, slot);
        true
    }

    /// Number of claimed slots.
    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    /// Returns true if nothing has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }

    /// Iterates claimed slots in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.reserved.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, h, m, 0).unwrap()
    }

    fn half_hour(h: u32, m: u32) -> Slot {
        Slot::starting_at(at(h, m), Duration::minutes(30))
    }

    #[test]
    fn starts_empty() {
        let ledger = ReservationLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.is_reserved(at(9, 0)));
        assert!(!ledger.conflicts(&half_hour(9, 0)));
    }

    #[test]
    fn second_claim_on_same_start_fails() {
        let mut ledger = ReservationLedger::new();
        assert!(ledger.try_reserve(half_hour(9, 0)));
        assert!(!ledger.try_reserve(Slot::starting_at(at(9, 0), Duration::minutes(15))));
        assert!(ledger.is_reserved(at(9, 0)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn overlapping_claim_fails_and_touching_claim_succeeds() {
        let mut ledger = ReservationLedger::new();
        assert!(ledger.try_reserve(half_hour(9, 0)));
        assert!(!ledger.try_reserve(half_hour(9, 15)));
        assert!(!ledger.try_reserve(half_hour(8, 45)));
        assert!(ledger.try_reserve(half_hour(9, 30)));
        assert!(ledger.try_reserve(half_hour(8, 30)));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn iterates_in_chronological_order() {
        let mut ledger = ReservationLedger::new();
        assert!(ledger.try_reserve(half_hour(14, 0)));
        assert!(ledger.try_reserve(half_hour(9, 15)));
        assert!(ledger.try_reserve(half_hour(11, 30)));
        let starts: Vec<_> = ledger.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(9, 15), at(11, 30), at(14, 0)]);
    }
}
