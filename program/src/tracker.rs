//! Bookkeeping for randomness requests that are waiting on the oracle.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::msg;
use std::collections::BTreeMap;

use crate::error::LotteryError;

/// Upper bound on simultaneously pending requests. The phase rules keep at
/// most one outstanding, the slack only covers account sizing.
pub const MAX_PENDING_REQUESTS: usize = 4;

/// Maps outstanding request ids to the round token they were issued for.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestTracker {
    /// Next id to hand out. Ids start at 1 and are never reused.
    next_request_id: u64,
    pending: BTreeMap<u64, u64>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self {
            next_request_id: 1,
            pending: BTreeMap::new(),
        }
    }
}

impl RequestTracker {
    /// Serialized size with every pending slot occupied.
    pub const LEN: usize = 8 + 4 + MAX_PENDING_REQUESTS * (8 + 8);

    /// Mints a fresh request id bound to `round_token`.
    pub fn issue(&mut self, round_token: u64) -> Result<u64, LotteryError> {
        if self.pending.len() >= MAX_PENDING_REQUESTS {
            msg!("Request tracker full: {} pending", self.pending.len());
            return Err(LotteryError::CapacityExceeded);
        }

        let request_id = self.next_request_id;
        self.next_request_id = self
            .next_request_id
            .checked_add(1)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        self.pending.insert(request_id, round_token);

        Ok(request_id)
    }

    /// Removes `request_id` and returns the round token it was issued for.
    /// A replayed or unknown id is always rejected.
    pub fn consume(&mut self, request_id: u64) -> Result<u64, LotteryError> {
        self.pending
            .remove(&request_id)
            .ok_or(LotteryError::UnknownRequest)
    }

    /// Drops a request whose delivery to the oracle failed. The id stays burned.
    pub(crate) fn cancel(&mut self, request_id: u64) {
        self.pending.remove(&request_id);
    }

    pub fn is_pending(&self, request_id: u64) -> bool {
        self.pending.contains_key(&request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_request_id(&self) -> u64 {
        self.next_request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_ids_are_unique_and_monotonic() {
        let mut tracker = RequestTracker::default();
        let first = tracker.issue(0).unwrap();
        tracker.consume(first).unwrap();
        let second = tracker.issue(1).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(tracker.is_pending(second));
        assert!(!tracker.is_pending(first));
    }

    #[test]
    fn consume_returns_round_token_once() {
        let mut tracker = RequestTracker::default();
        let id = tracker.issue(7).unwrap();

        assert_eq!(tracker.consume(id), Ok(7));
        assert_eq!(tracker.consume(id), Err(LotteryError::UnknownRequest));
    }

    #[test]
    fn consume_unknown_id_fails() {
        let mut tracker = RequestTracker::default();
        assert_eq!(tracker.consume(999), Err(LotteryError::UnknownRequest));
    }

    #[test]
    fn cancelled_id_is_not_reissued() {
        let mut tracker = RequestTracker::default();
        let id = tracker.issue(0).unwrap();
        tracker.cancel(id);

        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.consume(id), Err(LotteryError::UnknownRequest));
        assert_ne!(tracker.issue(0).unwrap(), id);
    }

    #[test]
    fn issue_fails_when_full() {
        let mut tracker = RequestTracker::default();
        for round in 0..MAX_PENDING_REQUESTS as u64 {
            tracker.issue(round).unwrap();
        }

        assert_eq!(tracker.issue(99), Err(LotteryError::CapacityExceeded));
        assert_eq!(tracker.pending_count(), MAX_PENDING_REQUESTS);
    }

    #[test]
    fn full_tracker_fits_reserved_space() {
        let mut tracker = RequestTracker::default();
        for round in 0..MAX_PENDING_REQUESTS as u64 {
            tracker.issue(round).unwrap();
        }
        assert!(tracker.try_to_vec().unwrap().len() <= RequestTracker::LEN);
    }
}
