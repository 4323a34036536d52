//! The round state machine: OPEN while collecting entries, CALCULATING while
//! the winner's randomness is in flight.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{error::LotteryError, events::LotteryEvent, state::Config, tracker::RequestTracker};

/// Participant slots per round. Bounded so the lottery account fits a single
/// CPI-created allocation.
pub const MAX_PARTICIPANTS: usize = 256;

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryPhase {
    /// Accepting entries
    Open,
    /// Entry closed, waiting on the oracle
    Calculating,
}

/// Readiness snapshot returned by the upkeep check. Each flag is one of the
/// conditions that must all hold before entry can close.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn is_ready(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }

    /// Human readable list of the conditions that do not hold.
    pub fn failing_conditions(&self) -> Vec<&'static str> {
        let mut failing = Vec::new();
        if !self.is_open {
            failing.push("lottery is not open");
        }
        if !self.time_passed {
            failing.push("interval has not elapsed");
        }
        if !self.has_players {
            failing.push("no participants");
        }
        if !self.has_balance {
            failing.push("no balance");
        }
        failing
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Round {
    /// Token identifying this round to the request tracker
    round_number: u64,
    phase: LotteryPhase,
    /// Insertion ordered, one slot per entry
    participants: Vec<Pubkey>,
    collected_balance: u64,
    last_reset_timestamp: UnixTimestamp,
    /// Present exactly while calculating
    outstanding_request_id: Option<u64>,
    /// Survives resets
    latest_winner: Option<Pubkey>,
}

impl Round {
    /// Serialized size with a full roster.
    pub const LEN: usize = 8 + 1 + (4 + 32 * MAX_PARTICIPANTS) + 8 + 8 + (1 + 8) + (1 + 32);

    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            round_number: 0,
            phase: LotteryPhase::Open,
            participants: Vec::new(),
            collected_balance: 0,
            last_reset_timestamp: now,
            outstanding_request_id: None,
            latest_winner: None,
        }
    }

    pub fn enter(
        &mut self,
        config: &Config,
        player: Pubkey,
        deposit: u64,
    ) -> Result<LotteryEvent, LotteryError> {
        if self.phase != LotteryPhase::Open {
            return Err(LotteryError::RoundClosed);
        }
        if deposit < config.entrance_fee {
            msg!("Deposit {} below entrance fee {}", deposit, config.entrance_fee);
            return Err(LotteryError::InsufficientDeposit);
        }
        if self.participants.len() >= MAX_PARTICIPANTS {
            return Err(LotteryError::RosterFull);
        }
        let collected_balance = self
            .collected_balance
            .checked_add(deposit)
            .ok_or(LotteryError::ArithmeticOverflow)?;

        self.participants.push(player);
        self.collected_balance = collected_balance;

        Ok(LotteryEvent::Entered {
            player,
            participant_count: self.participants.len() as u64,
        })
    }

    /// Never fails and never mutates.
    pub fn upkeep_status(&self, config: &Config, now: UnixTimestamp) -> UpkeepStatus {
        let elapsed = now.saturating_sub(self.last_reset_timestamp);
        UpkeepStatus {
            is_open: self.phase == LotteryPhase::Open,
            time_passed: elapsed >= 0 && elapsed as u64 >= config.interval,
            has_players: !self.participants.is_empty(),
            has_balance: self.collected_balance > 0,
        }
    }

    pub fn is_upkeep_ready(&self, config: &Config, now: UnixTimestamp) -> (bool, UpkeepStatus) {
        let status = self.upkeep_status(config, now);
        (status.is_ready(), status)
    }

    /// Closes entry and registers a randomness request for this round.
    /// The only OPEN -> CALCULATING transition.
    pub fn begin_calculating(
        &mut self,
        config: &Config,
        now: UnixTimestamp,
        requests: &mut RequestTracker,
    ) -> Result<u64, LotteryError> {
        let (ready, status) = self.is_upkeep_ready(config, now);
        if !ready {
            msg!("Upkeep not ready: {}", status.failing_conditions().join(", "));
            return Err(LotteryError::UpkeepNotReady);
        }

        let request_id = requests.issue(self.round_number)?;
        self.phase = LotteryPhase::Calculating;
        self.outstanding_request_id = Some(request_id);

        Ok(request_id)
    }

    /// Undoes `begin_calculating` when the request never reached the oracle.
    pub(crate) fn abort_calculating(&mut self, requests: &mut RequestTracker) {
        if let Some(request_id) = self.outstanding_request_id.take() {
            requests.cancel(request_id);
        }
        self.phase = LotteryPhase::Open;
    }

    /// Ends the round after a successful payout and opens the next one.
    pub fn reset(
        &mut self,
        winner: Pubkey,
        now: UnixTimestamp,
    ) -> Result<LotteryEvent, LotteryError> {
        if self.phase != LotteryPhase::Calculating {
            return Err(LotteryError::UnknownRequest);
        }

        let payout_amount = self.collected_balance;
        self.participants.clear();
        self.collected_balance = 0;
        self.outstanding_request_id = None;
        self.last_reset_timestamp = now;
        self.phase = LotteryPhase::Open;
        self.latest_winner = Some(winner);
        self.round_number = self.round_number.wrapping_add(1);

        Ok(LotteryEvent::WinnerSelected {
            winner,
            payout_amount,
        })
    }

    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    pub fn phase(&self) -> LotteryPhase {
        self.phase
    }

    pub fn participants(&self) -> &[Pubkey] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant(&self, index: usize) -> Option<&Pubkey> {
        self.participants.get(index)
    }

    pub fn collected_balance(&self) -> u64 {
        self.collected_balance
    }

    pub fn last_reset_timestamp(&self) -> UnixTimestamp {
        self.last_reset_timestamp
    }

    pub fn outstanding_request_id(&self) -> Option<u64> {
        self.outstanding_request_id
    }

    pub fn latest_winner(&self) -> Option<Pubkey> {
        self.latest_winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEE: u64 = 100;
    const INTERVAL: u64 = 30;
    const START: UnixTimestamp = 1_000;

    fn config() -> Config {
        Config {
            entrance_fee: FEE,
            interval: INTERVAL,
            ..Config::default()
        }
    }

    fn ready_round() -> Round {
        let mut round = Round::new(START);
        round.enter(&config(), Pubkey::new_unique(), FEE).unwrap();
        round
    }

    #[test]
    fn new_round_is_open_and_empty() {
        let round = Round::new(START);
        assert_eq!(round.phase(), LotteryPhase::Open);
        assert_eq!(round.participant_count(), 0);
        assert_eq!(round.collected_balance(), 0);
        assert_eq!(round.last_reset_timestamp(), START);
        assert_eq!(round.outstanding_request_id(), None);
        assert_eq!(round.latest_winner(), None);
    }

    #[test]
    fn enter_appends_slot_and_adds_deposit() {
        let mut round = Round::new(START);
        let player = Pubkey::new_unique();

        let event = round.enter(&config(), player, FEE + 100).unwrap();

        assert_eq!(
            event,
            LotteryEvent::Entered { player, participant_count: 1 }
        );
        assert_eq!(round.participant(0), Some(&player));
        assert_eq!(round.collected_balance(), 200);
    }

    #[test]
    fn enter_below_fee_leaves_state_unchanged() {
        let mut round = Round::new(START);
        let before = round.clone();

        let err = round.enter(&config(), Pubkey::new_unique(), FEE - 1).unwrap_err();

        assert_eq!(err, LotteryError::InsufficientDeposit);
        assert_eq!(round, before);
    }

    #[test]
    fn same_player_can_hold_multiple_slots() {
        let mut round = Round::new(START);
        let player = Pubkey::new_unique();
        round.enter(&config(), player, FEE).unwrap();
        round.enter(&config(), player, FEE).unwrap();

        assert_eq!(round.participants(), &[player, player]);
        assert_eq!(round.collected_balance(), 2 * FEE);
    }

    #[test]
    fn enter_fails_when_roster_full() {
        let mut round = Round::new(START);
        for _ in 0..MAX_PARTICIPANTS {
            round.enter(&config(), Pubkey::new_unique(), FEE).unwrap();
        }
        let err = round.enter(&config(), Pubkey::new_unique(), FEE).unwrap_err();
        assert_eq!(err, LotteryError::RosterFull);
    }

    #[test]
    fn enter_while_calculating_is_rejected_for_any_deposit() {
        let mut round = ready_round();
        let mut requests = RequestTracker::default();
        round
            .begin_calculating(&config(), START + INTERVAL as i64, &mut requests)
            .unwrap();

        for deposit in [0, FEE, FEE * 1_000] {
            let err = round.enter(&config(), Pubkey::new_unique(), deposit).unwrap_err();
            assert_eq!(err, LotteryError::RoundClosed);
        }
        assert_eq!(round.participant_count(), 1);
    }

    #[test]
    fn upkeep_ready_only_when_all_conditions_hold() {
        let now = START + INTERVAL as i64;
        let round = ready_round();
        assert!(round.is_upkeep_ready(&config(), now).0);

        // time not elapsed
        let (ready, status) = round.is_upkeep_ready(&config(), now - 1);
        assert!(!ready);
        assert!(!status.time_passed);

        // nobody entered
        let (ready, status) = Round::new(START).is_upkeep_ready(&config(), now);
        assert!(!ready);
        assert!(!status.has_players);
        assert!(!status.has_balance);

        // not open
        let mut calculating = ready_round();
        calculating
            .begin_calculating(&config(), now, &mut RequestTracker::default())
            .unwrap();
        let (ready, status) = calculating.is_upkeep_ready(&config(), now);
        assert!(!ready);
        assert!(!status.is_open);
    }

    #[test]
    fn zero_deposit_entry_does_not_satisfy_balance_condition() {
        let free = Config { entrance_fee: 0, interval: INTERVAL, ..Config::default() };
        let mut round = Round::new(START);
        round.enter(&free, Pubkey::new_unique(), 0).unwrap();

        let (ready, status) = round.is_upkeep_ready(&free, START + INTERVAL as i64);
        assert!(!ready);
        assert!(status.has_players);
        assert!(!status.has_balance);
        assert_eq!(status.failing_conditions(), vec!["no balance"]);
    }

    #[test]
    fn clock_behind_last_reset_is_not_ready() {
        let round = ready_round();
        let status = round.upkeep_status(&config(), START - 10);
        assert!(!status.time_passed);
    }

    #[test]
    fn begin_calculating_records_request() {
        let mut round = ready_round();
        let mut requests = RequestTracker::default();

        let request_id = round
            .begin_calculating(&config(), START + INTERVAL as i64, &mut requests)
            .unwrap();

        assert_eq!(round.phase(), LotteryPhase::Calculating);
        assert_eq!(round.outstanding_request_id(), Some(request_id));
        assert!(requests.is_pending(request_id));
    }

    #[test]
    fn begin_calculating_when_not_ready_changes_nothing() {
        let mut round = ready_round();
        let mut requests = RequestTracker::default();
        let before = round.clone();

        let err = round
            .begin_calculating(&config(), START, &mut requests)
            .unwrap_err();

        assert_eq!(err, LotteryError::UpkeepNotReady);
        assert_eq!(round, before);
        assert_eq!(requests.pending_count(), 0);
    }

    #[test]
    fn abort_restores_open_phase() {
        let mut round = ready_round();
        let mut requests = RequestTracker::default();
        round
            .begin_calculating(&config(), START + INTERVAL as i64, &mut requests)
            .unwrap();

        round.abort_calculating(&mut requests);

        assert_eq!(round.phase(), LotteryPhase::Open);
        assert_eq!(round.outstanding_request_id(), None);
        assert_eq!(requests.pending_count(), 0);
        assert_eq!(round.participant_count(), 1);
    }

    #[test]
    fn reset_clears_round_and_reopens() {
        let mut round = ready_round();
        let mut requests = RequestTracker::default();
        let now = START + INTERVAL as i64;
        round.begin_calculating(&config(), now, &mut requests).unwrap();
        let winner = round.participants()[0];

        let event = round.reset(winner, now + 5).unwrap();

        assert_eq!(event, LotteryEvent::WinnerSelected { winner, payout_amount: FEE });
        assert_eq!(round.phase(), LotteryPhase::Open);
        assert_eq!(round.participant_count(), 0);
        assert_eq!(round.collected_balance(), 0);
        assert_eq!(round.outstanding_request_id(), None);
        assert_eq!(round.last_reset_timestamp(), now + 5);
        assert_eq!(round.latest_winner(), Some(winner));
        assert_eq!(round.round_number(), 1);
    }

    #[test]
    fn reset_requires_calculating() {
        let mut round = ready_round();
        let err = round.reset(Pubkey::new_unique(), START).unwrap_err();
        assert_eq!(err, LotteryError::UnknownRequest);
        assert_eq!(round.participant_count(), 1);
    }

    #[test]
    fn full_round_fits_reserved_space() {
        let mut round = Round::new(START);
        for _ in 0..MAX_PARTICIPANTS {
            round.enter(&config(), Pubkey::new_unique(), FEE).unwrap();
        }
        round
            .begin_calculating(&config(), START + INTERVAL as i64, &mut RequestTracker::default())
            .unwrap();
        round.latest_winner = Some(Pubkey::new_unique());
        assert_eq!(round.try_to_vec().unwrap().len(), Round::LEN);
    }
}
