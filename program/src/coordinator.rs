//! Public upkeep surface polled by keepers and called back by the oracle.
//!
//! Each entry point is all-or-nothing: on error the lottery state is left as
//! it was, except that a consumed randomness request is never resurrected.
use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    error::LotteryError,
    events::LotteryEvent,
    oracle::{is_designated_oracle, RandomnessOracle, RandomnessRequest},
    payout::{payout, select_winner, RandomValue, ValueTransfer},
    round::{LotteryPhase, UpkeepStatus},
    state::{Config, LotteryState},
};

impl LotteryState {
    /// Side-effect free readiness check. Callable any number of times.
    pub fn check_upkeep(&self, config: &Config, now: UnixTimestamp) -> (bool, UpkeepStatus) {
        self.round.is_upkeep_ready(config, now)
    }

    pub fn enter(
        &mut self,
        config: &Config,
        player: Pubkey,
        deposit: u64,
    ) -> Result<LotteryEvent, LotteryError> {
        self.round.enter(config, player, deposit)
    }

    /// Closes entry and asks the oracle for randomness. If the oracle refuses,
    /// the round goes back to OPEN.
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        config: &Config,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<LotteryEvent, LotteryError> {
        let request_id = self
            .round
            .begin_calculating(config, now, &mut self.requests)?;

        let request = RandomnessRequest::new(request_id, config);
        if let Err(e) = oracle.request_randomness(&request) {
            self.round.abort_calculating(&mut self.requests);
            return Err(match e {
                LotteryError::CapacityExceeded => e,
                _ => LotteryError::OracleRequestFailed,
            });
        }

        Ok(LotteryEvent::CalculationStarted { request_id })
    }

    /// Oracle callback. Consumes the request, picks the winner, pays the
    /// whole balance and opens the next round.
    ///
    /// A failed payout keeps the round CALCULATING with its roster and balance
    /// intact, but the request stays consumed.
    pub fn fulfill_randomness<T: ValueTransfer>(
        &mut self,
        config: &Config,
        caller: &Pubkey,
        request_id: u64,
        random_value: &RandomValue,
        now: UnixTimestamp,
        transfer: &mut T,
    ) -> Result<LotteryEvent, LotteryError> {
        if !is_designated_oracle(config, caller) {
            msg!("Fulfillment from {} rejected", caller);
            return Err(LotteryError::Unauthorized);
        }

        let round_token = self.requests.consume(request_id)?;
        if round_token != self.round.round_number()
            || self.round.phase() != LotteryPhase::Calculating
            || self.round.outstanding_request_id() != Some(request_id)
        {
            msg!(
                "Request {} belongs to round {}, live round is {}",
                request_id,
                round_token,
                self.round.round_number()
            );
            return Err(LotteryError::UnknownRequest);
        }

        let winner = select_winner(random_value, self.round.participants())?;
        let amount = self.round.collected_balance();
        payout(transfer, &winner, amount)?;

        self.round.reset(winner, now)
    }
}
