use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications emitted by the lottery, logged as borsh-encoded program data
/// so off-chain keepers and indexers can decode them.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    /// A player took a slot in the current round
    Entered {
        player: Pubkey,
        participant_count: u64,
    },
    /// Entry closed and randomness was requested
    CalculationStarted { request_id: u64 },
    /// The pot was paid out and a new round opened
    WinnerSelected { winner: Pubkey, payout_amount: u64 },
}

impl LotteryEvent {
    pub fn emit(&self) {
        msg!("Event: {:?}", self);
        match self.try_to_vec() {
            Ok(data) => sol_log_data(&[&data]),
            Err(e) => msg!("Event payload could not be encoded: {}", e),
        }
    }
}
