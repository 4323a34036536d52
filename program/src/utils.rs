use solana_program::pubkey::Pubkey;

use crate::{
    error::LotteryError,
    payout::{select_winner, RandomValue},
    state::LotteryState,
};

pub const CONFIG_SEED: &[u8] = b"config";
pub const LOTTERY_SEED: &[u8] = b"lottery";

/// Find the program derived address of the config account
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the program derived address of the lottery account (also the vault)
pub fn find_lottery_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED], program_id)
}

/// The account an oracle must pass as winner when fulfilling with `random_value`
pub fn winner_for(
    state: &LotteryState,
    random_value: &RandomValue,
) -> Result<Pubkey, LotteryError> {
    select_winner(random_value, state.round.participants())
}
