// Keeper Lottery
// A repeatable single-pot lottery: entries close on a keeper-driven upkeep,
// an oracle delivers the randomness that picks the winner.

// Core state machine
pub mod coordinator;
pub mod payout;
pub mod round;
pub mod tracker;

// Program plumbing
pub mod error;
pub mod events;
pub mod instruction;
pub mod oracle;
pub mod processor;
pub mod state;
pub mod utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process_instruction(program_id, accounts, instruction_data)
}
