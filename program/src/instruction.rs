use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{error::LotteryError, payout::RandomValue, utils};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Create the config and lottery accounts and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for both accounts
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[writable]` The lottery account (PDA)
    /// 3. `[]` The oracle program randomness requests are sent to
    /// 4. `[]` The oracle authority allowed to fulfill requests
    /// 5. `[]` The system program
    Initialize {
        /// Minimum deposit per entry in lamports
        entrance_fee: u64,
        /// Seconds between a reset and the next draw
        interval: u64,
        key_hash: [u8; 32],
        subscription_id: u64,
        callback_gas_limit: u32,
        request_confirmations: u16,
        num_words: u32,
    },

    /// Take one slot in the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the deposit
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[]` The system program
    Enter {
        /// Deposit in lamports, at least the entrance fee
        amount: u64,
    },

    /// Report whether the round is ready to close. Sets return data to the
    /// borsh encoded `UpkeepStatus`.
    ///
    /// Accounts expected:
    /// 0. `[]` The config account
    /// 1. `[]` The lottery account
    CheckUpkeep,

    /// Close entry and request randomness
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any keeper
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[]` The oracle program
    /// Remaining accounts are forwarded to the oracle program
    PerformUpkeep,

    /// Deliver randomness, pay the winner and open the next round
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle authority
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[writable]` The winner
    FulfillRandomness {
        request_id: u64,
        random_value: RandomValue,
    },
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| LotteryError::InvalidInstruction.into())
    }

    /// Packs a LotteryInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| LotteryError::InvalidInstruction.into())
    }
}

/// Oracle routing supplied at deployment
#[derive(Clone, Debug, PartialEq)]
pub struct OracleParams {
    pub oracle_program: Pubkey,
    pub oracle_authority: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
    pub num_words: u32,
}

/// Create initialize instruction
pub fn initialize(
    program_id: &Pubkey,
    admin: &Pubkey,
    entrance_fee: u64,
    interval: u64,
    oracle: &OracleParams,
) -> Result<Instruction, ProgramError> {
    let (config, _) = utils::find_config_address(program_id);
    let (lottery, _) = utils::find_lottery_address(program_id);
    let data = LotteryInstruction::Initialize {
        entrance_fee,
        interval,
        key_hash: oracle.key_hash,
        subscription_id: oracle.subscription_id,
        callback_gas_limit: oracle.callback_gas_limit,
        request_confirmations: oracle.request_confirmations,
        num_words: oracle.num_words,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(oracle.oracle_program, false),
            AccountMeta::new_readonly(oracle.oracle_authority, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

/// Create enter instruction
pub fn enter(
    program_id: &Pubkey,
    player: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (config, _) = utils::find_config_address(program_id);
    let (lottery, _) = utils::find_lottery_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::Enter { amount }.pack()?,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Result<Instruction, ProgramError> {
    let (config, _) = utils::find_config_address(program_id);
    let (lottery, _) = utils::find_lottery_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(config, false),
            AccountMeta::new_readonly(lottery, false),
        ],
        data: LotteryInstruction::CheckUpkeep.pack()?,
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    keeper: &Pubkey,
    oracle_program: &Pubkey,
    remaining_accounts: &[AccountMeta],
) -> Result<Instruction, ProgramError> {
    let (config, _) = utils::find_config_address(program_id);
    let (lottery, _) = utils::find_lottery_address(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*keeper, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(lottery, false),
        AccountMeta::new_readonly(*oracle_program, false),
    ];
    accounts.extend_from_slice(remaining_accounts);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::PerformUpkeep.pack()?,
    })
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle_authority: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_value: RandomValue,
) -> Result<Instruction, ProgramError> {
    let (config, _) = utils::find_config_address(program_id);
    let (lottery, _) = utils::find_lottery_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*oracle_authority, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new(*winner, false),
        ],
        data: LotteryInstruction::FulfillRandomness {
            request_id,
            random_value,
        }
        .pack()?,
    })
}
