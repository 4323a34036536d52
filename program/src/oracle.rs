// Randomness oracle integration: the request sent to the VRF coordinator
// program and the seam the upkeep coordinator drives it through.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke_signed,
    pubkey::Pubkey,
};

use crate::{error::LotteryError, state::Config};

/// Payload handed to the oracle program. The lottery only fills in
/// `request_id`; everything else is routing copied from the config.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub request_id: u64,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl RandomnessRequest {
    pub fn new(request_id: u64, config: &Config) -> Self {
        Self {
            request_id,
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
        }
    }
}

pub trait RandomnessOracle {
    /// Forwards a request. Fulfillment arrives later as a separate call.
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<(), LotteryError>;
}

/// Delivers requests to the configured oracle program by CPI, with the
/// lottery PDA signing as the requester.
pub struct CpiOracle<'a, 'info> {
    pub oracle_program: &'a AccountInfo<'info>,
    pub requester: &'a AccountInfo<'info>,
    pub requester_seeds: &'a [&'a [u8]],
    /// Extra accounts the oracle program needs, passed through untouched
    pub remaining_accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> RandomnessOracle for CpiOracle<'a, 'info> {
    /// Refusals detected here come back as `OracleRequestFailed`. An error
    /// raised inside the oracle program aborts the whole transaction under
    /// the BPF runtime and surfaces with the oracle's own code instead.
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<(), LotteryError> {
        if !self.oracle_program.executable {
            msg!("Oracle program {} is not executable", self.oracle_program.key);
            return Err(LotteryError::OracleRequestFailed);
        }

        let data = request
            .try_to_vec()
            .map_err(|_| LotteryError::OracleRequestFailed)?;

        let mut accounts = vec![AccountMeta::new_readonly(*self.requester.key, true)];
        accounts.extend(self.remaining_accounts.iter().map(|acc| AccountMeta {
            pubkey: *acc.key,
            is_signer: acc.is_signer,
            is_writable: acc.is_writable,
        }));

        let mut account_infos = vec![self.requester.clone(), self.oracle_program.clone()];
        account_infos.extend_from_slice(self.remaining_accounts);

        invoke_signed(
            &Instruction {
                program_id: *self.oracle_program.key,
                accounts,
                data,
            },
            &account_infos,
            &[self.requester_seeds],
        )
        .map_err(|e| {
            msg!("Oracle request {} failed: {}", request.request_id, e);
            LotteryError::OracleRequestFailed
        })?;

        msg!("Randomness request {} submitted", request.request_id);
        Ok(())
    }
}

/// Client-side helper for oracle programs: decodes the request payload.
pub fn unpack_request(data: &[u8]) -> Result<RandomnessRequest, LotteryError> {
    RandomnessRequest::try_from_slice(data).map_err(|_| LotteryError::InvalidInstruction)
}

/// Identity the oracle must sign fulfillments with.
pub fn is_designated_oracle(config: &Config, caller: &Pubkey) -> bool {
    config.oracle_authority == *caller
}
