use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    round::{LotteryPhase, Round},
    tracker::RequestTracker,
};

/// Confirmations the oracle waits before answering
pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;
/// Random words per request
pub const DEFAULT_NUM_WORDS: u32 = 1;

/// Deployment configuration, written once by `Initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Account that deployed the lottery
    pub admin: Pubkey,
    /// Minimum deposit per entry in lamports
    pub entrance_fee: u64,
    /// Seconds that must pass after a reset before entry can close
    pub interval: u64,
    /// Program randomness requests are sent to
    pub oracle_program: Pubkey,
    /// Only signer allowed to deliver randomness
    pub oracle_authority: Pubkey,
    /// Gas lane selecting the oracle's proving key
    pub key_hash: [u8; 32],
    /// Subscription billed for requests
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
    pub num_words: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            is_initialized: false,
            admin: Pubkey::default(),
            entrance_fee: 0,
            interval: 0,
            oracle_program: Pubkey::default(),
            oracle_authority: Pubkey::default(),
            key_hash: [0; 32],
            subscription_id: 0,
            callback_gas_limit: 0,
            request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
            num_words: DEFAULT_NUM_WORDS,
        }
    }
}

impl Config {
    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn request_confirmations(&self) -> u16 {
        self.request_confirmations
    }

    pub fn num_words(&self) -> u32 {
        self.num_words
    }
}

impl Sealed for Config {}

impl IsInitialized for Config {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Config {
    const LEN: usize = 1 + 32 + 8 + 8 + 32 + 32 + 32 + 8 + 4 + 2 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Config::LEN];
        let (
            is_initialized,
            admin,
            entrance_fee,
            interval,
            oracle_program,
            oracle_authority,
            key_hash,
            subscription_id,
            callback_gas_limit,
            request_confirmations,
            num_words,
        ) = array_refs![src, 1, 32, 8, 8, 32, 32, 32, 8, 4, 2, 4];

        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(Config {
            is_initialized,
            admin: Pubkey::new_from_array(*admin),
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            oracle_program: Pubkey::new_from_array(*oracle_program),
            oracle_authority: Pubkey::new_from_array(*oracle_authority),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            num_words: u32::from_le_bytes(*num_words),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Config::LEN];
        let (
            is_initialized_dst,
            admin_dst,
            entrance_fee_dst,
            interval_dst,
            oracle_program_dst,
            oracle_authority_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
            request_confirmations_dst,
            num_words_dst,
        ) = mut_array_refs![dst, 1, 32, 8, 8, 32, 32, 32, 8, 4, 2, 4];

        is_initialized_dst[0] = self.is_initialized as u8;
        admin_dst.copy_from_slice(self.admin.as_ref());
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        oracle_program_dst.copy_from_slice(self.oracle_program.as_ref());
        oracle_authority_dst.copy_from_slice(self.oracle_authority.as_ref());
        key_hash_dst.copy_from_slice(&self.key_hash);
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
    }
}

/// Live lottery account: the current round plus its pending randomness
/// requests. The account's lamports above rent hold the collected balance.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LotteryState {
    /// Is the account initialized
    pub is_initialized: bool,
    pub round: Round,
    pub requests: RequestTracker,
}

impl LotteryState {
    pub const LEN: usize = 1 + Round::LEN + RequestTracker::LEN;

    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            round: Round::new(now),
            requests: RequestTracker::default(),
        }
    }

    /// Reads state from an account buffer that may carry trailing zero bytes.
    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        let state = Self::deserialize(&mut &src[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if !state.is_initialized {
            return Err(LotteryError::NotInitialized.into());
        }
        Ok(state)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let data = self
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if data.len() > dst.len() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        dst[..data.len()].copy_from_slice(&data);
        Ok(())
    }

    pub fn phase(&self) -> LotteryPhase {
        self.round.phase()
    }

    pub fn collected_balance(&self) -> u64 {
        self.round.collected_balance()
    }

    pub fn participant_count(&self) -> usize {
        self.round.participant_count()
    }

    pub fn participant(&self, index: usize) -> Option<&Pubkey> {
        self.round.participant(index)
    }

    pub fn last_reset_timestamp(&self) -> UnixTimestamp {
        self.round.last_reset_timestamp()
    }

    pub fn latest_winner(&self) -> Option<Pubkey> {
        self.round.latest_winner()
    }

    pub fn outstanding_request_id(&self) -> Option<u64> {
        self.round.outstanding_request_id()
    }
}
