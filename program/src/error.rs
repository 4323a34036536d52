use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Deposit is below the entrance fee
    #[error("Deposit is below the entrance fee")]
    InsufficientDeposit,

    /// Entry is closed while the winner is being calculated
    #[error("Round is closed for entries")]
    RoundClosed,

    /// At least one readiness condition does not hold
    #[error("Upkeep not needed")]
    UpkeepNotReady,

    /// The randomness request could not be delivered to the oracle
    #[error("Oracle request failed")]
    OracleRequestFailed,

    /// Caller is not the designated oracle
    #[error("Caller is not the designated oracle")]
    Unauthorized,

    /// Request id was never issued, already consumed, or belongs to another round
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Prize could not be moved to the winner
    #[error("Transfer to winner failed")]
    TransferFailed,

    /// Winner selection ran against an empty roster
    #[error("Participant roster is empty")]
    EmptyRoster,

    /// No room left for another pending randomness request
    #[error("Randomness request capacity exceeded")]
    CapacityExceeded,

    /// Config or lottery account already initialized
    #[error("Lottery already initialized")]
    AlreadyInitialized,

    /// Config or lottery account not initialized
    #[error("Lottery not initialized")]
    NotInitialized,

    /// Account does not match the expected address or owner
    #[error("Invalid account")]
    InvalidAccount,

    /// Every participant slot of the current round is taken
    #[error("Participant roster is full")]
    RosterFull,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl LotteryError {
    /// Errors that mean the program's own bookkeeping is broken rather than
    /// that a caller did something wrong.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LotteryError::EmptyRoster)
    }
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
