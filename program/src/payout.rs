//! Winner selection and prize transfer.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, msg, pubkey::Pubkey};

use crate::error::LotteryError;

/// One oracle word: a 256-bit unsigned integer, big-endian.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomValue(pub [u8; 32]);

impl RandomValue {
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Exact `self mod modulus` over the full 256 bits.
    ///
    /// Plain modulo reduction: when `modulus` does not divide 2^256 lower
    /// indices are very slightly favoured. That bias is accepted.
    pub fn reduce(&self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        let modulus = modulus as u128;
        self.0
            .iter()
            .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus) as u64
    }
}

impl From<u64> for RandomValue {
    fn from(value: u64) -> Self {
        Self::from(value as u128)
    }
}

impl From<u128> for RandomValue {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

/// Picks the slot at `random_value mod participants.len()`.
///
/// An empty roster here means the round invariants were broken upstream.
pub fn select_winner(
    random_value: &RandomValue,
    participants: &[Pubkey],
) -> Result<Pubkey, LotteryError> {
    if participants.is_empty() {
        msg!("Winner selection with an empty roster");
        return Err(LotteryError::EmptyRoster);
    }

    let index = random_value.reduce(participants.len() as u64) as usize;
    Ok(participants[index])
}

/// Moves value out of the lottery to a recipient.
pub trait ValueTransfer {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), LotteryError>;
}

/// Pays `amount` to `winner`. Any rejection surfaces as `TransferFailed`.
pub fn payout<T: ValueTransfer>(
    transfer: &mut T,
    winner: &Pubkey,
    amount: u64,
) -> Result<(), LotteryError> {
    transfer.transfer(winner, amount).map_err(|e| {
        msg!("Payout of {} lamports to {} rejected: {}", amount, winner, e);
        LotteryError::TransferFailed
    })
}

/// Debits the program-owned lottery vault directly and credits the winner's
/// account. The vault never drops below `reserve` (its rent-exempt minimum).
pub struct VaultTransfer<'a, 'info> {
    pub vault: &'a AccountInfo<'info>,
    pub recipient: &'a AccountInfo<'info>,
    pub reserve: u64,
}

impl<'a, 'info> ValueTransfer for VaultTransfer<'a, 'info> {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), LotteryError> {
        if self.recipient.key != recipient {
            msg!("Supplied winner account {} does not match {}", self.recipient.key, recipient);
            return Err(LotteryError::TransferFailed);
        }
        if !self.recipient.is_writable || self.recipient.key == self.vault.key {
            return Err(LotteryError::TransferFailed);
        }

        let vault_remaining = self
            .vault
            .lamports()
            .checked_sub(amount)
            .filter(|remaining| *remaining >= self.reserve)
            .ok_or(LotteryError::TransferFailed)?;
        let recipient_total = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(LotteryError::TransferFailed)?;

        **self
            .vault
            .try_borrow_mut_lamports()
            .map_err(|_| LotteryError::TransferFailed)? = vault_remaining;
        **self
            .recipient
            .try_borrow_mut_lamports()
            .map_err(|_| LotteryError::TransferFailed)? = recipient_total;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingTransfer;

    impl ValueTransfer for RejectingTransfer {
        fn transfer(&mut self, _recipient: &Pubkey, _amount: u64) -> Result<(), LotteryError> {
            Err(LotteryError::InvalidAccount)
        }
    }

    fn roster(n: usize) -> Vec<Pubkey> {
        (0..n).map(|_| Pubkey::new_unique()).collect()
    }

    #[test]
    fn selects_random_mod_len() {
        let players = roster(3);
        let winner = select_winner(&RandomValue::from(7u64), &players).unwrap();
        assert_eq!(winner, players[1]);
    }

    #[test]
    fn selection_is_stable_under_multiples_of_len() {
        let players = roster(5);
        let base = select_winner(&RandomValue::from(12u64), &players).unwrap();
        for k in [1u128, 2, 1_000, u64::MAX as u128] {
            let shifted = RandomValue::from(12u128 + k * players.len() as u128);
            assert_eq!(select_winner(&shifted, &players).unwrap(), base);
        }
    }

    #[test]
    fn reduce_uses_all_256_bits() {
        // 2^128 mod 3 == 1
        let mut bytes = [0u8; 32];
        bytes[15] = 1;
        assert_eq!(RandomValue::from_be_bytes(bytes).reduce(3), 1);
        assert_eq!(RandomValue::from_be_bytes([0xff; 32]).reduce(1), 0);
    }

    #[test]
    fn single_participant_always_wins() {
        let players = roster(1);
        let value = RandomValue::from_be_bytes([0xab; 32]);
        assert_eq!(select_winner(&value, &players).unwrap(), players[0]);
    }

    #[test]
    fn empty_roster_is_fatal() {
        let err = select_winner(&RandomValue::from(1u64), &[]).unwrap_err();
        assert_eq!(err, LotteryError::EmptyRoster);
        assert!(err.is_fatal());
    }

    #[test]
    fn rejected_transfer_maps_to_transfer_failed() {
        let err = payout(&mut RejectingTransfer, &Pubkey::new_unique(), 10).unwrap_err();
        assert_eq!(err, LotteryError::TransferFailed);
    }

    #[test]
    fn vault_transfer_moves_lamports_above_reserve() {
        let program_id = Pubkey::new_unique();
        let vault_key = Pubkey::new_unique();
        let winner_key = Pubkey::new_unique();
        let mut vault_lamports = 1_300;
        let mut winner_lamports = 50;
        let mut vault_data: [u8; 0] = [];
        let mut winner_data: [u8; 0] = [];
        let vault = AccountInfo::new(
            &vault_key, false, true, &mut vault_lamports, &mut vault_data, &program_id, false, 0,
        );
        let winner = AccountInfo::new(
            &winner_key, false, true, &mut winner_lamports, &mut winner_data, &program_id, false, 0,
        );

        let mut transfer = VaultTransfer { vault: &vault, recipient: &winner, reserve: 1_000 };
        assert_eq!(transfer.transfer(&winner_key, 301), Err(LotteryError::TransferFailed));
        transfer.transfer(&winner_key, 300).unwrap();

        assert_eq!(vault.lamports(), 1_000);
        assert_eq!(winner.lamports(), 350);
    }

    #[test]
    fn vault_transfer_rejects_wrong_recipient() {
        let program_id = Pubkey::new_unique();
        let vault_key = Pubkey::new_unique();
        let supplied_key = Pubkey::new_unique();
        let mut vault_lamports = 5_000;
        let mut supplied_lamports = 0;
        let mut vault_data: [u8; 0] = [];
        let mut supplied_data: [u8; 0] = [];
        let vault = AccountInfo::new(
            &vault_key, false, true, &mut vault_lamports, &mut vault_data, &program_id, false, 0,
        );
        let supplied = AccountInfo::new(
            &supplied_key, false, true, &mut supplied_lamports, &mut supplied_data, &program_id,
            false, 0,
        );

        let mut transfer = VaultTransfer { vault: &vault, recipient: &supplied, reserve: 0 };
        let result = transfer.transfer(&Pubkey::new_unique(), 100);

        assert_eq!(result, Err(LotteryError::TransferFailed));
        assert_eq!(vault.lamports(), 5_000);
    }
}
