use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::{
    error::LotteryError,
    instruction::LotteryInstruction,
    oracle::CpiOracle,
    payout::{RandomValue, VaultTransfer},
    state::{Config, LotteryState},
    utils::{find_config_address, find_lottery_address, CONFIG_SEED, LOTTERY_SEED},
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process_instruction(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::Initialize {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                callback_gas_limit,
                request_confirmations,
                num_words,
            } => {
                msg!("Instruction: Initialize");
                let config = Config {
                    is_initialized: true,
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    callback_gas_limit,
                    request_confirmations,
                    num_words,
                    ..Config::default()
                };
                Self::process_initialize(program_id, accounts, config)
            }
            LotteryInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(program_id, accounts, amount)
            }
            LotteryInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            LotteryInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            LotteryInstruction::FulfillRandomness {
                request_id,
                random_value,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(program_id, accounts, request_id, random_value)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        mut config: Config,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let oracle_program_info = next_account_info(account_info_iter)?;
        let oracle_authority_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let (expected_config, config_bump) = find_config_address(program_id);
        let (expected_lottery, lottery_bump) = find_lottery_address(program_id);
        if *config_info.key != expected_config || *lottery_info.key != expected_lottery {
            msg!("Invalid config or lottery account address");
            return Err(LotteryError::InvalidAccount.into());
        }
        if config_info.owner == program_id || lottery_info.owner == program_id {
            msg!("Lottery is already initialized");
            return Err(LotteryError::AlreadyInitialized.into());
        }
        if config.num_words == 0 {
            msg!("At least one random word must be requested");
            return Err(ProgramError::InvalidArgument);
        }

        let rent = Rent::get()?;
        // A pot below this cannot be credited to an emptied winner account
        let min_fee = rent.minimum_balance(0);
        if config.entrance_fee < min_fee {
            msg!(
                "Entrance fee {} is below the rent exempt minimum {}",
                config.entrance_fee,
                min_fee
            );
            return Err(ProgramError::InvalidArgument);
        }

        invoke_signed(
            &system_instruction::create_account(
                admin_info.key,
                config_info.key,
                rent.minimum_balance(Config::LEN),
                Config::LEN as u64,
                program_id,
            ),
            &[admin_info.clone(), config_info.clone(), system_program_info.clone()],
            &[&[CONFIG_SEED, &[config_bump]]],
        )?;
        invoke_signed(
            &system_instruction::create_account(
                admin_info.key,
                lottery_info.key,
                rent.minimum_balance(LotteryState::LEN),
                LotteryState::LEN as u64,
                program_id,
            ),
            &[admin_info.clone(), lottery_info.clone(), system_program_info.clone()],
            &[&[LOTTERY_SEED, &[lottery_bump]]],
        )?;

        config.admin = *admin_info.key;
        config.oracle_program = *oracle_program_info.key;
        config.oracle_authority = *oracle_authority_info.key;
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        let clock = Clock::get()?;
        let state = LotteryState::new(clock.unix_timestamp);
        state.pack(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Lottery initialized: EntranceFee={}, Interval={}s, Oracle={}",
            config.entrance_fee,
            config.interval,
            config.oracle_program
        );
        Ok(())
    }

    fn process_enter(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut state = Self::load_lottery(program_id, lottery_info)?;

        let event = state.enter(&config, *player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, lottery_info.key, amount),
            &[
                player_info.clone(),
                lottery_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        state.pack(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        let state = Self::load_lottery(program_id, lottery_info)?;
        let clock = Clock::get()?;

        let (ready, status) = state.check_upkeep(&config, clock.unix_timestamp);
        if ready {
            msg!("Upkeep needed");
        } else {
            msg!("Upkeep not needed: {}", status.failing_conditions().join(", "));
        }

        let data = status
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let keeper_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let oracle_program_info = next_account_info(account_info_iter)?;
        let remaining_accounts = account_info_iter.as_slice();

        if !keeper_info.is_signer {
            msg!("Keeper must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut state = Self::load_lottery(program_id, lottery_info)?;
        if *oracle_program_info.key != config.oracle_program {
            msg!("Oracle program does not match config");
            return Err(LotteryError::InvalidAccount.into());
        }

        let (_, lottery_bump) = find_lottery_address(program_id);
        let bump = [lottery_bump];
        let seeds: &[&[u8]] = &[LOTTERY_SEED, &bump];
        let mut oracle = CpiOracle {
            oracle_program: oracle_program_info,
            requester: lottery_info,
            requester_seeds: seeds,
            remaining_accounts,
        };

        let clock = Clock::get()?;
        let event = state.perform_upkeep(&config, clock.unix_timestamp, &mut oracle)?;

        state.pack(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    fn process_fulfill_randomness(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_value: RandomValue,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !oracle_info.is_signer {
            msg!("Oracle authority must sign the transaction");
            return Err(LotteryError::Unauthorized.into());
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut state = Self::load_lottery(program_id, lottery_info)?;

        let rent = Rent::get()?;
        let mut transfer = VaultTransfer {
            vault: lottery_info,
            recipient: winner_info,
            reserve: rent.minimum_balance(lottery_info.data_len()),
        };

        let clock = Clock::get()?;
        let event = state
            .fulfill_randomness(
                &config,
                oracle_info.key,
                request_id,
                &random_value,
                clock.unix_timestamp,
                &mut transfer,
            )
            .map_err(|e| {
                if e.is_fatal() {
                    msg!("FATAL: lottery bookkeeping is inconsistent: {}", e);
                }
                e
            })?;

        state.pack(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    fn load_config(program_id: &Pubkey, config_info: &AccountInfo) -> Result<Config, ProgramError> {
        let (expected, _) = find_config_address(program_id);
        if *config_info.key != expected || config_info.owner != program_id {
            msg!("Invalid config account");
            return Err(LotteryError::InvalidAccount.into());
        }
        Config::unpack(&config_info.data.borrow())
            .map_err(|_| LotteryError::NotInitialized.into())
    }

    fn load_lottery(
        program_id: &Pubkey,
        lottery_info: &AccountInfo,
    ) -> Result<LotteryState, ProgramError> {
        let (expected, _) = find_lottery_address(program_id);
        if *lottery_info.key != expected || lottery_info.owner != program_id {
            msg!("Invalid lottery account");
            return Err(LotteryError::InvalidAccount.into());
        }
        LotteryState::unpack(&lottery_info.data.borrow())
    }
}
