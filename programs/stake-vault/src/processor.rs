use crate::account_structs::*;
use crate::error::*;
use crate::events::*;
use crate::guard::{require_capability, validate_program_update_authority};
use crate::queue::{apply_cancel, apply_redeem, apply_redeem_overdue, apply_request_unlock};
use crate::rates::apply_accrue;
use crate::state::{
    apply_submit, apply_transfer, apply_transfer_from, calculate_exchange_rate,
    calculate_shares_to_value, calculate_value_to_shares, MAX_ADMINISTRATORS, MAX_PERIOD,
    MIN_PERIOD, RATE_SCALE,
};
use anchor_lang::prelude::*;
use anchor_spl::token::spl_token::instruction::AuthorityType;
use anchor_spl::token::{self, Transfer};

/*
# Value Accounting vs. Reserve Accounting

The ledger tracks two separate quantities on purpose:

- `total_pooled_value` is the accounting size of the pool. It moves with
  submissions, reward accrual and redemptions, and it is what the share
  price is computed from.
- The vault token account balance is the liquid reserve available for
  payouts. Managers pre-fund it with `deposit` and drain it with `withdraw`
  (e.g. to forward funds to a staking backend) without touching the share
  price.

Because the pool size is a ledger field rather than a token balance, sending
tokens straight to the vault token account cannot move the exchange rate, so
the donation-style rate manipulation that vaults with balance-derived
accounting have to defend against does not apply here.

A redemption pays out the value that was locked when the unlock was
requested, never the value at payout time. Rewards accrued while a request
waits in its cooldown therefore belong to the remaining shareholders, and an
accrual can never retroactively change what an outstanding request is owed.
*/

pub fn initialize(
    ctx: Context<Initialize>,
    cooldown_period: i64,
    redeem_period: i64,
    pause_administrators: Vec<Pubkey>,
    manager_administrators: Vec<Pubkey>,
    rewards_administrators: Vec<Pubkey>,
) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        pause_administrators.len() <= MAX_ADMINISTRATORS
            && manager_administrators.len() <= MAX_ADMINISTRATORS
            && rewards_administrators.len() <= MAX_ADMINISTRATORS,
        VaultError::TooManyAdministrators
    );
    require!(
        (MIN_PERIOD..=MAX_PERIOD).contains(&cooldown_period),
        VaultError::InvalidPeriod
    );
    require!(
        (MIN_PERIOD..=MAX_PERIOD).contains(&redeem_period),
        VaultError::InvalidPeriod
    );

    let config = &mut ctx.accounts.vault_config;
    config.underlying_mint = ctx.accounts.underlying_mint.key();
    config.vault_token_account = ctx.accounts.vault_token_account.key();
    config.total_pooled_value = 0;
    config.total_shares = 0;
    config.total_pooled_cap = u64::MAX;
    config.cooldown_period = cooldown_period;
    config.redeem_period = redeem_period;
    config.paused = false;
    config.minting_paused = false;
    config.protocol_reward_recipient = Pubkey::default();
    config.protocol_reward_share = 0;
    config.pause_administrators = pause_administrators;
    config.manager_administrators = manager_administrators;
    config.rewards_administrators = rewards_administrators;
    config.bump = ctx.bumps.vault_config;

    ctx.accounts.rate_history.bump = ctx.bumps.rate_history;

    // The vault token account must be owned by the program-derived address
    // so that only the program can move the underlying reserve out of it.
    if ctx.accounts.vault_token_account.owner == ctx.accounts.signer.key() {
        let seeds: &[&[u8]] = &[b"vault_authority", &[ctx.bumps.vault_authority]];
        let signer = &[&seeds[..]];
        token::set_authority(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::SetAuthority {
                    account_or_mint: ctx.accounts.vault_token_account.to_account_info(),
                    current_authority: ctx.accounts.signer.to_account_info(),
                },
                signer,
            ),
            AuthorityType::AccountOwner,
            Some(ctx.accounts.vault_authority.key()),
        )?;
    }
    Ok(())
}

pub fn submit(ctx: Context<Submit>, value: u64) -> Result<()> {
    let holder = &mut ctx.accounts.holder_account;
    if holder.holder == Pubkey::default() {
        holder.holder = ctx.accounts.signer.key();
        holder.bump = ctx.bumps.holder_account;
    }

    let config = &mut ctx.accounts.vault_config;
    let shares = apply_submit(config, holder, value)?;
    msg!("Submitted {} underlying units for {} shares", value, shares);

    let cpi_accounts = Transfer {
        from: ctx.accounts.user_token_account.to_account_info(),
        to: ctx.accounts.vault_token_account.to_account_info(),
        authority: ctx.accounts.signer.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        value,
    )?;

    emit!(Submitted {
        user: ctx.accounts.signer.key(),
        value_amount: value,
        share_amount: shares,
        total_pooled_value: ctx.accounts.vault_config.total_pooled_value,
        total_shares: ctx.accounts.vault_config.total_shares,
    });

    Ok(())
}

pub fn transfer(ctx: Context<TransferShares>, recipient: Pubkey, amount: u64) -> Result<()> {
    let to_holder = &mut ctx.accounts.to_holder;
    if to_holder.holder == Pubkey::default() {
        // left untouched for the zero address, which apply_transfer rejects
        to_holder.holder = recipient;
        to_holder.bump = ctx.bumps.to_holder;
    }

    apply_transfer(
        &ctx.accounts.vault_config,
        &mut ctx.accounts.from_holder,
        &mut ctx.accounts.to_holder,
        amount,
    )?;

    emit!(ShareTransferred {
        from: ctx.accounts.signer.key(),
        to: recipient,
        amount,
    });

    Ok(())
}

pub fn approve(ctx: Context<Approve>, spender: Pubkey, amount: u64) -> Result<()> {
    require!(spender != Pubkey::default(), VaultError::ZeroAddress);

    let allowance = &mut ctx.accounts.allowance;
    allowance.owner = ctx.accounts.signer.key();
    allowance.spender = spender;
    allowance.amount = amount;
    allowance.bump = ctx.bumps.allowance;

    emit!(ShareApproved {
        owner: ctx.accounts.signer.key(),
        spender,
        amount,
    });

    Ok(())
}

pub fn transfer_from(
    ctx: Context<TransferFromShares>,
    owner: Pubkey,
    recipient: Pubkey,
    amount: u64,
) -> Result<()> {
    let to_holder = &mut ctx.accounts.to_holder;
    if to_holder.holder == Pubkey::default() {
        to_holder.holder = recipient;
        to_holder.bump = ctx.bumps.to_holder;
    }

    apply_transfer_from(
        &ctx.accounts.vault_config,
        &mut ctx.accounts.allowance,
        &mut ctx.accounts.from_holder,
        &mut ctx.accounts.to_holder,
        amount,
    )?;

    emit!(ShareTransferred {
        from: owner,
        to: recipient,
        amount,
    });

    Ok(())
}

pub fn request_unlock(ctx: Context<RequestUnlock>, share_amount: u64) -> Result<()> {
    let queue = &mut ctx.accounts.unlock_queue;
    if queue.holder == Pubkey::default() {
        queue.holder = ctx.accounts.signer.key();
        queue.bump = ctx.bumps.unlock_queue;
    }

    let now = Clock::get()?.unix_timestamp;
    let request = apply_request_unlock(
        &ctx.accounts.vault_config,
        &mut ctx.accounts.holder_account,
        queue,
        share_amount,
        now,
    )?;
    msg!(
        "Unlock requested: {} shares locked at {} underlying units",
        request.share_amount,
        request.locked_value
    );

    emit!(UnlockRequested {
        user: ctx.accounts.signer.key(),
        share_amount: request.share_amount,
        locked_value: request.locked_value,
        created_at: request.created_at,
    });

    Ok(())
}

pub fn cancel_unlock_request(ctx: Context<CancelUnlockRequest>, index: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let removed = apply_cancel(
        &ctx.accounts.vault_config,
        &mut ctx.accounts.holder_account,
        &mut ctx.accounts.unlock_queue,
        index,
        now,
    )?;

    emit!(UnlockCancelled {
        user: ctx.accounts.signer.key(),
        locked_value: removed.locked_value,
        share_amount: removed.share_amount,
    });

    Ok(())
}

pub fn redeem(ctx: Context<Redeem>, index: Option<u64>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let request = apply_redeem(
        &mut ctx.accounts.vault_config,
        &mut ctx.accounts.holder_account,
        &mut ctx.accounts.unlock_queue,
        index,
        now,
    )?;
    msg!(
        "Redeeming {} shares for {} underlying units",
        request.share_amount,
        request.locked_value
    );

    require!(
        ctx.accounts.vault_token_account.amount >= request.locked_value,
        VaultError::InsufficientBalance
    );

    let seeds: &[&[u8]] = &[b"vault_authority", &[ctx.bumps.vault_authority]];
    let signer = &[&seeds[..]];
    let cpi_accounts = Transfer {
        from: ctx.accounts.vault_token_account.to_account_info(),
        to: ctx.accounts.user_token_account.to_account_info(),
        authority: ctx.accounts.vault_authority.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            cpi_accounts,
            signer,
        ),
        request.locked_value,
    )?;

    emit!(Redeemed {
        user: ctx.accounts.signer.key(),
        locked_value: request.locked_value,
        shares_burned: request.share_amount,
        total_pooled_value: ctx.accounts.vault_config.total_pooled_value,
        total_shares: ctx.accounts.vault_config.total_shares,
    });

    Ok(())
}

pub fn redeem_overdue_shares(ctx: Context<RedeemOverdueShares>, index: Option<u64>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let removed = apply_redeem_overdue(
        &ctx.accounts.vault_config,
        &mut ctx.accounts.holder_account,
        &mut ctx.accounts.unlock_queue,
        index,
        now,
    )?;

    emit!(OverdueSharesRedeemed {
        user: ctx.accounts.signer.key(),
        share_amount: removed.share_amount,
    });

    Ok(())
}

pub fn accrue_rewards(ctx: Context<AccrueRewards>, amount: u64) -> Result<()> {
    require_capability(
        &ctx.accounts.vault_config.rewards_administrators,
        &ctx.accounts.admin.key(),
    )?;

    let now = Clock::get()?.unix_timestamp;
    let (net, fee) = apply_accrue(
        &mut ctx.accounts.vault_config,
        &mut ctx.accounts.rate_history,
        amount,
        now,
    )?;
    msg!("Accruing rewards: {} net to the pool, {} protocol fee", net, fee);

    let cpi_accounts = Transfer {
        from: ctx.accounts.admin_token_account.to_account_info(),
        to: ctx.accounts.vault_token_account.to_account_info(),
        authority: ctx.accounts.admin.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        net,
    )?;

    if fee > 0 {
        let reward_account = ctx
            .accounts
            .protocol_reward_token_account
            .as_ref()
            .ok_or(error!(VaultError::InvalidRewardRecipient))?;
        require_keys_eq!(
            reward_account.owner,
            ctx.accounts.vault_config.protocol_reward_recipient,
            VaultError::InvalidRewardRecipient
        );

        let cpi_accounts = Transfer {
            from: ctx.accounts.admin_token_account.to_account_info(),
            to: reward_account.to_account_info(),
            authority: ctx.accounts.admin.to_account_info(),
        };
        token::transfer(
            CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
            fee,
        )?;
    }

    emit!(RewardsAccrued {
        admin: ctx.accounts.admin.key(),
        net_amount: net,
        protocol_fee_amount: fee,
        total_pooled_value: ctx.accounts.vault_config.total_pooled_value,
        total_shares: ctx.accounts.vault_config.total_shares,
    });

    Ok(())
}

pub fn deposit(ctx: Context<DepositReserve>, value: u64) -> Result<()> {
    require_capability(
        &ctx.accounts.vault_config.manager_administrators,
        &ctx.accounts.admin.key(),
    )?;
    require!(value > 0, VaultError::ZeroValue);

    let cpi_accounts = Transfer {
        from: ctx.accounts.admin_token_account.to_account_info(),
        to: ctx.accounts.vault_token_account.to_account_info(),
        authority: ctx.accounts.admin.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        value,
    )?;

    // the reserve grows; pooled value and share supply do not
    emit!(Deposited {
        admin: ctx.accounts.admin.key(),
        value_amount: value,
    });

    Ok(())
}

pub fn withdraw(ctx: Context<WithdrawReserve>, amount: u64) -> Result<()> {
    require_capability(
        &ctx.accounts.vault_config.manager_administrators,
        &ctx.accounts.admin.key(),
    )?;
    require!(!ctx.accounts.vault_config.paused, VaultError::ProtocolPaused);
    require!(
        ctx.accounts.vault_token_account.amount >= amount,
        VaultError::InsufficientBalance
    );

    let seeds: &[&[u8]] = &[b"vault_authority", &[ctx.bumps.vault_authority]];
    let signer = &[&seeds[..]];
    let cpi_accounts = Transfer {
        from: ctx.accounts.vault_token_account.to_account_info(),
        to: ctx.accounts.admin_token_account.to_account_info(),
        authority: ctx.accounts.vault_authority.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            cpi_accounts,
            signer,
        ),
        amount,
    )?;

    emit!(Withdrawn {
        admin: ctx.accounts.admin.key(),
        amount,
    });

    Ok(())
}

pub fn pause(ctx: Context<PauseControl>) -> Result<()> {
    let config = &mut ctx.accounts.vault_config;
    require_capability(&config.pause_administrators, &ctx.accounts.signer.key())?;
    require!(!config.paused, VaultError::AlreadyPaused);

    config.paused = true;
    msg!("Protocol paused");

    emit!(VaultPaused {
        admin: ctx.accounts.signer.key(),
    });

    Ok(())
}

pub fn resume(ctx: Context<PauseControl>) -> Result<()> {
    let config = &mut ctx.accounts.vault_config;
    require_capability(&config.pause_administrators, &ctx.accounts.signer.key())?;
    require!(config.paused, VaultError::NotPaused);

    config.paused = false;
    msg!("Protocol resumed");

    emit!(VaultResumed {
        admin: ctx.accounts.signer.key(),
    });

    Ok(())
}

pub fn pause_minting(ctx: Context<PauseControl>) -> Result<()> {
    let config = &mut ctx.accounts.vault_config;
    require_capability(&config.pause_administrators, &ctx.accounts.signer.key())?;
    require!(!config.minting_paused, VaultError::MintingAlreadyPaused);

    config.minting_paused = true;
    msg!("Minting paused");

    emit!(MintingPaused {
        admin: ctx.accounts.signer.key(),
    });

    Ok(())
}

pub fn resume_minting(ctx: Context<PauseControl>) -> Result<()> {
    let config = &mut ctx.accounts.vault_config;
    require_capability(&config.pause_administrators, &ctx.accounts.signer.key())?;
    require!(config.minting_paused, VaultError::MintingNotPaused);

    config.minting_paused = false;
    msg!("Minting resumed");

    emit!(MintingResumed {
        admin: ctx.accounts.signer.key(),
    });

    Ok(())
}

pub fn set_cooldown_period(ctx: Context<UpdateConfig>, new_period: i64) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        (MIN_PERIOD..=MAX_PERIOD).contains(&new_period),
        VaultError::InvalidPeriod
    );

    let config = &mut ctx.accounts.vault_config;
    let old_period = config.cooldown_period;
    config.cooldown_period = new_period;

    emit!(CooldownPeriodUpdated {
        admin: ctx.accounts.signer.key(),
        old_period,
        new_period,
    });

    Ok(())
}

pub fn set_redeem_period(ctx: Context<UpdateConfig>, new_period: i64) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        (MIN_PERIOD..=MAX_PERIOD).contains(&new_period),
        VaultError::InvalidPeriod
    );

    let config = &mut ctx.accounts.vault_config;
    let old_period = config.redeem_period;
    config.redeem_period = new_period;

    emit!(RedeemPeriodUpdated {
        admin: ctx.accounts.signer.key(),
        old_period,
        new_period,
    });

    Ok(())
}

pub fn set_total_pooled_cap(ctx: Context<UpdateConfig>, new_cap: u64) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;

    let config = &mut ctx.accounts.vault_config;
    let old_cap = config.total_pooled_cap;
    config.total_pooled_cap = new_cap;

    emit!(TotalPooledCapUpdated {
        admin: ctx.accounts.signer.key(),
        old_cap,
        new_cap,
    });

    Ok(())
}

pub fn set_protocol_reward_data(
    ctx: Context<UpdateConfig>,
    recipient: Pubkey,
    reward_share: u64,
) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(recipient != Pubkey::default(), VaultError::ZeroAddress);
    require!(
        (reward_share as u128) <= RATE_SCALE,
        VaultError::InvalidRewardShare
    );

    let config = &mut ctx.accounts.vault_config;
    config.protocol_reward_recipient = recipient;
    config.protocol_reward_share = reward_share;

    emit!(ProtocolRewardDataUpdated {
        admin: ctx.accounts.signer.key(),
        recipient,
        reward_share,
    });

    Ok(())
}

pub fn update_pause_administrators(
    ctx: Context<UpdateAdministrators>,
    new_administrators: Vec<Pubkey>,
) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        new_administrators.len() <= MAX_ADMINISTRATORS,
        VaultError::TooManyAdministrators
    );

    let config = &mut ctx.accounts.vault_config;
    config.pause_administrators = new_administrators;

    msg!(
        "Pause administrators updated. New count: {}",
        config.pause_administrators.len()
    );
    Ok(())
}

pub fn update_manager_administrators(
    ctx: Context<UpdateAdministrators>,
    new_administrators: Vec<Pubkey>,
) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        new_administrators.len() <= MAX_ADMINISTRATORS,
        VaultError::TooManyAdministrators
    );

    let config = &mut ctx.accounts.vault_config;
    config.manager_administrators = new_administrators;

    msg!(
        "Manager administrators updated. New count: {}",
        config.manager_administrators.len()
    );
    Ok(())
}

pub fn update_rewards_administrators(
    ctx: Context<UpdateAdministrators>,
    new_administrators: Vec<Pubkey>,
) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.signer)?;
    require!(
        new_administrators.len() <= MAX_ADMINISTRATORS,
        VaultError::TooManyAdministrators
    );

    let config = &mut ctx.accounts.vault_config;
    config.rewards_administrators = new_administrators;

    msg!(
        "Rewards administrators updated. New count: {}",
        config.rewards_administrators.len()
    );
    Ok(())
}

/// Convert shares to underlying value at the live rate.
/// Returns value via return_data for efficient CPI access.
pub fn shares_to_value(ctx: Context<ConversionView>, shares: u64) -> Result<u64> {
    let config = &ctx.accounts.vault_config;
    let value = calculate_shares_to_value(shares, config.total_shares, config.total_pooled_value)?;

    msg!("shares_to_value: {} shares = {} units", shares, value);

    anchor_lang::solana_program::program::set_return_data(&value.to_le_bytes());

    Ok(value)
}

/// Convert underlying value to shares at the live rate.
/// Returns value via return_data for efficient CPI access.
pub fn value_to_shares(ctx: Context<ConversionView>, value: u64) -> Result<u64> {
    let config = &ctx.accounts.vault_config;
    let shares = calculate_value_to_shares(value, config.total_shares, config.total_pooled_value)?;

    msg!("value_to_shares: {} units = {} shares", value, shares);

    anchor_lang::solana_program::program::set_return_data(&shares.to_le_bytes());

    Ok(shares)
}

/// Get the live exchange rate, scaled by 1e9 for precision.
pub fn exchange_rate(ctx: Context<ConversionView>) -> Result<u64> {
    let config = &ctx.accounts.vault_config;
    let rate = calculate_exchange_rate(config.total_shares, config.total_pooled_value)?;

    msg!("exchange_rate: {} (scaled by 1e9)", rate);

    anchor_lang::solana_program::program::set_return_data(&rate.to_le_bytes());

    Ok(rate)
}

/// Get the exchange rate as of `timestamp` from the accrual history, falling
/// back to the live pool state when no snapshot that old is retained.
pub fn exchange_rate_at(ctx: Context<RateView>, timestamp: i64) -> Result<u64> {
    let config = &ctx.accounts.vault_config;
    let (total_shares, total_pooled_value) = match ctx.accounts.rate_history.rate_at(timestamp) {
        Some(entry) => (entry.total_shares, entry.total_pooled_value),
        None => (config.total_shares, config.total_pooled_value),
    };
    let rate = calculate_exchange_rate(total_shares, total_pooled_value)?;

    msg!("exchange_rate_at {}: {} (scaled by 1e9)", timestamp, rate);

    anchor_lang::solana_program::program::set_return_data(&rate.to_le_bytes());

    Ok(rate)
}
