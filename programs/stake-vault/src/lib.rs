pub mod account_structs;
/// # stake vault - Liquid Staking Accounting Core
///
/// ## Business Process Flow
///
/// 1. Initial Setup:
///    - Admin initializes the vault with the underlying token, the cooldown
///      period and the redemption window
///    - Admin hands the vault token account to the program authority and
///      appoints the pause/manager/rewards administrators
///
/// 2. User Staking Flow:
///    a. Submission Phase:
///       - User submits underlying tokens
///       - System mints shares at the current pool rate (1:1 on the first
///         deposit) and credits the user's ledger entry
///       - Shares move freely between holders and can be delegated through
///         allowances
///
/// 3. Withdrawal Flow:
///    a. Unlock Request:
///       - User moves shares into custody; the payout value is locked in at
///         the current exchange rate
///       - Cooldown timer starts; the request can still be cancelled
///
///    b. Cooldown and Redemption Window:
///       - After the cooldown the request is redeemable for its locked value
///       - The redemption window bounds how long that guarantee stands
///
///    c. Settlement:
///       - Inside the window: shares burn and the locked value pays out of
///         the reserve
///       - After the window: the request is overdue and the shares return to
///         the free balance instead, re-exposed to the live rate
///
/// 4. Administrative Functions:
///    - Rewards administrators accrue yield into the pool, net of the
///      protocol fee, snapshotting the exchange-rate history
///    - Manager administrators pre-fund and drain the liquid reserve
///    - Pause administrators halt transfers/withdrawals or minting alone
///
/// All ledger mutations are atomic per instruction and every state change
/// emits exactly one structured event for off-chain indexers.
pub mod error;
pub mod events;
mod guard;
pub mod processor;
pub mod queue;
pub mod rates;
pub mod state;

use account_structs::*;
use anchor_lang::prelude::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

#[program]
pub mod stake_vault {
    use super::*;

    /// Initializes the vault with its time windows and administrator lists:
    /// - cooldown_period: seconds an unlock request must wait before redeeming
    /// - redeem_period: seconds the locked payout stays claimable after cooldown
    pub fn initialize(
        ctx: Context<Initialize>,
        cooldown_period: i64,
        redeem_period: i64,
        pause_administrators: Vec<Pubkey>,
        manager_administrators: Vec<Pubkey>,
        rewards_administrators: Vec<Pubkey>,
    ) -> Result<()> {
        processor::initialize(
            ctx,
            cooldown_period,
            redeem_period,
            pause_administrators,
            manager_administrators,
            rewards_administrators,
        )
    }

    /// Stakes underlying tokens into the pool:
    /// - Transfers the underlying to the vault reserve
    /// - Mints shares to the caller at the current pool rate
    pub fn submit(ctx: Context<Submit>, value: u64) -> Result<()> {
        processor::submit(ctx, value)
    }

    /// Moves free (non-custody) shares to another holder.
    pub fn transfer(ctx: Context<TransferShares>, recipient: Pubkey, amount: u64) -> Result<()> {
        processor::transfer(ctx, recipient, amount)
    }

    /// Sets the spender's allowance over the caller's shares, replacing any
    /// previous approval.
    pub fn approve(ctx: Context<Approve>, spender: Pubkey, amount: u64) -> Result<()> {
        processor::approve(ctx, spender, amount)
    }

    /// Spends an allowance to move shares between third parties.
    pub fn transfer_from(
        ctx: Context<TransferFromShares>,
        owner: Pubkey,
        recipient: Pubkey,
        amount: u64,
    ) -> Result<()> {
        processor::transfer_from(ctx, owner, recipient, amount)
    }

    /// Starts a withdrawal:
    /// - Moves shares into custody and fixes their payout value at the
    ///   current exchange rate
    /// - Appends the request to the caller's unlock queue
    pub fn request_unlock(ctx: Context<RequestUnlock>, share_amount: u64) -> Result<()> {
        processor::request_unlock(ctx, share_amount)
    }

    /// Cancels a pending unlock request, returning its shares to the free
    /// balance. Overdue requests must use `redeem_overdue_shares` instead.
    pub fn cancel_unlock_request(ctx: Context<CancelUnlockRequest>, index: u64) -> Result<()> {
        processor::cancel_unlock_request(ctx, index)
    }

    /// Redeems an unlock request after its cooldown and inside its window:
    /// - Burns the shares and pays the locked value from the reserve
    /// - With no index, settles the earliest redeemable request
    pub fn redeem(ctx: Context<Redeem>, index: Option<u64>) -> Result<()> {
        processor::redeem(ctx, index)
    }

    /// Recovers an overdue unlock request as shares (no payout):
    /// - With no index, recovers the earliest overdue request
    pub fn redeem_overdue_shares(
        ctx: Context<RedeemOverdueShares>,
        index: Option<u64>,
    ) -> Result<()> {
        processor::redeem_overdue_shares(ctx, index)
    }

    /// Grows the pool by accrued yield, net of the protocol fee, and
    /// snapshots the exchange-rate history.
    pub fn accrue_rewards(ctx: Context<AccrueRewards>, amount: u64) -> Result<()> {
        processor::accrue_rewards(ctx, amount)
    }

    /// Pre-funds the liquid reserve for upcoming redemptions without
    /// touching pooled value or share supply.
    pub fn deposit(ctx: Context<DepositReserve>, value: u64) -> Result<()> {
        processor::deposit(ctx, value)
    }

    /// Moves reserve funds out for off-vault use (e.g. a staking backend).
    pub fn withdraw(ctx: Context<WithdrawReserve>, amount: u64) -> Result<()> {
        processor::withdraw(ctx, amount)
    }

    /// Halts transfers and withdrawals.
    pub fn pause(ctx: Context<PauseControl>) -> Result<()> {
        processor::pause(ctx)
    }

    pub fn resume(ctx: Context<PauseControl>) -> Result<()> {
        processor::resume(ctx)
    }

    /// Halts submissions only.
    pub fn pause_minting(ctx: Context<PauseControl>) -> Result<()> {
        processor::pause_minting(ctx)
    }

    pub fn resume_minting(ctx: Context<PauseControl>) -> Result<()> {
        processor::resume_minting(ctx)
    }

    pub fn set_cooldown_period(ctx: Context<UpdateConfig>, new_period: i64) -> Result<()> {
        processor::set_cooldown_period(ctx, new_period)
    }

    pub fn set_redeem_period(ctx: Context<UpdateConfig>, new_period: i64) -> Result<()> {
        processor::set_redeem_period(ctx, new_period)
    }

    pub fn set_total_pooled_cap(ctx: Context<UpdateConfig>, new_cap: u64) -> Result<()> {
        processor::set_total_pooled_cap(ctx, new_cap)
    }

    /// Configures where the protocol's cut of accrued rewards goes and how
    /// large it is (fraction scaled by 1e9).
    pub fn set_protocol_reward_data(
        ctx: Context<UpdateConfig>,
        recipient: Pubkey,
        reward_share: u64,
    ) -> Result<()> {
        processor::set_protocol_reward_data(ctx, recipient, reward_share)
    }

    pub fn update_pause_administrators(
        ctx: Context<UpdateAdministrators>,
        new_administrators: Vec<Pubkey>,
    ) -> Result<()> {
        processor::update_pause_administrators(ctx, new_administrators)
    }

    pub fn update_manager_administrators(
        ctx: Context<UpdateAdministrators>,
        new_administrators: Vec<Pubkey>,
    ) -> Result<()> {
        processor::update_manager_administrators(ctx, new_administrators)
    }

    pub fn update_rewards_administrators(
        ctx: Context<UpdateAdministrators>,
        new_administrators: Vec<Pubkey>,
    ) -> Result<()> {
        processor::update_rewards_administrators(ctx, new_administrators)
    }

    pub fn shares_to_value(ctx: Context<ConversionView>, shares: u64) -> Result<u64> {
        processor::shares_to_value(ctx, shares)
    }

    pub fn value_to_shares(ctx: Context<ConversionView>, value: u64) -> Result<u64> {
        processor::value_to_shares(ctx, value)
    }

    pub fn exchange_rate(ctx: Context<ConversionView>) -> Result<u64> {
        processor::exchange_rate(ctx)
    }

    pub fn exchange_rate_at(ctx: Context<RateView>, timestamp: i64) -> Result<u64> {
        processor::exchange_rate_at(ctx, timestamp)
    }
}
