use anchor_lang::prelude::*;

use crate::error::VaultError;

pub const MAX_ADMINISTRATORS: usize = 5; // max number of pause/manager/rewards administrators
pub const MIN_PERIOD: i64 = 1; // 1 second
pub const MAX_PERIOD: i64 = 31536000; // 365 days in seconds
pub const RATE_SCALE: u128 = 1_000_000_000; // scale for the exchange rate and the protocol fee fraction

/// Global vault ledger: pooled-value/share totals, the two redemption
/// windows, pause flags, protocol fee routing and capability lists.
///
/// `total_pooled_value` is pure accounting. It moves with submissions,
/// accruals and redemptions only; the liquid reserve held in the vault
/// token account is tracked by the token program and may be topped up or
/// drained independently through `deposit`/`withdraw`.
#[account]
pub struct VaultConfig {
    pub underlying_mint: Pubkey,
    pub vault_token_account: Pubkey,
    pub total_pooled_value: u64,
    pub total_shares: u64,
    pub total_pooled_cap: u64,
    pub cooldown_period: i64,
    pub redeem_period: i64,
    pub paused: bool,
    pub minting_paused: bool,
    pub protocol_reward_recipient: Pubkey,
    pub protocol_reward_share: u64,
    pub pause_administrators: Vec<Pubkey>,
    pub manager_administrators: Vec<Pubkey>,
    pub rewards_administrators: Vec<Pubkey>,
    pub bump: u8,
}

impl VaultConfig {
    // The vectors have a max length of MAX_ADMINISTRATORS each and must include
    // the Borsh overhead of 4 bytes for the length prefix.
    pub const LEN: usize = 8 + 32 + 32 + 8 + 8 + 8 + 8 + 8 + 1 + 1 + 32 + 8
        + 3 * (4 + (32 * MAX_ADMINISTRATORS))
        + 1;

    /// Full lifetime of an unlock request: cooldown plus redemption window.
    pub fn validity_window(&self) -> i64 {
        self.cooldown_period.saturating_add(self.redeem_period)
    }
}

/// Per-holder share balance. `balance` includes shares held in custody for
/// pending unlock requests; only `balance - shares_in_custody` is spendable.
#[account]
pub struct HolderAccount {
    pub holder: Pubkey,
    pub balance: u64,
    pub shares_in_custody: u64,
    pub bump: u8,
}

impl HolderAccount {
    pub const LEN: usize = 8 + 32 + 8 + 8 + 1;

    pub fn free_balance(&self) -> u64 {
        // shares_in_custody never exceeds balance; both are only mutated here
        self.balance.saturating_sub(self.shares_in_custody)
    }
}

/// Spending approval from `owner` to `spender`. A new approval replaces the
/// previous amount.
#[account]
pub struct AllowanceAccount {
    pub owner: Pubkey,
    pub spender: Pubkey,
    pub amount: u64,
    pub bump: u8,
}

impl AllowanceAccount {
    pub const LEN: usize = 8 + 32 + 32 + 8 + 1;
}

// ========== SHARE / POOLED VALUE CONVERSIONS ==========

/// Shares minted for a submission of `value` at the current pool rate.
/// The first deposit bootstraps the pool at 1:1.
pub fn calculate_value_to_shares(
    value: u64,
    total_shares: u64,
    total_pooled_value: u64,
) -> Result<u64> {
    if total_shares == 0 {
        return Ok(value);
    }
    if total_pooled_value == 0 {
        return err!(VaultError::DivisionByZero);
    }

    let shares = (value as u128)
        .checked_mul(total_shares as u128)
        .ok_or(VaultError::Overflow)?
        .checked_div(total_pooled_value as u128)
        .ok_or(VaultError::DivisionByZero)?;

    u64::try_from(shares).map_err(|_| error!(VaultError::Overflow))
}

/// Pooled value represented by `shares` at the current pool rate.
pub fn calculate_shares_to_value(
    shares: u64,
    total_shares: u64,
    total_pooled_value: u64,
) -> Result<u64> {
    if total_shares == 0 {
        return Ok(0);
    }

    let value = (shares as u128)
        .checked_mul(total_pooled_value as u128)
        .ok_or(VaultError::Overflow)?
        .checked_div(total_shares as u128)
        .ok_or(VaultError::DivisionByZero)?;

    u64::try_from(value).map_err(|_| error!(VaultError::Overflow))
}

/// Pooled value per share, scaled by 1e9. 1:1 before the first deposit.
pub fn calculate_exchange_rate(total_shares: u64, total_pooled_value: u64) -> Result<u64> {
    if total_shares == 0 {
        return Ok(RATE_SCALE as u64);
    }

    let rate = (total_pooled_value as u128)
        .checked_mul(RATE_SCALE)
        .ok_or(VaultError::Overflow)?
        .checked_div(total_shares as u128)
        .ok_or(VaultError::DivisionByZero)?;

    u64::try_from(rate).map_err(|_| error!(VaultError::Overflow))
}

// ========== LEDGER TRANSITIONS ==========

/// Mint shares for a submission of `value` underlying units. Returns the
/// minted share amount. The deposit cap is enforced here and only here;
/// accrual and reserve deposits may push the pool past it.
pub fn apply_submit(
    config: &mut VaultConfig,
    holder: &mut HolderAccount,
    value: u64,
) -> Result<u64> {
    require!(!config.paused, VaultError::ProtocolPaused);
    require!(!config.minting_paused, VaultError::MintingPaused);
    require!(value > 0, VaultError::ZeroDeposit);

    let new_pooled = config
        .total_pooled_value
        .checked_add(value)
        .ok_or(VaultError::Overflow)?;
    require!(new_pooled <= config.total_pooled_cap, VaultError::CapExceeded);

    let shares = calculate_value_to_shares(value, config.total_shares, config.total_pooled_value)?;

    config.total_pooled_value = new_pooled;
    config.total_shares = config
        .total_shares
        .checked_add(shares)
        .ok_or(VaultError::Overflow)?;
    holder.balance = holder.balance.checked_add(shares).ok_or(VaultError::Overflow)?;

    Ok(shares)
}

/// Move `amount` shares between holders. Shares locked in custody do not
/// travel; only the free balance is spendable.
pub fn apply_transfer(
    config: &VaultConfig,
    from: &mut HolderAccount,
    to: &mut HolderAccount,
    amount: u64,
) -> Result<()> {
    require!(!config.paused, VaultError::ProtocolPaused);
    require!(to.holder != Pubkey::default(), VaultError::ZeroAddress);
    require!(amount <= from.free_balance(), VaultError::InsufficientBalance);

    from.balance -= amount;
    to.balance = to.balance.checked_add(amount).ok_or(VaultError::Overflow)?;

    Ok(())
}

/// Spend from an approval, then move the shares. The allowance is checked
/// before the owner's balance, so an over-allowance transfer reports
/// `InsufficientAllowance` even when the balance would also be short.
pub fn apply_transfer_from(
    config: &VaultConfig,
    allowance: &mut AllowanceAccount,
    from: &mut HolderAccount,
    to: &mut HolderAccount,
    amount: u64,
) -> Result<()> {
    require!(!config.paused, VaultError::ProtocolPaused);
    require!(amount <= allowance.amount, VaultError::InsufficientAllowance);

    apply_transfer(config, from, to, amount)?;
    allowance.amount -= amount;

    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::*;

    pub fn config() -> VaultConfig {
        VaultConfig {
            underlying_mint: Pubkey::new_unique(),
            vault_token_account: Pubkey::new_unique(),
            total_pooled_value: 0,
            total_shares: 0,
            total_pooled_cap: u64::MAX,
            cooldown_period: 60 * 60 * 24 * 15,
            redeem_period: 60 * 60 * 24 * 2,
            paused: false,
            minting_paused: false,
            protocol_reward_recipient: Pubkey::new_unique(),
            protocol_reward_share: 100_000_000, // 10%
            pause_administrators: vec![],
            manager_administrators: vec![],
            rewards_administrators: vec![],
            bump: 255,
        }
    }

    pub fn holder() -> HolderAccount {
        HolderAccount {
            holder: Pubkey::new_unique(),
            balance: 0,
            shares_in_custody: 0,
            bump: 255,
        }
    }

    pub fn allowance(owner: Pubkey, spender: Pubkey, amount: u64) -> AllowanceAccount {
        AllowanceAccount {
            owner,
            spender,
            amount,
            bump: 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_deposit_bootstraps_one_to_one() {
        assert_eq!(calculate_value_to_shares(100, 0, 0).unwrap(), 100);
        assert_eq!(calculate_exchange_rate(0, 0).unwrap(), RATE_SCALE as u64);
    }

    #[test]
    fn conversions_follow_the_pool_rate() {
        // pool appreciated: 200 value backing 100 shares
        assert_eq!(calculate_value_to_shares(50, 100, 200).unwrap(), 25);
        assert_eq!(calculate_shares_to_value(25, 100, 200).unwrap(), 50);
        assert_eq!(calculate_exchange_rate(100, 200).unwrap(), 2_000_000_000);
    }

    #[test]
    fn conversion_rejects_empty_pool_with_outstanding_shares() {
        assert_eq!(
            calculate_value_to_shares(50, 100, 0).unwrap_err(),
            VaultError::DivisionByZero.into()
        );
    }

    #[test]
    fn shares_to_value_is_zero_without_supply() {
        assert_eq!(calculate_shares_to_value(50, 0, 0).unwrap(), 0);
    }

    #[test]
    fn submit_mints_at_the_bootstrap_rate() {
        let mut config = testing::config();
        let mut holder = testing::holder();

        let shares = apply_submit(&mut config, &mut holder, 100).unwrap();

        assert_eq!(shares, 100);
        assert_eq!(holder.balance, 100);
        assert_eq!(config.total_shares, 100);
        assert_eq!(config.total_pooled_value, 100);
    }

    #[test]
    fn submit_rejects_zero_deposit() {
        let mut config = testing::config();
        let mut holder = testing::holder();

        let result = apply_submit(&mut config, &mut holder, 0);

        assert_eq!(result.unwrap_err(), VaultError::ZeroDeposit.into());
        assert_eq!(config.total_pooled_value, 0);
        assert_eq!(config.total_shares, 0);
        assert_eq!(holder.balance, 0);
    }

    #[test]
    fn submit_enforces_the_pooled_cap() {
        let mut config = testing::config();
        config.total_pooled_cap = 150;
        let mut holder = testing::holder();

        apply_submit(&mut config, &mut holder, 100).unwrap();
        let result = apply_submit(&mut config, &mut holder, 51);

        assert_eq!(result.unwrap_err(), VaultError::CapExceeded.into());
        assert_eq!(config.total_pooled_value, 100);
    }

    #[test]
    fn submit_respects_the_minting_pause() {
        let mut config = testing::config();
        config.minting_paused = true;
        let mut holder = testing::holder();

        let result = apply_submit(&mut config, &mut holder, 100);

        assert_eq!(result.unwrap_err(), VaultError::MintingPaused.into());
    }

    #[test]
    fn submit_respects_the_global_pause() {
        let mut config = testing::config();
        config.paused = true;
        let mut holder = testing::holder();

        let result = apply_submit(&mut config, &mut holder, 100);

        assert_eq!(result.unwrap_err(), VaultError::ProtocolPaused.into());
    }

    #[test]
    fn submit_mints_proportionally_after_accrual() {
        let mut config = testing::config();
        let mut holder = testing::holder();

        apply_submit(&mut config, &mut holder, 100).unwrap();
        // pool appreciates without new shares
        config.total_pooled_value += 100;

        let shares = apply_submit(&mut config, &mut holder, 50).unwrap();

        // 50 * 100 / 200
        assert_eq!(shares, 25);
        assert_eq!(config.total_shares, 125);
        assert_eq!(config.total_pooled_value, 250);
    }

    #[test]
    fn transfer_moves_free_shares() {
        let config = testing::config();
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 100;

        apply_transfer(&config, &mut from, &mut to, 75).unwrap();

        assert_eq!(from.balance, 25);
        assert_eq!(to.balance, 75);
    }

    #[test]
    fn transfer_rejects_the_zero_address() {
        let config = testing::config();
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 100;
        to.holder = Pubkey::default();

        let result = apply_transfer(&config, &mut from, &mut to, 1);

        assert_eq!(result.unwrap_err(), VaultError::ZeroAddress.into());
    }

    #[test]
    fn transfer_excludes_custody_from_the_spendable_balance() {
        let config = testing::config();
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 100;
        from.shares_in_custody = 60;

        assert_eq!(
            apply_transfer(&config, &mut from, &mut to, 41).unwrap_err(),
            VaultError::InsufficientBalance.into()
        );

        apply_transfer(&config, &mut from, &mut to, 40).unwrap();
        assert_eq!(from.balance, 60);
        assert_eq!(from.free_balance(), 0);
    }

    #[test]
    fn transfer_rejects_while_paused() {
        let mut config = testing::config();
        config.paused = true;
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 100;

        let result = apply_transfer(&config, &mut from, &mut to, 10);

        assert_eq!(result.unwrap_err(), VaultError::ProtocolPaused.into());
    }

    #[test]
    fn transfer_from_checks_allowance_before_balance() {
        let config = testing::config();
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 100;
        let mut allowance = testing::allowance(from.holder, Pubkey::new_unique(), 1000);

        // exceeds both allowance and balance: the allowance error wins
        assert_eq!(
            apply_transfer_from(&config, &mut allowance, &mut from, &mut to, 1234).unwrap_err(),
            VaultError::InsufficientAllowance.into()
        );
        // within allowance but over balance
        assert_eq!(
            apply_transfer_from(&config, &mut allowance, &mut from, &mut to, 150).unwrap_err(),
            VaultError::InsufficientBalance.into()
        );

        apply_transfer_from(&config, &mut allowance, &mut from, &mut to, 75).unwrap();
        assert_eq!(from.balance, 25);
        assert_eq!(to.balance, 75);
        assert_eq!(allowance.amount, 925);
    }

    #[test]
    fn failed_transfer_from_leaves_the_allowance_untouched() {
        let config = testing::config();
        let mut from = testing::holder();
        let mut to = testing::holder();
        from.balance = 10;
        let mut allowance = testing::allowance(from.holder, Pubkey::new_unique(), 50);

        let result = apply_transfer_from(&config, &mut allowance, &mut from, &mut to, 20);

        assert_eq!(result.unwrap_err(), VaultError::InsufficientBalance.into());
        assert_eq!(allowance.amount, 50);
    }

    proptest! {
        /// The sum of holder balances tracks the share supply across any
        /// sequence of submissions and transfers.
        #[test]
        fn balances_sum_to_total_shares(
            deposits in proptest::collection::vec(1u64..1_000_000, 1..8),
            moved in 0u64..1_000_000,
        ) {
            let mut config = testing::config();
            let mut alice = testing::holder();
            let mut bob = testing::holder();

            for value in &deposits {
                apply_submit(&mut config, &mut alice, *value).unwrap();
            }
            let _ = apply_transfer(&config, &mut alice, &mut bob, moved);

            prop_assert_eq!(alice.balance + bob.balance, config.total_shares);
        }

        /// Minting never grows faster than the deposited value once the pool
        /// has appreciated.
        #[test]
        fn appreciated_pool_never_overmints(
            value in 1u64..1_000_000,
            appreciation in 1u64..1_000_000,
        ) {
            let mut config = testing::config();
            let mut holder = testing::holder();
            apply_submit(&mut config, &mut holder, 1_000).unwrap();
            config.total_pooled_value += appreciation;

            let shares = apply_submit(&mut config, &mut holder, value).unwrap();

            prop_assert!(shares <= value);
        }
    }
}
