use anchor_lang::prelude::*;

use crate::error::VaultError;
use crate::state::{VaultConfig, RATE_SCALE};

// Sized for one accrual per hour across the longest supported
// cooldown-plus-redemption window before pruning catches up.
pub const MAX_RATE_ENTRIES: usize = 128;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateEntry {
    pub timestamp: i64,
    pub total_pooled_value: u64,
    pub total_shares: u64,
}

impl RateEntry {
    pub const LEN: usize = 8 + 8 + 8;
}

/// Append-only, self-pruning history of pool snapshots, one per accrual.
/// Entries stay until no outstanding unlock request created against them can
/// still be inside its cooldown-plus-redemption validity window.
#[account]
pub struct RateHistory {
    pub entries: Vec<RateEntry>,
    pub bump: u8,
}

impl RateHistory {
    pub const LEN: usize = 8 + (4 + MAX_RATE_ENTRIES * RateEntry::LEN) + 1;

    pub fn record(&mut self, timestamp: i64, total_pooled_value: u64, total_shares: u64) {
        if self.entries.len() == MAX_RATE_ENTRIES {
            // mis-configured accrual cadence; shed the oldest snapshot
            self.entries.remove(0);
        }
        self.entries.push(RateEntry {
            timestamp,
            total_pooled_value,
            total_shares,
        });
    }

    /// Prefix-trim every entry older than `now - validity_window`. Entries
    /// are time-ordered, so this stops at the first still-valid one and
    /// costs O(expired), not O(total). Returns the number removed.
    pub fn prune_expired(&mut self, now: i64, validity_window: i64) -> usize {
        let cutoff = now.saturating_sub(validity_window);
        let expired = self
            .entries
            .iter()
            .take_while(|entry| entry.timestamp < cutoff)
            .count();
        self.entries.drain(..expired);
        expired
    }

    /// Most recent snapshot at or before `now`. Callers fall back to the
    /// live pool state when the history has nothing this old.
    pub fn rate_at(&self, now: i64) -> Option<&RateEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.timestamp <= now)
    }
}

/// Grow the pool by an accrued reward, net of the protocol fee, and snapshot
/// the new rate. Share supply is untouched, so every future unlock sees the
/// higher rate while already-locked requests keep their value. Returns
/// `(net_increase, protocol_fee)` for the caller to settle in underlying
/// units.
pub fn apply_accrue(
    config: &mut VaultConfig,
    rates: &mut RateHistory,
    amount: u64,
    now: i64,
) -> Result<(u64, u64)> {
    require!(!config.paused, VaultError::ProtocolPaused);
    require!(amount > 0, VaultError::InvalidAmount);

    let fee = (amount as u128)
        .checked_mul(config.protocol_reward_share as u128)
        .ok_or(VaultError::Overflow)?
        .checked_div(RATE_SCALE)
        .ok_or(VaultError::DivisionByZero)?;
    let fee = u64::try_from(fee).map_err(|_| error!(VaultError::Overflow))?;
    let net = amount.checked_sub(fee).ok_or(VaultError::Overflow)?;

    // the cap binds submissions only; accrual may push the pool past it
    config.total_pooled_value = config
        .total_pooled_value
        .checked_add(net)
        .ok_or(VaultError::Overflow)?;

    rates.prune_expired(now, config.validity_window());
    rates.record(now, config.total_pooled_value, config.total_shares);

    Ok((net, fee))
}
