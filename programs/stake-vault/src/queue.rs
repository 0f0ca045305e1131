use anchor_lang::prelude::*;

use crate::error::VaultError;
use crate::state::{calculate_shares_to_value, HolderAccount, VaultConfig};

pub const MAX_UNLOCK_REQUESTS: usize = 32; // per-holder queue capacity

/// A pending withdrawal. `locked_value` is fixed from the pool rate at
/// creation and never revisited; rewards accrued while the request waits
/// belong to the remaining shareholders.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnlockRequest {
    pub locked_value: u64,
    pub share_amount: u64,
    pub created_at: i64,
}

impl UnlockRequest {
    pub const LEN: usize = 8 + 8 + 8;
}

/// Ordered unlock requests of one holder. Requests are addressed by index,
/// and removal is swap-remove: the last entry moves into the vacated slot.
/// Indices are therefore not stable across removals and must be re-read
/// before every call.
#[account]
pub struct UnlockQueue {
    pub holder: Pubkey,
    pub requests: Vec<UnlockRequest>,
    pub bump: u8,
}

impl UnlockQueue {
    pub const LEN: usize = 8 + 32 + (4 + MAX_UNLOCK_REQUESTS * UnlockRequest::LEN) + 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Cooldown still running.
    Pending,
    /// Cooldown elapsed, inside the redemption window.
    Redeemable,
    /// Redemption window lapsed unredeemed.
    Overdue,
}

/// Time classification of a request. Pure so the windows can be exercised
/// with an injected clock; every request-touching operation starts here.
pub fn classify(
    request: &UnlockRequest,
    cooldown_period: i64,
    redeem_period: i64,
    now: i64,
) -> RequestState {
    let redeemable_at = request.created_at.saturating_add(cooldown_period);
    let overdue_after = redeemable_at.saturating_add(redeem_period);

    if now < redeemable_at {
        RequestState::Pending
    } else if now <= overdue_after {
        RequestState::Redeemable
    } else {
        RequestState::Overdue
    }
}

/// Move `share_amount` from the holder's free balance into custody and
/// append a request carrying the pooled value those shares are worth right
/// now. Shares are not burned yet, so the totals are untouched.
pub fn apply_request_unlock(
    config: &VaultConfig,
    holder: &mut HolderAccount,
    queue: &mut UnlockQueue,
    share_amount: u64,
    now: i64,
) -> Result<UnlockRequest> {
    require!(!config.paused, VaultError::ProtocolPaused);
    require!(share_amount > 0, VaultError::InvalidAmount);
    require!(
        share_amount <= holder.free_balance(),
        VaultError::AmountTooLarge
    );
    require!(
        queue.requests.len() < MAX_UNLOCK_REQUESTS,
        VaultError::UnlockQueueFull
    );

    let locked_value =
        calculate_shares_to_value(share_amount, config.total_shares, config.total_pooled_value)?;

    holder.shares_in_custody = holder
        .shares_in_custody
        .checked_add(share_amount)
        .ok_or(VaultError::Overflow)?;

    let request = UnlockRequest {
        locked_value,
        share_amount,
        created_at: now,
    };
    queue.requests.push(request);

    Ok(request)
}

/// Return the shares of a not-yet-overdue request to the free balance and
/// drop the entry. An overdue request can only leave through
/// `apply_redeem_overdue`.
pub fn apply_cancel(
    config: &VaultConfig,
    holder: &mut HolderAccount,
    queue: &mut UnlockQueue,
    index: u64,
    now: i64,
) -> Result<UnlockRequest> {
    require!(!config.paused, VaultError::ProtocolPaused);
    let index = checked_index(queue, index)?;

    let request = queue.requests[index];
    require!(
        classify(&request, config.cooldown_period, config.redeem_period, now)
            != RequestState::Overdue,
        VaultError::Expired
    );

    holder.shares_in_custody = holder
        .shares_in_custody
        .checked_sub(request.share_amount)
        .ok_or(VaultError::Overflow)?;
    queue.requests.swap_remove(index);

    Ok(request)
}

/// Burn the shares of a redeemable request and settle its locked value
/// against the pool. Returns the removed request; the caller pays
/// `locked_value` out of the reserve.
pub fn apply_redeem(
    config: &mut VaultConfig,
    holder: &mut HolderAccount,
    queue: &mut UnlockQueue,
    index: Option<u64>,
    now: i64,
) -> Result<UnlockRequest> {
    require!(!config.paused, VaultError::ProtocolPaused);
    let index = match index {
        Some(index) => {
            let index = checked_index(queue, index)?;
            let request = &queue.requests[index];
            match classify(request, config.cooldown_period, config.redeem_period, now) {
                RequestState::Pending => return err!(VaultError::NotYetRedeemable),
                RequestState::Overdue => return err!(VaultError::WindowExpired),
                RequestState::Redeemable => index,
            }
        }
        None => earliest_in_state(config, queue, RequestState::Redeemable, now)
            .ok_or(VaultError::NotYetRedeemable)?,
    };

    let request = queue.requests[index];

    holder.balance = holder
        .balance
        .checked_sub(request.share_amount)
        .ok_or(VaultError::Overflow)?;
    holder.shares_in_custody = holder
        .shares_in_custody
        .checked_sub(request.share_amount)
        .ok_or(VaultError::Overflow)?;
    config.total_shares = config
        .total_shares
        .checked_sub(request.share_amount)
        .ok_or(VaultError::Overflow)?;
    config.total_pooled_value = config
        .total_pooled_value
        .checked_sub(request.locked_value)
        .ok_or(VaultError::Overflow)?;
    queue.requests.swap_remove(index);

    Ok(request)
}

/// Release an overdue request's shares back to the free balance. The locked
/// value is discarded: after the window lapses the holder is re-exposed to
/// the live rate instead of a stale payout.
pub fn apply_redeem_overdue(
    config: &VaultConfig,
    holder: &mut HolderAccount,
    queue: &mut UnlockQueue,
    index: Option<u64>,
    now: i64,
) -> Result<UnlockRequest> {
    require!(!config.paused, VaultError::ProtocolPaused);
    let index = match index {
        Some(index) => {
            let index = checked_index(queue, index)?;
            let request = &queue.requests[index];
            require!(
                classify(request, config.cooldown_period, config.redeem_period, now)
                    == RequestState::Overdue,
                VaultError::NotOverdue
            );
            index
        }
        None => earliest_in_state(config, queue, RequestState::Overdue, now)
            .ok_or(VaultError::NotOverdue)?,
    };

    let request = queue.requests[index];

    holder.shares_in_custody = holder
        .shares_in_custody
        .checked_sub(request.share_amount)
        .ok_or(VaultError::Overflow)?;
    queue.requests.swap_remove(index);

    Ok(request)
}

fn checked_index(queue: &UnlockQueue, index: u64) -> Result<usize> {
    let index = usize::try_from(index).map_err(|_| error!(VaultError::InvalidIndex))?;
    require!(index < queue.requests.len(), VaultError::InvalidIndex);
    Ok(index)
}

/// Index of the earliest-created request in `state`, if any. An empty queue
/// reports `InvalidIndex` at the call sites, so `None` here means "nothing
/// eligible yet" rather than "nothing at all".
fn earliest_in_state(
    config: &VaultConfig,
    queue: &UnlockQueue,
    state: RequestState,
    now: i64,
) -> Option<usize> {
    queue
        .requests
        .iter()
        .enumerate()
        .filter(|(_, request)| {
            classify(request, config.cooldown_period, config.redeem_period, now) == state
        })
        .min_by_key(|(_, request)| request.created_at)
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{apply_submit, testing};
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000;

    fn queue_for(holder: &HolderAccount) -> UnlockQueue {
        UnlockQueue {
            holder: holder.holder,
            requests: vec![],
            bump: 255,
        }
    }

    /// A funded vault: one holder with `value` submitted at 1:1.
    fn funded(value: u64) -> (VaultConfig, HolderAccount, UnlockQueue) {
        let mut config = testing::config();
        let mut holder = testing::holder();
        apply_submit(&mut config, &mut holder, value).unwrap();
        let queue = queue_for(&holder);
        (config, holder, queue)
    }

    #[test]
    fn classify_walks_the_request_lifecycle() {
        let request = UnlockRequest {
            locked_value: 10,
            share_amount: 10,
            created_at: NOW,
        };
        let cooldown = 100;
        let redeem = 50;

        assert_eq!(classify(&request, cooldown, redeem, NOW), RequestState::Pending);
        assert_eq!(
            classify(&request, cooldown, redeem, NOW + 99),
            RequestState::Pending
        );
        assert_eq!(
            classify(&request, cooldown, redeem, NOW + 100),
            RequestState::Redeemable
        );
        assert_eq!(
            classify(&request, cooldown, redeem, NOW + 150),
            RequestState::Redeemable
        );
        assert_eq!(
            classify(&request, cooldown, redeem, NOW + 151),
            RequestState::Overdue
        );
    }

    #[test]
    fn request_unlock_locks_value_at_the_current_rate() {
        let (config, mut holder, mut queue) = funded(100);

        let request = apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        assert_eq!(request.share_amount, 50);
        assert_eq!(request.locked_value, 50);
        assert_eq!(request.created_at, NOW);
        assert_eq!(holder.shares_in_custody, 50);
        assert_eq!(holder.balance, 100);
        assert_eq!(holder.free_balance(), 50);
        // shares are not burned yet
        assert_eq!(config.total_shares, 100);
        assert_eq!(config.total_pooled_value, 100);
    }

    #[test]
    fn request_unlock_validates_the_share_amount() {
        let (config, mut holder, mut queue) = funded(100);

        assert_eq!(
            apply_request_unlock(&config, &mut holder, &mut queue, 0, NOW).unwrap_err(),
            VaultError::InvalidAmount.into()
        );
        assert_eq!(
            apply_request_unlock(&config, &mut holder, &mut queue, 1000, NOW).unwrap_err(),
            VaultError::AmountTooLarge.into()
        );
        assert_eq!(holder.shares_in_custody, 0);
        assert!(queue.requests.is_empty());
    }

    #[test]
    fn request_unlock_counts_custody_against_the_free_balance() {
        let (config, mut holder, mut queue) = funded(100);

        apply_request_unlock(&config, &mut holder, &mut queue, 80, NOW).unwrap();

        assert_eq!(
            apply_request_unlock(&config, &mut holder, &mut queue, 21, NOW).unwrap_err(),
            VaultError::AmountTooLarge.into()
        );
        apply_request_unlock(&config, &mut holder, &mut queue, 20, NOW).unwrap();
        assert_eq!(holder.shares_in_custody, 100);
    }

    #[test]
    fn request_unlock_caps_the_queue_length() {
        let (config, mut holder, mut queue) = funded(MAX_UNLOCK_REQUESTS as u64 + 1);

        for _ in 0..MAX_UNLOCK_REQUESTS {
            apply_request_unlock(&config, &mut holder, &mut queue, 1, NOW).unwrap();
        }

        assert_eq!(
            apply_request_unlock(&config, &mut holder, &mut queue, 1, NOW).unwrap_err(),
            VaultError::UnlockQueueFull.into()
        );
    }

    #[test]
    fn accrual_never_changes_a_locked_value() {
        let (mut config, mut holder, mut queue) = funded(100);

        let request = apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();
        assert_eq!(request.locked_value, 50);

        // pool appreciates while the request waits
        config.total_pooled_value += 900;

        assert_eq!(queue.requests[0].locked_value, 50);
        // a fresh request sees the new rate
        let later = apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW + 1).unwrap();
        assert_eq!(later.locked_value, 500);
    }

    #[test]
    fn cancel_restores_the_free_balance_exactly() {
        let (config, mut holder, mut queue) = funded(100);
        let free_before = holder.free_balance();

        apply_request_unlock(&config, &mut holder, &mut queue, 100, NOW).unwrap();
        assert_eq!(holder.free_balance(), 0);

        let removed = apply_cancel(&config, &mut holder, &mut queue, 0, NOW + 1).unwrap();

        assert_eq!(removed.share_amount, 100);
        assert_eq!(holder.free_balance(), free_before);
        assert_eq!(holder.shares_in_custody, 0);
        assert!(queue.requests.is_empty());
    }

    #[test]
    fn cancel_validates_the_index() {
        let (config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 10, NOW).unwrap();

        assert_eq!(
            apply_cancel(&config, &mut holder, &mut queue, 1, NOW).unwrap_err(),
            VaultError::InvalidIndex.into()
        );
    }

    #[test]
    fn cancel_rejects_an_overdue_request() {
        let (config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 10, NOW).unwrap();

        let past_window = NOW + config.validity_window() + 1;
        let result = apply_cancel(&config, &mut holder, &mut queue, 0, past_window);

        assert_eq!(result.unwrap_err(), VaultError::Expired.into());
        assert_eq!(holder.shares_in_custody, 10);
        assert_eq!(queue.requests.len(), 1);
    }

    #[test]
    fn cancel_swap_removes_from_the_middle() {
        let (config, mut holder, mut queue) = funded(100);
        for (offset, amount) in [(0, 10u64), (1, 20), (2, 30), (3, 40)] {
            apply_request_unlock(&config, &mut holder, &mut queue, amount, NOW + offset).unwrap();
        }
        let before = queue.requests.clone();

        let removed = apply_cancel(&config, &mut holder, &mut queue, 1, NOW + 10).unwrap();

        // [A, B, C, D] -> [A, D, C]: the last entry fills the vacated slot
        assert_eq!(removed, before[1]);
        assert_eq!(queue.requests.len(), 3);
        assert_eq!(queue.requests[0], before[0]);
        assert_eq!(queue.requests[1], before[3]);
        assert_eq!(queue.requests[2], before[2]);
        assert_eq!(holder.shares_in_custody, 80);
    }

    #[test]
    fn redeem_pays_the_locked_value_and_burns_shares() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let at = NOW + config.cooldown_period;
        let request = apply_redeem(&mut config, &mut holder, &mut queue, Some(0), at).unwrap();

        assert_eq!(request.locked_value, 50);
        assert_eq!(request.share_amount, 50);
        assert_eq!(holder.balance, 50);
        assert_eq!(holder.shares_in_custody, 0);
        assert_eq!(holder.free_balance(), 50);
        assert_eq!(config.total_shares, 50);
        assert_eq!(config.total_pooled_value, 50);
        assert!(queue.requests.is_empty());
    }

    #[test]
    fn redeem_validates_the_index() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        assert_eq!(
            apply_redeem(&mut config, &mut holder, &mut queue, Some(42), NOW).unwrap_err(),
            VaultError::InvalidIndex.into()
        );
    }

    #[test]
    fn redeem_enforces_the_cooldown() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let early = NOW + config.cooldown_period - 1;
        let result = apply_redeem(&mut config, &mut holder, &mut queue, Some(0), early);

        assert_eq!(result.unwrap_err(), VaultError::NotYetRedeemable.into());
        assert_eq!(config.total_shares, 100);
    }

    #[test]
    fn redeem_enforces_the_redemption_window() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let late = NOW + config.validity_window() + 1;
        let result = apply_redeem(&mut config, &mut holder, &mut queue, Some(0), late);

        assert_eq!(result.unwrap_err(), VaultError::WindowExpired.into());
        assert_eq!(holder.shares_in_custody, 50);
    }

    #[test]
    fn redeem_without_an_index_picks_the_earliest_redeemable() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 10, NOW).unwrap();
        apply_request_unlock(&config, &mut holder, &mut queue, 20, NOW + 5).unwrap();
        apply_request_unlock(&config, &mut holder, &mut queue, 30, NOW + 10).unwrap();

        // only the two oldest have cleared their cooldown
        let at = NOW + config.cooldown_period + 5;
        let request = apply_redeem(&mut config, &mut holder, &mut queue, None, at).unwrap();

        assert_eq!(request.share_amount, 10);
        assert_eq!(queue.requests.len(), 2);
    }

    #[test]
    fn redeem_without_an_index_needs_an_eligible_request() {
        let (mut config, mut holder, mut queue) = funded(100);

        // empty queue
        assert_eq!(
            apply_redeem(&mut config, &mut holder, &mut queue, None, NOW).unwrap_err(),
            VaultError::NotYetRedeemable.into()
        );

        apply_request_unlock(&config, &mut holder, &mut queue, 10, NOW).unwrap();
        assert_eq!(
            apply_redeem(&mut config, &mut holder, &mut queue, None, NOW + 1).unwrap_err(),
            VaultError::NotYetRedeemable.into()
        );
    }

    #[test]
    fn overdue_redeem_returns_shares_without_payout() {
        let (config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let late = NOW + config.validity_window() + 1;
        let request =
            apply_redeem_overdue(&config, &mut holder, &mut queue, Some(0), late).unwrap();

        assert_eq!(request.share_amount, 50);
        assert_eq!(holder.balance, 100);
        assert_eq!(holder.shares_in_custody, 0);
        assert_eq!(holder.free_balance(), 100);
        // no burn, no payout
        assert_eq!(config.total_shares, 100);
        assert_eq!(config.total_pooled_value, 100);
        assert!(queue.requests.is_empty());
    }

    #[test]
    fn overdue_redeem_rejects_a_request_still_in_its_window() {
        let (config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let in_window = NOW + config.validity_window();
        let result = apply_redeem_overdue(&config, &mut holder, &mut queue, Some(0), in_window);

        assert_eq!(result.unwrap_err(), VaultError::NotOverdue.into());
    }

    #[test]
    fn overdue_redeem_without_an_index_picks_the_earliest_overdue() {
        let (config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 10, NOW).unwrap();
        apply_request_unlock(&config, &mut holder, &mut queue, 20, NOW + 5).unwrap();

        let late = NOW + config.validity_window() + 3;
        let request = apply_redeem_overdue(&config, &mut holder, &mut queue, None, late).unwrap();

        assert_eq!(request.share_amount, 10);
        assert_eq!(queue.requests.len(), 1);
    }

    #[test]
    fn expired_then_overdue_flow_matches_the_window_contract() {
        let (mut config, mut holder, mut queue) = funded(100);
        apply_request_unlock(&config, &mut holder, &mut queue, 50, NOW).unwrap();

        let late = NOW + config.validity_window() + 1;
        assert_eq!(
            apply_redeem(&mut config, &mut holder, &mut queue, Some(0), late).unwrap_err(),
            VaultError::WindowExpired.into()
        );
        apply_redeem_overdue(&config, &mut holder, &mut queue, Some(0), late).unwrap();
        assert_eq!(holder.free_balance(), 100);
    }

    proptest! {
        /// Request-then-cancel is a no-op on the holder's spendable shares.
        #[test]
        fn unlock_cancel_round_trip(amount in 1u64..=1_000) {
            let (config, mut holder, mut queue) = funded(1_000);
            let free_before = holder.free_balance();

            apply_request_unlock(&config, &mut holder, &mut queue, amount, NOW).unwrap();
            apply_cancel(&config, &mut holder, &mut queue, 0, NOW + 1).unwrap();

            prop_assert_eq!(holder.free_balance(), free_before);
            prop_assert_eq!(holder.shares_in_custody, 0);
        }

        /// Custody always equals the sum of the queued share amounts.
        #[test]
        fn custody_tracks_the_queue(
            amounts in proptest::collection::vec(1u64..50, 1..10),
            removals in proptest::collection::vec(0usize..10, 0..5),
        ) {
            let (config, mut holder, mut queue) = funded(1_000);

            for amount in &amounts {
                apply_request_unlock(&config, &mut holder, &mut queue, *amount, NOW).unwrap();
            }
            for index in &removals {
                let _ = apply_cancel(&config, &mut holder, &mut queue, *index as u64, NOW + 1);
            }

            let queued: u64 = queue.requests.iter().map(|r| r.share_amount).sum();
            prop_assert_eq!(holder.shares_in_custody, queued);
            prop_assert!(holder.shares_in_custody <= holder.balance);
        }
    }
}
