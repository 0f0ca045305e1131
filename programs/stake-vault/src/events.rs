use anchor_lang::prelude::*;

#[event]
pub struct Submitted {
    pub user: Pubkey,
    pub value_amount: u64,
    pub share_amount: u64,
    pub total_pooled_value: u64,
    pub total_shares: u64,
}

#[event]
pub struct ShareTransferred {
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
}

#[event]
pub struct ShareApproved {
    pub owner: Pubkey,
    pub spender: Pubkey,
    pub amount: u64,
}

#[event]
pub struct UnlockRequested {
    pub user: Pubkey,
    pub share_amount: u64,
    pub locked_value: u64,
    pub created_at: i64,
}

#[event]
pub struct UnlockCancelled {
    pub user: Pubkey,
    pub locked_value: u64,
    pub share_amount: u64,
}

#[event]
pub struct Redeemed {
    pub user: Pubkey,
    pub locked_value: u64,
    pub shares_burned: u64,
    pub total_pooled_value: u64,
    pub total_shares: u64,
}

#[event]
pub struct OverdueSharesRedeemed {
    pub user: Pubkey,
    pub share_amount: u64,
}

#[event]
pub struct RewardsAccrued {
    pub admin: Pubkey,
    pub net_amount: u64,
    pub protocol_fee_amount: u64,
    pub total_pooled_value: u64,
    pub total_shares: u64,
}

#[event]
pub struct Deposited {
    pub admin: Pubkey,
    pub value_amount: u64,
}

#[event]
pub struct Withdrawn {
    pub admin: Pubkey,
    pub amount: u64,
}

#[event]
pub struct VaultPaused {
    pub admin: Pubkey,
}

#[event]
pub struct VaultResumed {
    pub admin: Pubkey,
}

#[event]
pub struct MintingPaused {
    pub admin: Pubkey,
}

#[event]
pub struct MintingResumed {
    pub admin: Pubkey,
}

#[event]
pub struct CooldownPeriodUpdated {
    pub admin: Pubkey,
    pub old_period: i64,
    pub new_period: i64,
}

#[event]
pub struct RedeemPeriodUpdated {
    pub admin: Pubkey,
    pub old_period: i64,
    pub new_period: i64,
}

#[event]
pub struct TotalPooledCapUpdated {
    pub admin: Pubkey,
    pub old_cap: u64,
    pub new_cap: u64,
}

#[event]
pub struct ProtocolRewardDataUpdated {
    pub admin: Pubkey,
    pub recipient: Pubkey,
    pub reward_share: u64,
}
