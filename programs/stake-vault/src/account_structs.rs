use crate::error::*;
use crate::queue::UnlockQueue;
use crate::rates::RateHistory;
use crate::state::*;
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[allow(deprecated)]
use anchor_lang::solana_program::bpf_loader_upgradeable::{self};

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = signer,
        space = VaultConfig::LEN,
        seeds = [b"vault_config"],
        bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        init,
        payer = signer,
        space = RateHistory::LEN,
        seeds = [b"rate_history"],
        bump
    )]
    pub rate_history: Account<'info, RateHistory>,

    /// CHECK: This is a PDA that acts as vault authority, validated by seeds constraint.
    /// It becomes the owner of the vault token account so that only this
    /// program can move the underlying reserve.
    #[account(
        seeds = [b"vault_authority"],
        bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    /// The token account that holds the vault's underlying reserve
    #[account(
        mut,
        constraint = vault_token_account.mint == underlying_mint.key() @ VaultError::InvalidMint,
        constraint = (vault_token_account.owner == signer.key() || vault_token_account.owner == vault_authority.key()) @ VaultError::InvalidVaultAuthority
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    pub underlying_mint: Account<'info, Mint>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,

    /// CHECK: This is the program data account that contains the update authority
    #[account(
        constraint = program_data.key() == get_program_data_address(&crate::id()) @ VaultError::InvalidProgramData
    )]
    pub program_data: UncheckedAccount<'info>,
}

#[derive(Accounts)]
pub struct Submit<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        init_if_needed,
        payer = signer,
        space = HolderAccount::LEN,
        seeds = [b"holder", signer.key().as_ref()],
        bump
    )]
    pub holder_account: Account<'info, HolderAccount>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault_config.vault_token_account @ VaultError::InvalidVaultTokenAccount
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        token::mint = vault_config.underlying_mint,
        constraint = user_token_account.owner == signer.key() @ VaultError::InvalidTokenOwner
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(recipient: Pubkey)]
pub struct TransferShares<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"holder", signer.key().as_ref()],
        bump = from_holder.bump
    )]
    pub from_holder: Account<'info, HolderAccount>,

    // A holder ledger entry is one PDA per holder, so a self-transfer would
    // pass the same account twice and the second write-back would clobber
    // the first.
    #[account(
        init_if_needed,
        payer = signer,
        space = HolderAccount::LEN,
        seeds = [b"holder", recipient.as_ref()],
        bump,
        constraint = to_holder.key() != from_holder.key() @ VaultError::SelfTransfer
    )]
    pub to_holder: Account<'info, HolderAccount>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(spender: Pubkey)]
pub struct Approve<'info> {
    #[account(
        init_if_needed,
        payer = signer,
        space = AllowanceAccount::LEN,
        seeds = [b"allowance", signer.key().as_ref(), spender.as_ref()],
        bump
    )]
    pub allowance: Account<'info, AllowanceAccount>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(owner: Pubkey, recipient: Pubkey)]
pub struct TransferFromShares<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"allowance", owner.as_ref(), signer.key().as_ref()],
        bump = allowance.bump
    )]
    pub allowance: Account<'info, AllowanceAccount>,

    #[account(
        mut,
        seeds = [b"holder", owner.as_ref()],
        bump = from_holder.bump
    )]
    pub from_holder: Account<'info, HolderAccount>,

    #[account(
        init_if_needed,
        payer = signer,
        space = HolderAccount::LEN,
        seeds = [b"holder", recipient.as_ref()],
        bump,
        constraint = to_holder.key() != from_holder.key() @ VaultError::SelfTransfer
    )]
    pub to_holder: Account<'info, HolderAccount>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct RequestUnlock<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"holder", signer.key().as_ref()],
        bump = holder_account.bump
    )]
    pub holder_account: Account<'info, HolderAccount>,

    #[account(
        init_if_needed,
        payer = signer,
        space = UnlockQueue::LEN,
        seeds = [b"unlock_queue", signer.key().as_ref()],
        bump
    )]
    pub unlock_queue: Account<'info, UnlockQueue>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct CancelUnlockRequest<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"holder", signer.key().as_ref()],
        bump = holder_account.bump
    )]
    pub holder_account: Account<'info, HolderAccount>,

    #[account(
        mut,
        seeds = [b"unlock_queue", signer.key().as_ref()],
        bump = unlock_queue.bump
    )]
    pub unlock_queue: Account<'info, UnlockQueue>,

    pub signer: Signer<'info>,
}

#[derive(Accounts)]
pub struct Redeem<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"holder", signer.key().as_ref()],
        bump = holder_account.bump
    )]
    pub holder_account: Account<'info, HolderAccount>,

    #[account(
        mut,
        seeds = [b"unlock_queue", signer.key().as_ref()],
        bump = unlock_queue.bump
    )]
    pub unlock_queue: Account<'info, UnlockQueue>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault_config.vault_token_account @ VaultError::InvalidVaultTokenAccount
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// CHECK: This is a PDA vault authority, validated by seeds constraint
    #[account(
        seeds = [b"vault_authority"],
        bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = vault_config.underlying_mint,
        constraint = user_token_account.owner == signer.key() @ VaultError::InvalidTokenOwner
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub signer: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct RedeemOverdueShares<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"holder", signer.key().as_ref()],
        bump = holder_account.bump
    )]
    pub holder_account: Account<'info, HolderAccount>,

    #[account(
        mut,
        seeds = [b"unlock_queue", signer.key().as_ref()],
        bump = unlock_queue.bump
    )]
    pub unlock_queue: Account<'info, UnlockQueue>,

    pub signer: Signer<'info>,
}

#[derive(Accounts)]
pub struct AccrueRewards<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"rate_history"],
        bump = rate_history.bump
    )]
    pub rate_history: Account<'info, RateHistory>,

    #[account(mut)]
    pub admin: Signer<'info>,

    #[account(
        mut,
        token::mint = vault_config.underlying_mint,
        constraint = admin_token_account.owner == admin.key() @ VaultError::InvalidTokenOwner
    )]
    pub admin_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault_config.vault_token_account @ VaultError::InvalidVaultTokenAccount
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// Receives the protocol's cut of the accrued rewards. Required whenever
    /// the configured reward share is non-zero.
    #[account(
        mut,
        token::mint = vault_config.underlying_mint
    )]
    pub protocol_reward_token_account: Option<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct DepositReserve<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(mut)]
    pub admin: Signer<'info>,

    #[account(
        mut,
        token::mint = vault_config.underlying_mint,
        constraint = admin_token_account.owner == admin.key() @ VaultError::InvalidTokenOwner
    )]
    pub admin_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault_config.vault_token_account @ VaultError::InvalidVaultTokenAccount
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct WithdrawReserve<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        constraint = vault_token_account.key() == vault_config.vault_token_account @ VaultError::InvalidVaultTokenAccount
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// CHECK: This is a PDA vault authority, validated by seeds constraint
    #[account(
        seeds = [b"vault_authority"],
        bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(mut)]
    pub admin: Signer<'info>,

    #[account(
        mut,
        token::mint = vault_config.underlying_mint,
        constraint = admin_token_account.owner == admin.key() @ VaultError::InvalidTokenOwner
    )]
    pub admin_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct PauseControl<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    pub signer: Signer<'info>,
}

#[derive(Accounts)]
pub struct UpdateConfig<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    /// CHECK: This is the program data account that contains the update authority
    #[account(
        constraint = program_data.key() == get_program_data_address(&crate::id()) @ VaultError::InvalidProgramData
    )]
    pub program_data: UncheckedAccount<'info>,

    pub signer: Signer<'info>,
}

#[derive(Accounts)]
pub struct UpdateAdministrators<'info> {
    #[account(
        mut,
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    /// CHECK: This is the program data account that contains the update authority
    #[account(
        constraint = program_data.key() == get_program_data_address(&crate::id()) @ VaultError::InvalidProgramData
    )]
    pub program_data: UncheckedAccount<'info>,

    pub signer: Signer<'info>,
}

#[derive(Accounts)]
pub struct ConversionView<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,
}

#[derive(Accounts)]
pub struct RateView<'info> {
    #[account(
        seeds = [b"vault_config"],
        bump = vault_config.bump
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        seeds = [b"rate_history"],
        bump = rate_history.bump
    )]
    pub rate_history: Account<'info, RateHistory>,
}

// Helper function to derive the program data address
fn get_program_data_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0
}
