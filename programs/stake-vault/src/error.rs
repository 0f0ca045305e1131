use anchor_lang::prelude::*;

#[error_code]
pub enum VaultError {
    #[msg("Zero deposit")]
    ZeroDeposit = 1,
    #[msg("Total pooled value cap exceeded")]
    CapExceeded = 2,
    #[msg("Minting is paused")]
    MintingPaused = 3,
    #[msg("Protocol is paused")]
    ProtocolPaused = 4,
    #[msg("Protocol is already paused")]
    AlreadyPaused = 5,
    #[msg("Protocol is not paused")]
    NotPaused = 6,
    #[msg("Minting is already paused")]
    MintingAlreadyPaused = 7,
    #[msg("Minting is not paused")]
    MintingNotPaused = 8,

    #[msg("Zero address")]
    ZeroAddress = 9,
    #[msg("Insufficient balance")]
    InsufficientBalance = 10,
    #[msg("Transfer amount exceeds allowance")]
    InsufficientAllowance = 11,
    #[msg("Transfer to self is not supported")]
    SelfTransfer = 12,

    #[msg("Invalid amount")]
    InvalidAmount = 13,
    #[msg("Unlock amount too large")]
    AmountTooLarge = 14,
    #[msg("Invalid unlock request index")]
    InvalidIndex = 15,
    #[msg("Unlock request is not redeemable")]
    NotYetRedeemable = 16,
    #[msg("Unlock request redemption window has expired")]
    WindowExpired = 17,
    #[msg("Unlock request is not overdue")]
    NotOverdue = 18,
    #[msg("Unlock request is expired")]
    Expired = 19,
    #[msg("Unlock request queue is full")]
    UnlockQueueFull = 20,

    #[msg("Zero value")]
    ZeroValue = 21,
    #[msg("Invalid protocol reward share")]
    InvalidRewardShare = 22,
    #[msg("Invalid period")]
    InvalidPeriod = 23,

    #[msg("Caller lacks the required capability")]
    Forbidden = 24,
    #[msg("Too many administrators.")]
    TooManyAdministrators = 25,
    #[msg("ProgramData account did not match expected PDA.")]
    InvalidProgramData = 26,
    #[msg("Program has no upgrade authority (set to None).")]
    NoUpgradeAuthority = 27,
    #[msg("Signer is not the upgrade authority.")]
    InvalidUpgradeAuthority = 28,

    #[msg("Invalid mint provided")]
    InvalidMint = 29,
    #[msg("Invalid vault token account")]
    InvalidVaultTokenAccount = 30,
    #[msg("Invalid vault authority")]
    InvalidVaultAuthority = 31,
    #[msg("Invalid token owner")]
    InvalidTokenOwner = 32,
    #[msg("Invalid protocol reward recipient account")]
    InvalidRewardRecipient = 33,

    #[msg("Arithmetic overflow")]
    Overflow = 34,
    #[msg("Division by zero error")]
    DivisionByZero = 35,
}
