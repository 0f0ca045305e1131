use anchor_lang::prelude::*;
use anchor_lang::solana_program::bpf_loader_upgradeable::UpgradeableLoaderState;

use crate::error::VaultError;

/// Admin setters are reserved for the program's upgrade authority. The
/// ProgramData account carries the authority; it is bincode-encoded by the
/// upgradeable loader.
pub fn validate_program_update_authority(
    program_data: &UncheckedAccount,
    signer: &Signer,
) -> Result<()> {
    let data = program_data.try_borrow_data()?;
    let state: UpgradeableLoaderState =
        bincode::deserialize(&data[..]).map_err(|_| error!(VaultError::InvalidProgramData))?;

    match state {
        UpgradeableLoaderState::ProgramData {
            upgrade_authority_address,
            ..
        } => {
            let authority =
                upgrade_authority_address.ok_or(error!(VaultError::NoUpgradeAuthority))?;
            require_keys_eq!(authority, signer.key(), VaultError::InvalidUpgradeAuthority);
            Ok(())
        }
        _ => err!(VaultError::InvalidProgramData),
    }
}

/// Capability gate for the privileged operations: the caller must appear in
/// the relevant administrator list.
pub fn require_capability(administrators: &[Pubkey], caller: &Pubkey) -> Result<()> {
    require!(administrators.contains(caller), VaultError::Forbidden);
    Ok(())
}
