use thiserror::Error;

use fortune_wheel_common::selector::SelectorError;

/// Errors raised on a spin trigger path. Rejections carry no side effects:
/// no sequence counter advances and no ledger append happens.
#[derive(Error, Debug)]
pub enum SpinError {
    #[error("a spin is already in progress")]
    AlreadySpinning,

    #[error("no eligible holders available")]
    NoHolders,

    #[error("selection failed: {0}")]
    Selection(#[from] SelectorError),
}

/// Errors from the distribution state machine.
#[derive(Error, Debug)]
pub enum DistributeError {
    #[error("no operator signing key configured")]
    NotConfigured,

    #[error("claim service unavailable: {reason}")]
    ClaimUnavailable { reason: String },

    #[error("payout of {lamports} lamports cannot cover hop network fees")]
    TransferTooSmall { lamports: u64 },

    #[error("invalid recipient address: {address}")]
    InvalidRecipient { address: String },

    #[error("network failure during {step}: {reason}")]
    NetworkFailure { step: String, reason: String },
}
