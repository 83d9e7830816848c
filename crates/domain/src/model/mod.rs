//! Data structures and helpers shared across the API and notifier crates.

mod classification;
mod event;

pub use classification::{ConfirmationPolicy, IgnoreReason, NotificationKind, NotificationState};
pub use event::{
    Block, ContractLog, Erc20Transfer, InternalTransaction, MalformedEventError, NativeTransaction,
    NftTransfer, TriggeredBy, WebhookEvent,
};

use std::fmt;

use thiserror::Error;

/// Number of hex characters following the `0x` prefix of an EVM address.
pub const ADDRESS_HEX_LENGTH: usize = 40;

/// Errors emitted when a user-supplied address fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressFormatError {
    #[error("address must start with `0x`")]
    MissingPrefix,
    #[error("address must contain exactly {ADDRESS_HEX_LENGTH} hex characters after `0x`")]
    WrongLength,
    #[error("address contains non-hex characters")]
    NonHex,
}

/// Validates the `0x` + 40 hex-character contract.
pub fn validate_address(address: &str) -> Result<(), AddressFormatError> {
    let Some(digits) = address.strip_prefix("0x") else {
        return Err(AddressFormatError::MissingPrefix);
    };

    if digits.len() != ADDRESS_HEX_LENGTH {
        return Err(AddressFormatError::WrongLength);
    }

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressFormatError::NonHex);
    }

    Ok(())
}

/// Canonical form used for every registry write and lookup.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// A validated, normalized watch address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchedAddress(String);

impl WatchedAddress {
    pub fn parse(address: &str) -> Result<Self, AddressFormatError> {
        let trimmed = address.trim();
        validate_address(trimmed)?;
        Ok(Self(normalize_address(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for WatchedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContactFormatError {
    #[error("email address is not valid")]
    InvalidEmail,
}

/// Subscriber contact identity (an email address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactEmail(String);

impl ContactEmail {
    pub fn parse(email: &str) -> Result<Self, ContactFormatError> {
        let trimmed = email.trim();
        if !validator::validate_email(trimmed) {
            return Err(ContactFormatError::InvalidEmail);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for ContactEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
