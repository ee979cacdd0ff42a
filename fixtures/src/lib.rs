// Stellar hardware wallet app test harness and supporting libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Deterministic Stellar transaction fixtures
//!
//! Every entry of [`catalog::CATALOG`] builds one unsigned transaction from the fixed
//! [`context::FixtureContext`]. The exporter writes the signature base of each entry to
//! `<name>.raw`, where the name is derived from the entry identifier by
//! [`naming::file_name`].

use core::fmt;

pub use stellar_xdr::curr as xdr;

pub mod amount;
pub mod asset;
pub mod builder;
pub mod catalog;
pub mod context;
pub mod export;
pub mod naming;

pub use builder::{BuiltTransaction, TransactionBuilder};
pub use catalog::{FixtureEntry, CATALOG};
pub use context::{FixtureContext, Keypair, Network};

#[derive(Debug)]
pub enum FixtureError {
    Xdr(xdr::Error),
    StrKey(String),
    InvalidAmount(String),
    InvalidPrice(String),
    InvalidAssetCode(String),
    InvalidHex(String),
    InvalidFee(String),
    /// Liquidity pool assets must be given in lexicographic order
    AssetOrder,
    NoOperations,
    TooManyOperations,
    /// Fee bumps can only wrap a plain transaction
    NestedFeeBump,
    UnknownEntry(String),
    Io(std::io::Error),
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureError::Xdr(e) => write!(f, "XDR error: {}", e),
            FixtureError::StrKey(s) => write!(f, "Invalid strkey `{}`", s),
            FixtureError::InvalidAmount(s) => write!(f, "Invalid amount `{}`", s),
            FixtureError::InvalidPrice(s) => write!(f, "Invalid price `{}`", s),
            FixtureError::InvalidAssetCode(s) => write!(f, "Invalid asset code `{}`", s),
            FixtureError::InvalidHex(s) => write!(f, "Invalid hex string `{}`", s),
            FixtureError::InvalidFee(s) => write!(f, "Invalid fee: {}", s),
            FixtureError::AssetOrder => write!(f, "Assets are not in lexicographic order"),
            FixtureError::NoOperations => write!(f, "Transaction has no operations"),
            FixtureError::TooManyOperations => write!(f, "Too many operations"),
            FixtureError::NestedFeeBump => write!(f, "Cannot fee bump a fee bump transaction"),
            FixtureError::UnknownEntry(s) => write!(f, "Unknown fixture `{}`", s),
            FixtureError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FixtureError {}

impl From<xdr::Error> for FixtureError {
    fn from(e: xdr::Error) -> Self {
        FixtureError::Xdr(e)
    }
}

impl From<std::io::Error> for FixtureError {
    fn from(e: std::io::Error) -> Self {
        FixtureError::Io(e)
    }
}
