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

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod apdu;

pub const HARDENED_FLAG: u32 = 0x80000000;

pub const MAX_BIP32_PATH: usize = 10;

/// Purpose and coin type of every Stellar derivation path (`44'/148'`)
pub const STELLAR_COIN_TYPE: u32 = 148;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    NanoS,
    NanoSP,
    NanoX,
}

impl DeviceModel {
    pub const ALL: [DeviceModel; 3] = [DeviceModel::NanoS, DeviceModel::NanoSP, DeviceModel::NanoX];

    /// Name used by the simulator's `--model` flag and by the build directories
    pub fn name(&self) -> &'static str {
        match self {
            DeviceModel::NanoS => "nanos",
            DeviceModel::NanoSP => "nanosp",
            DeviceModel::NanoX => "nanox",
        }
    }

    /// Prefix of the golden snapshot directories
    pub fn prefix(&self) -> &'static str {
        match self {
            DeviceModel::NanoS => "s",
            DeviceModel::NanoSP => "sp",
            DeviceModel::NanoX => "x",
        }
    }

    pub fn screen_size(&self) -> (u32, u32) {
        match self {
            DeviceModel::NanoS => (128, 32),
            DeviceModel::NanoSP | DeviceModel::NanoX => (128, 64),
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceModel::ALL
            .into_iter()
            .find(|m| m.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown device model `{}`", s))
    }
}

/// A BIP32 derivation path, e.g. `44'/148'/0'`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    /// `44'/148'/{account}'`
    pub fn stellar(account: u32) -> Self {
        Bip32Path(vec![
            44 | HARDENED_FLAG,
            STELLAR_COIN_TYPE | HARDENED_FLAG,
            account | HARDENED_FLAG,
        ])
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Account index of a `44'/148'/x'` path
    pub fn stellar_account(&self) -> Option<u32> {
        match self.0.as_slice() {
            [purpose, coin, account]
                if *purpose == 44 | HARDENED_FLAG
                    && *coin == STELLAR_COIN_TYPE | HARDENED_FLAG
                    && account & HARDENED_FLAG != 0 =>
            {
                Some(account & !HARDENED_FLAG)
            }
            _ => None,
        }
    }

    /// Length byte followed by every component as a big-endian `u32`
    pub fn encode(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(1 + self.0.len() * 4);
        v.push(self.0.len() as u8);
        for c in &self.0 {
            v.extend_from_slice(&c.to_be_bytes());
        }
        v
    }

    /// Returns the path and the number of bytes consumed
    pub fn decode(data: &[u8]) -> Result<(Self, usize), DeviceError> {
        let len = *data.first().ok_or(DeviceError::WrongDataLength)? as usize;
        if len == 0 || len > MAX_BIP32_PATH || data.len() < 1 + len * 4 {
            return Err(DeviceError::WrongDataLength);
        }

        let components = data[1..1 + len * 4]
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok((Bip32Path(components), 1 + len * 4))
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .0
            .iter()
            .map(|c| match c & HARDENED_FLAG {
                0 => c.to_string(),
                _ => format!("{}'", c & !HARDENED_FLAG),
            })
            .collect::<Vec<_>>();
        f.write_str(&parts.join("/"))
    }
}

impl FromStr for Bip32Path {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("m/").unwrap_or(s);
        let components = s
            .split('/')
            .map(|part| {
                let (num, hardened) = match part.strip_suffix('\'') {
                    Some(num) => (num, true),
                    None => (part, false),
                };
                let num = num
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid path component `{}`", part))?;
                if num & HARDENED_FLAG != 0 {
                    return Err(format!("Path component out of range `{}`", part));
                }
                Ok(if hardened { num | HARDENED_FLAG } else { num })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if components.is_empty() || components.len() > MAX_BIP32_PATH {
            return Err(format!("Invalid path length {}", components.len()));
        }
        Ok(Bip32Path(components))
    }
}

/// Requests the test driver sends to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    GetPublicKey { path: Bip32Path, display: bool },
    SignHash { path: Bip32Path, hash: [u8; 32] },
    SignTransaction { path: Bip32Path, data: Vec<u8> },
    GetAppConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    PublicKey([u8; 32]),
    Signature(Vec<u8>),
    AppConfiguration { hash_signing: bool, version: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceError {
    UserRejected,
    HashSigningNotAllowed,
    ParsingFailed,
    WrongDataLength,
    UnknownInstruction,
    WrongClass,
    BadState,
    MalformedReply,
    Status(u16),
}

impl DeviceError {
    pub fn from_status(sw: u16) -> Self {
        match sw {
            apdu::SW_DENY => DeviceError::UserRejected,
            apdu::SW_TX_HASH_SIGNING_MODE_NOT_ENABLED => DeviceError::HashSigningNotAllowed,
            apdu::SW_TX_PARSING_FAIL => DeviceError::ParsingFailed,
            apdu::SW_WRONG_DATA_LENGTH => DeviceError::WrongDataLength,
            apdu::SW_INS_NOT_SUPPORTED => DeviceError::UnknownInstruction,
            apdu::SW_CLA_NOT_SUPPORTED => DeviceError::WrongClass,
            apdu::SW_BAD_STATE => DeviceError::BadState,
            sw => DeviceError::Status(sw),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            DeviceError::UserRejected => apdu::SW_DENY,
            DeviceError::HashSigningNotAllowed => apdu::SW_TX_HASH_SIGNING_MODE_NOT_ENABLED,
            DeviceError::ParsingFailed => apdu::SW_TX_PARSING_FAIL,
            DeviceError::WrongDataLength | DeviceError::MalformedReply => {
                apdu::SW_WRONG_DATA_LENGTH
            }
            DeviceError::UnknownInstruction => apdu::SW_INS_NOT_SUPPORTED,
            DeviceError::WrongClass => apdu::SW_CLA_NOT_SUPPORTED,
            DeviceError::BadState => apdu::SW_BAD_STATE,
            DeviceError::Status(sw) => *sw,
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::UserRejected => write!(f, "Transaction approval request was rejected"),
            DeviceError::HashSigningNotAllowed => write!(f, "Hash signing not allowed"),
            DeviceError::ParsingFailed => write!(f, "Transaction parsing failed"),
            DeviceError::MalformedReply => write!(f, "Malformed reply from the device"),
            other => write!(f, "Device error {:?} (0x{:04X})", other, other.status()),
        }
    }
}

impl std::error::Error for DeviceError {}
