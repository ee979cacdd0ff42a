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

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::builder::TransactionBuilder;
use crate::xdr::{
    AccountId, DecoratedSignature, Hash, MuxedAccount, MuxedAccountMed25519, PublicKey,
    Signature, SignatureHint, Uint256,
};
use crate::FixtureError;

/// Mnemonic the fixture keys are derived from (`m/44'/148'/{0,1,2}'`)
pub const APP_SEED: &str =
    "other base behind follow wet put glad muscle unlock sell income october";

pub const KP0_SECRET: &str = "SAIYWGGWU2WMXYDSK33UBQBMBDKU4TTJVY3ZIFF24H2KQDR7RQW5KAEK";
pub const KP1_SECRET: &str = "SAE52G23WPAS7MIR2OFGILLICLXXR4K6HSXZHMKD6C33JCAVVILIWYAA";
pub const KP2_SECRET: &str = "SCGYXI6ZHWGD5EPFCFVH37EUHA5BIFNJQJGPMXDKHD4DYA3N2MXMA3NI";

/// Sequence number of the source account. Built transactions use the next one.
pub const ACCOUNT_SEQUENCE: i64 = 103720918407102567;
pub const MEMO_TEXT: &str = "hello world";
/// 2022-12-12T04:12:12+00:00
pub const MAX_TIME: u64 = 1670818332;
pub const BASE_FEE: u32 = 100;
/// Id of the multiplexed destinations
pub const MUXED_ID: u64 = 10000;

pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Public,
    Testnet,
}

impl Network {
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Public => PUBLIC_PASSPHRASE,
            Network::Testnet => TESTNET_PASSPHRASE,
        }
    }

    pub fn id(&self) -> Hash {
        Hash(Sha256::digest(self.passphrase().as_bytes()).into())
    }
}

#[derive(Debug, Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn from_secret(secret: &str) -> Result<Self, FixtureError> {
        let key = stellar_strkey::ed25519::PrivateKey::from_string(secret)
            .map_err(|_| FixtureError::StrKey(secret.to_string()))?;

        Ok(Keypair {
            signing: SigningKey::from_bytes(&key.0),
        })
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// `G...` address
    pub fn address(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.public_key()).to_string()
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(self.public_key())))
    }

    pub fn muxed(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(self.public_key()))
    }

    pub fn muxed_with_id(&self, id: u64) -> MuxedAccount {
        MuxedAccount::MuxedEd25519(MuxedAccountMed25519 {
            id,
            ed25519: Uint256(self.public_key()),
        })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    /// Last four bytes of the public key
    pub fn hint(&self) -> SignatureHint {
        let pk = self.public_key();
        SignatureHint([pk[28], pk[29], pk[30], pk[31]])
    }

    pub fn sign_decorated(&self, message: &[u8]) -> Result<DecoratedSignature, FixtureError> {
        Ok(DecoratedSignature {
            hint: self.hint(),
            signature: Signature(self.sign(message).to_vec().try_into()?),
        })
    }
}

/// Immutable inputs shared by every fixture constructor
#[derive(Debug, Clone)]
pub struct FixtureContext {
    pub kp0: Keypair,
    pub kp1: Keypair,
    pub kp2: Keypair,
    pub sequence: i64,
    pub memo: &'static str,
    pub max_time: u64,
    pub base_fee: u32,
    pub network: Network,
}

impl FixtureContext {
    pub fn new() -> Result<Self, FixtureError> {
        Ok(FixtureContext {
            kp0: Keypair::from_secret(KP0_SECRET)?,
            kp1: Keypair::from_secret(KP1_SECRET)?,
            kp2: Keypair::from_secret(KP2_SECRET)?,
            sequence: ACCOUNT_SEQUENCE,
            memo: MEMO_TEXT,
            max_time: MAX_TIME,
            base_fee: BASE_FEE,
            network: Network::Public,
        })
    }

    /// Keypair derived at `m/44'/148'/{account}'`
    pub fn keypair(&self, account: u32) -> Option<&Keypair> {
        match account {
            0 => Some(&self.kp0),
            1 => Some(&self.kp1),
            2 => Some(&self.kp2),
            _ => None,
        }
    }

    /// Builder with `kp0` as source and the common memo, time bounds, fee and network
    pub fn builder(&self) -> Result<TransactionBuilder, FixtureError> {
        Ok(TransactionBuilder::new(self.kp0.muxed(), self.sequence + 1)
            .base_fee(self.base_fee)
            .network(self.network)
            .memo_text(self.memo)?
            .time_bounds(0, self.max_time))
    }
}
