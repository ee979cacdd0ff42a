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

use core::cmp::Ordering;

use sha2::{Digest, Sha256};
use stellar_strkey::Strkey;

use crate::xdr::{
    AccountId, AlphaNum12, AlphaNum4, Asset, AssetCode, AssetCode12, AssetCode4,
    ChangeTrustAsset, ClaimableBalanceId, Hash, Limits, LiquidityPoolConstantProductParameters,
    LiquidityPoolParameters, MuxedAccount, MuxedAccountMed25519, PoolId, PublicKey, ReadXdr,
    SignerKey, TrustLineAsset, Uint256, WriteXdr,
};
use crate::FixtureError;

/// Constant product pool fee in basis points
pub const LIQUIDITY_POOL_FEE: i32 = 30;

pub fn account_id(address: &str) -> Result<AccountId, FixtureError> {
    let key = stellar_strkey::ed25519::PublicKey::from_string(address)
        .map_err(|_| FixtureError::StrKey(address.to_string()))?;
    Ok(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key.0))))
}

/// Parse either a `G...` or a `M...` address
pub fn muxed_account(address: &str) -> Result<MuxedAccount, FixtureError> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(key)) => Ok(MuxedAccount::Ed25519(Uint256(key.0))),
        Ok(Strkey::MuxedAccountEd25519(muxed)) => {
            Ok(MuxedAccount::MuxedEd25519(MuxedAccountMed25519 {
                id: muxed.id,
                ed25519: Uint256(muxed.ed25519),
            }))
        }
        _ => Err(FixtureError::StrKey(address.to_string())),
    }
}

/// Parse a `G...`, `T...` or `X...` signer
pub fn signer_key(address: &str) -> Result<SignerKey, FixtureError> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(key)) => Ok(SignerKey::Ed25519(Uint256(key.0))),
        Ok(Strkey::PreAuthTx(key)) => Ok(SignerKey::PreAuthTx(Uint256(key.0))),
        Ok(Strkey::HashX(key)) => Ok(SignerKey::HashX(Uint256(key.0))),
        _ => Err(FixtureError::StrKey(address.to_string())),
    }
}

fn issuer_address(issuer: &AccountId) -> String {
    let AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key))) = issuer;
    stellar_strkey::ed25519::PublicKey(*key).to_string()
}

pub fn asset_code(code: &str) -> Result<AssetCode, FixtureError> {
    if code.is_empty() || code.len() > 12 || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(FixtureError::InvalidAssetCode(code.to_string()));
    }

    if code.len() <= 4 {
        let mut buf = [0u8; 4];
        buf[..code.len()].copy_from_slice(code.as_bytes());
        Ok(AssetCode::CreditAlphanum4(AssetCode4(buf)))
    } else {
        let mut buf = [0u8; 12];
        buf[..code.len()].copy_from_slice(code.as_bytes());
        Ok(AssetCode::CreditAlphanum12(AssetCode12(buf)))
    }
}

pub fn native() -> Asset {
    Asset::Native
}

/// Issued asset. Codes of up to 4 characters are alphanum4, longer ones alphanum12.
pub fn credit(code: &str, issuer: &str) -> Result<Asset, FixtureError> {
    let issuer = account_id(issuer)?;
    Ok(match asset_code(code)? {
        AssetCode::CreditAlphanum4(asset_code) => {
            Asset::CreditAlphanum4(AlphaNum4 { asset_code, issuer })
        }
        AssetCode::CreditAlphanum12(asset_code) => {
            Asset::CreditAlphanum12(AlphaNum12 { asset_code, issuer })
        }
    })
}

fn code_str(code: &[u8]) -> &[u8] {
    let end = code.iter().position(|b| *b == 0).unwrap_or(code.len());
    &code[..end]
}

fn sort_key(asset: &Asset) -> (u8, Vec<u8>, String) {
    match asset {
        Asset::Native => (0, vec![], String::new()),
        Asset::CreditAlphanum4(a) => (1, code_str(&a.asset_code.0).to_vec(), issuer_address(&a.issuer)),
        Asset::CreditAlphanum12(a) => (2, code_str(&a.asset_code.0).to_vec(), issuer_address(&a.issuer)),
    }
}

/// Lexicographic asset order: native, then alphanum4, then alphanum12; within a type by code
/// and then by issuer address
pub fn compare_assets(a: &Asset, b: &Asset) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

pub fn change_trust_asset(asset: &Asset) -> ChangeTrustAsset {
    match asset {
        Asset::Native => ChangeTrustAsset::Native,
        Asset::CreditAlphanum4(a) => ChangeTrustAsset::CreditAlphanum4(a.clone()),
        Asset::CreditAlphanum12(a) => ChangeTrustAsset::CreditAlphanum12(a.clone()),
    }
}

pub fn trust_line_asset(asset: &Asset) -> TrustLineAsset {
    match asset {
        Asset::Native => TrustLineAsset::Native,
        Asset::CreditAlphanum4(a) => TrustLineAsset::CreditAlphanum4(a.clone()),
        Asset::CreditAlphanum12(a) => TrustLineAsset::CreditAlphanum12(a.clone()),
    }
}

/// Constant product liquidity pool share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPoolAsset {
    asset_a: Asset,
    asset_b: Asset,
    fee: i32,
}

impl LiquidityPoolAsset {
    pub fn new(asset_a: Asset, asset_b: Asset, fee: i32) -> Result<Self, FixtureError> {
        if compare_assets(&asset_a, &asset_b) != Ordering::Less {
            return Err(FixtureError::AssetOrder);
        }
        if fee != LIQUIDITY_POOL_FEE {
            return Err(FixtureError::InvalidFee(format!(
                "liquidity pool fee must be {}",
                LIQUIDITY_POOL_FEE
            )));
        }

        Ok(LiquidityPoolAsset {
            asset_a,
            asset_b,
            fee,
        })
    }

    pub fn parameters(&self) -> LiquidityPoolParameters {
        LiquidityPoolParameters::LiquidityPoolConstantProduct(LiquidityPoolConstantProductParameters {
            asset_a: self.asset_a.clone(),
            asset_b: self.asset_b.clone(),
            fee: self.fee,
        })
    }

    /// SHA-256 of the XDR encoded pool parameters
    pub fn pool_id(&self) -> Result<PoolId, FixtureError> {
        let bytes = self.parameters().to_xdr(Limits::none())?;
        Ok(PoolId(Hash(Sha256::digest(&bytes).into())))
    }

    pub fn change_trust_asset(&self) -> ChangeTrustAsset {
        ChangeTrustAsset::PoolShare(self.parameters())
    }

    pub fn trust_line_asset(&self) -> Result<TrustLineAsset, FixtureError> {
        Ok(TrustLineAsset::PoolShare(self.pool_id()?))
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, FixtureError> {
    hex::decode(s).map_err(|_| FixtureError::InvalidHex(s.to_string()))
}

pub fn pool_id_from_hex(s: &str) -> Result<PoolId, FixtureError> {
    let bytes: [u8; 32] = decode_hex(s)?
        .try_into()
        .map_err(|_| FixtureError::InvalidHex(s.to_string()))?;
    Ok(PoolId(Hash(bytes)))
}

/// Balance ids are hex encoded XDR, including the leading type discriminant
pub fn claimable_balance_id(s: &str) -> Result<ClaimableBalanceId, FixtureError> {
    Ok(ClaimableBalanceId::from_xdr(decode_hex(s)?, Limits::none())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC_ISSUER: &str = "GATEMHCCKCY67ZUCKTROYN24ZYT5GK4EQZ65JJLDHKHRUZI3EUEKMTCH";
    const USDC_ISSUER: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";

    #[test]
    fn test_asset_code_width() {
        assert!(matches!(
            credit("BTC", BTC_ISSUER).unwrap(),
            Asset::CreditAlphanum4(_)
        ));
        assert!(matches!(
            credit("USDC", BTC_ISSUER).unwrap(),
            Asset::CreditAlphanum4(_)
        ));
        assert!(matches!(
            credit("PANDA", BTC_ISSUER).unwrap(),
            Asset::CreditAlphanum12(_)
        ));
        assert!(matches!(
            credit("BANANANANANA", BTC_ISSUER).unwrap(),
            Asset::CreditAlphanum12(_)
        ));
    }

    #[test]
    fn test_invalid_asset() {
        assert!(matches!(
            credit("", BTC_ISSUER),
            Err(FixtureError::InvalidAssetCode(_))
        ));
        assert!(matches!(
            credit("BANANANANANAS", BTC_ISSUER),
            Err(FixtureError::InvalidAssetCode(_))
        ));
        assert!(matches!(
            credit("US-D", BTC_ISSUER),
            Err(FixtureError::InvalidAssetCode(_))
        ));
        assert!(matches!(
            credit("USD", "GDGUPDK4V7Z6ERQMROUA2Q5LYT344VY2JQ5K5QH6GS5KCPTH5F6AYCW"),
            Err(FixtureError::StrKey(_))
        ));
    }

    #[test]
    fn test_asset_order() {
        let btc = credit("BTC", BTC_ISSUER).unwrap();
        let usdc = credit("USDC", USDC_ISSUER).unwrap();
        let panda = credit("PANDA", BTC_ISSUER).unwrap();

        assert_eq!(compare_assets(&native(), &btc), Ordering::Less);
        assert_eq!(compare_assets(&btc, &usdc), Ordering::Less);
        assert_eq!(compare_assets(&usdc, &panda), Ordering::Less);
        assert_eq!(compare_assets(&btc, &btc), Ordering::Equal);

        let btc_other = credit("BTC", USDC_ISSUER).unwrap();
        // Same code, ordered by issuer address
        assert_eq!(compare_assets(&btc_other, &btc), Ordering::Less);
    }

    #[test]
    fn test_pool_id() {
        let btc = credit("BTC", BTC_ISSUER).unwrap();
        let usdc = credit("USDC", USDC_ISSUER).unwrap();

        let pool = LiquidityPoolAsset::new(btc.clone(), usdc.clone(), LIQUIDITY_POOL_FEE).unwrap();
        assert_eq!(
            hex::encode(pool.pool_id().unwrap().0 .0),
            "3aab0ed6d0b6f570c5b32b0339cc5930be36c4ae2c07697b70f11f9387e3f831"
        );

        assert!(matches!(
            LiquidityPoolAsset::new(usdc.clone(), btc, LIQUIDITY_POOL_FEE),
            Err(FixtureError::AssetOrder)
        ));
        assert!(matches!(
            LiquidityPoolAsset::new(usdc.clone(), usdc, LIQUIDITY_POOL_FEE),
            Err(FixtureError::AssetOrder)
        ));
    }

    #[test]
    fn test_claimable_balance_id() {
        let id = claimable_balance_id(
            "00000000da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be",
        )
        .unwrap();
        let ClaimableBalanceId::ClaimableBalanceIdTypeV0(Hash(hash)) = id;
        assert_eq!(hash[0], 0xda);

        assert!(claimable_balance_id("00zz").is_err());
    }

    #[test]
    fn test_signer_keys() {
        assert!(matches!(
            signer_key("XDNA2V62PVEFBZ74CDJKTUHLY4Y7PL5UAV2MAM4VWF6USFE3SH235FXL").unwrap(),
            SignerKey::HashX(_)
        ));
        assert!(matches!(
            signer_key("TDNA2V62PVEFBZ74CDJKTUHLY4Y7PL5UAV2MAM4VWF6USFE3SH234BSS").unwrap(),
            SignerKey::PreAuthTx(_)
        ));
        assert!(signer_key("SAIYWGGWU2WMXYDSK33UBQBMBDKU4TTJVY3ZIFF24H2KQDR7RQW5KAEK").is_err());
    }
}
