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

//! The fixture catalog
//!
//! Each entry pairs a camelCase identifier with a pure constructor. The identifiers are
//! part of the on-disk contract: the exporter and the device tests both derive the file
//! and snapshot names from them.

use core::fmt;

use sha2::{Digest, Sha256};

use crate::amount::{parse_amount, parse_price};
use crate::asset::{
    change_trust_asset, claimable_balance_id, credit, native, pool_id_from_hex,
    signer_key, trust_line_asset, LiquidityPoolAsset, LIQUIDITY_POOL_FEE,
};
use crate::builder::{operation, BuiltTransaction};
use crate::context::{FixtureContext, Network, MUXED_ID};
use crate::naming;
use crate::xdr::{
    AccountId, AllowTrustOp, Asset, BeginSponsoringFutureReservesOp, BumpSequenceOp,
    ChangeTrustAsset, ChangeTrustOp, ClaimClaimableBalanceOp, ClaimPredicate, Claimant, ClaimantV0,
    ClawbackClaimableBalanceOp, ClawbackOp, CreateAccountOp, CreateClaimableBalanceOp,
    CreatePassiveSellOfferOp, DataValue, Duration, Hash, LedgerBounds, LedgerKey,
    LedgerKeyAccount, LedgerKeyClaimableBalance, LedgerKeyData, LedgerKeyLiquidityPool,
    LedgerKeyOffer, LedgerKeyTrustLine, LiquidityPoolDepositOp, LiquidityPoolWithdrawOp,
    ManageBuyOfferOp, ManageDataOp, ManageSellOfferOp, Memo, MuxedAccount, OperationBody,
    PathPaymentStrictReceiveOp, PathPaymentStrictSendOp, PaymentOp, PreconditionsV2,
    RevokeSponsorshipOp, RevokeSponsorshipOpSigner, SequenceNumber, SetOptionsOp,
    SetTrustLineFlagsOp, Signer, SignerKey, String32, String64, TimeBounds, TimePoint,
    TrustLineAsset, Uint256,
};
use crate::FixtureError;

const BTC_ISSUER: &str = "GATEMHCCKCY67ZUCKTROYN24ZYT5GK4EQZ65JJLDHKHRUZI3EUEKMTCH";
const BANANA_ISSUER: &str = "GCDGPFKW2LUJS2ESKAS42HGOKC6VWOKEJ44TQ3ZXZAMD4ZM5FVHJHPJS";
const USDC_ISSUER: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";
const PANDA_ISSUER: &str = "GDJVFDG5OCW5PYWHB64MGTHGFF57DRRJEDUEFDEL2SLNIOONHYJWHA3Z";
/// `m/44'/148'/3'` of the fixture mnemonic
const USD_ISSUER: &str = "GCPWZDBYNXVQYOKUWAL34ED3GDKD6UITURJP734A4DPB5EPDSXHAM3KX";

const BALANCE_ID: &str = "00000000da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be";
const POOL_ID: &str = "dd7b1ab831c273310ddbec6f97870aa83c2fbd78ce22aded37ecbf4f3380fac7";
const HASH_X_SIGNER: &str = "XDNA2V62PVEFBZ74CDJKTUHLY4Y7PL5UAV2MAM4VWF6USFE3SH235FXL";
const PRE_AUTH_TX_SIGNER: &str = "TDNA2V62PVEFBZ74CDJKTUHLY4Y7PL5UAV2MAM4VWF6USFE3SH234BSS";

const DATA_NAME: &str = "Ledger Stellar App abcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcda";
const DATA_VALUE: &str = "Hello Stellar! abcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcda";

const TRUST_LIMIT: &str = "922337203680.9999999";
const OFFER_AMOUNT: &str = "988448423.2134";
const OFFER_PRICE: &str = "0.0001234";
const BUY_AMOUNT: &str = "988448111.2222";
const BUY_PRICE: &str = "0.0001011";

const FLAG_AUTHORIZED: u32 = 1;
const FLAG_AUTHORIZED_TO_MAINTAIN_LIABILITIES: u32 = 2;
const FLAG_CLAWBACK_ENABLED: u32 = 4;

pub type Constructor = fn(&FixtureContext) -> Result<BuiltTransaction, FixtureError>;

#[derive(Clone, Copy)]
pub struct FixtureEntry {
    pub id: &'static str,
    pub build: Constructor,
}

impl FixtureEntry {
    pub const fn new(id: &'static str, build: Constructor) -> Self {
        FixtureEntry { id, build }
    }

    /// Kebab-case name shared by the fixture file and the golden snapshots
    pub fn name(&self) -> String {
        naming::file_name(self.id)
    }

    pub fn signature_base(&self, ctx: &FixtureContext) -> Result<Vec<u8>, FixtureError> {
        (self.build)(ctx)?.signature_base()
    }
}

impl fmt::Debug for FixtureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureEntry").field("id", &self.id).finish()
    }
}

pub fn find(id: &str) -> Option<&'static FixtureEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

/// Lookup by either the identifier or the derived name
pub fn find_by_name(name: &str) -> Option<&'static FixtureEntry> {
    find(name).or_else(|| CATALOG.iter().find(|e| e.name() == name))
}

fn btc() -> Result<Asset, FixtureError> {
    credit("BTC", BTC_ISSUER)
}

fn usdc() -> Result<Asset, FixtureError> {
    credit("USDC", USDC_ISSUER)
}

fn usd() -> Result<Asset, FixtureError> {
    credit("USD", USD_ISSUER)
}

fn panda() -> Result<Asset, FixtureError> {
    credit("PANDA", PANDA_ISSUER)
}

fn btc_usdc_pool() -> Result<LiquidityPoolAsset, FixtureError> {
    LiquidityPoolAsset::new(btc()?, usdc()?, LIQUIDITY_POOL_FEE)
}

fn muxed_kp1(ctx: &FixtureContext) -> MuxedAccount {
    ctx.kp1.muxed_with_id(MUXED_ID)
}

fn data_name() -> Result<String64, FixtureError> {
    Ok(String64(DATA_NAME.as_bytes().to_vec().try_into()?))
}

/// Common transaction with a single operation sourced by `kp0`
fn single(ctx: &FixtureContext, body: OperationBody) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .add_operation(operation(Some(ctx.kp0.muxed()), body))
        .build()
}

fn create_account_body(ctx: &FixtureContext) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::CreateAccount(CreateAccountOp {
        destination: ctx.kp1.account_id(),
        starting_balance: parse_amount("100")?,
    }))
}

fn payment(destination: MuxedAccount, asset: Asset) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::Payment(PaymentOp {
        destination,
        asset,
        amount: parse_amount("922337203685.4775807")?,
    }))
}

fn op_create_account(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, create_account_body(ctx)?)
}

fn op_payment_asset_native(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, payment(ctx.kp1.muxed(), native())?)
}

fn op_payment_asset_alphanum4(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, payment(ctx.kp1.muxed(), btc()?)?)
}

fn op_payment_asset_alphanum12(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        payment(ctx.kp1.muxed(), credit("BANANANANANA", BANANA_ISSUER)?)?,
    )
}

fn op_payment_with_muxed_destination(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, payment(muxed_kp1(ctx), native())?)
}

fn strict_receive(destination: MuxedAccount, path: Vec<Asset>) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::PathPaymentStrictReceive(
        PathPaymentStrictReceiveOp {
            send_asset: btc()?,
            send_max: parse_amount("1")?,
            destination,
            dest_asset: native(),
            dest_amount: parse_amount("123456789.334")?,
            path: path.try_into()?,
        },
    ))
}

fn op_path_payment_strict_receive(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_receive(ctx.kp1.muxed(), vec![usdc()?, panda()?])?)
}

fn op_path_payment_strict_receive_with_empty_path(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_receive(ctx.kp1.muxed(), vec![])?)
}

fn op_path_payment_strict_receive_with_muxed_destination(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_receive(muxed_kp1(ctx), vec![usdc()?, panda()?])?)
}

/// An offer id of zero creates an offer, an amount of zero deletes it
fn sell_offer(amount: &str, offer_id: i64) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::ManageSellOffer(ManageSellOfferOp {
        selling: btc()?,
        buying: native(),
        amount: parse_amount(amount)?,
        price: parse_price(OFFER_PRICE)?,
        offer_id,
    }))
}

fn op_manage_sell_offer_create(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, sell_offer(OFFER_AMOUNT, 0)?)
}

fn op_manage_sell_offer_update(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, sell_offer(OFFER_AMOUNT, 7123456)?)
}

fn op_manage_sell_offer_delete(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, sell_offer("0", 7123456)?)
}

fn op_create_passive_sell_offer(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::CreatePassiveSellOffer(CreatePassiveSellOfferOp {
            selling: btc()?,
            buying: native(),
            amount: parse_amount(OFFER_AMOUNT)?,
            price: parse_price(OFFER_PRICE)?,
        }),
    )
}

fn empty_set_options() -> SetOptionsOp {
    SetOptionsOp {
        inflation_dest: None,
        clear_flags: None,
        set_flags: None,
        master_weight: None,
        low_threshold: None,
        med_threshold: None,
        high_threshold: None,
        home_domain: None,
        signer: None,
    }
}

fn add_signer(ctx: &FixtureContext, key: SignerKey) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::SetOptions(SetOptionsOp {
            signer: Some(Signer { key, weight: 10 }),
            ..empty_set_options()
        }),
    )
}

fn all_set_options(ctx: &FixtureContext) -> Result<SetOptionsOp, FixtureError> {
    Ok(SetOptionsOp {
        inflation_dest: Some(ctx.kp1.account_id()),
        clear_flags: Some(8),
        set_flags: Some(1),
        master_weight: Some(255),
        low_threshold: Some(10),
        med_threshold: Some(20),
        high_threshold: Some(30),
        home_domain: Some(String32(b"stellar.org".to_vec().try_into()?)),
        signer: Some(Signer {
            key: SignerKey::Ed25519(Uint256(ctx.kp2.public_key())),
            weight: 10,
        }),
    })
}

fn op_set_options(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::SetOptions(all_set_options(ctx)?))
}

fn op_set_options_no_signer(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::SetOptions(SetOptionsOp {
            signer: None,
            ..all_set_options(ctx)?
        }),
    )
}

/// An empty home domain clears the current one
fn op_set_options_remove_home_domain(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::SetOptions(SetOptionsOp {
            home_domain: Some(String32(Vec::<u8>::new().try_into()?)),
            ..empty_set_options()
        }),
    )
}

fn op_set_options_with_empty_body(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::SetOptions(empty_set_options()))
}

fn op_set_options_add_public_key_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    add_signer(ctx, SignerKey::Ed25519(Uint256(ctx.kp1.public_key())))
}

fn op_set_options_add_hash_x_signer(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    add_signer(ctx, signer_key(HASH_X_SIGNER)?)
}

fn op_set_options_add_pre_auth_tx_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    add_signer(ctx, signer_key(PRE_AUTH_TX_SIGNER)?)
}

fn change_trust(line: ChangeTrustAsset, limit: &str) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::ChangeTrust(ChangeTrustOp {
        line,
        limit: parse_amount(limit)?,
    }))
}

fn op_change_trust_add_trust_line(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, change_trust(change_trust_asset(&usd()?), TRUST_LIMIT)?)
}

fn op_change_trust_remove_trust_line(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, change_trust(change_trust_asset(&usd()?), "0")?)
}

fn op_change_trust_pool_add_trust_line(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        change_trust(btc_usdc_pool()?.change_trust_asset(), TRUST_LIMIT)?,
    )
}

fn op_change_trust_pool_remove_trust_line(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, change_trust(btc_usdc_pool()?.change_trust_asset(), "0")?)
}

fn allow_trust(ctx: &FixtureContext, authorize: u32) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::AllowTrust(AllowTrustOp {
            trustor: ctx.kp1.account_id(),
            asset: crate::asset::asset_code("USD")?,
            authorize,
        }),
    )
}

fn op_allow_trust_deauthorize(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    allow_trust(ctx, 0)
}

fn op_allow_trust_authorize(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    allow_trust(ctx, FLAG_AUTHORIZED)
}

fn op_allow_trust_authorize_to_maintain_liabilities(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    allow_trust(ctx, FLAG_AUTHORIZED_TO_MAINTAIN_LIABILITIES)
}

fn op_account_merge(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::AccountMerge(ctx.kp1.muxed()))
}

fn op_account_merge_with_muxed_destination(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::AccountMerge(muxed_kp1(ctx)))
}

fn op_inflation(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::Inflation)
}

fn op_manage_data_add(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::ManageData(ManageDataOp {
            data_name: data_name()?,
            data_value: Some(DataValue(DATA_VALUE.as_bytes().to_vec().try_into()?)),
        }),
    )
}

fn op_manage_data_remove(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::ManageData(ManageDataOp {
            data_name: data_name()?,
            data_value: None,
        }),
    )
}

fn op_bump_sequence(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::BumpSequence(BumpSequenceOp {
            bump_to: SequenceNumber(i64::MAX),
        }),
    )
}

fn buy_offer(amount: &str, offer_id: i64) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::ManageBuyOffer(ManageBuyOfferOp {
        selling: btc()?,
        buying: native(),
        buy_amount: parse_amount(amount)?,
        price: parse_price(BUY_PRICE)?,
        offer_id,
    }))
}

fn op_manage_buy_offer_create(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, buy_offer(BUY_AMOUNT, 0)?)
}

fn op_manage_buy_offer_update(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, buy_offer(BUY_AMOUNT, 3523456)?)
}

fn op_manage_buy_offer_delete(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, buy_offer("0", 3523456)?)
}

fn strict_send(destination: MuxedAccount, path: Vec<Asset>) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::PathPaymentStrictSend(PathPaymentStrictSendOp {
        send_asset: btc()?,
        send_amount: parse_amount("0.985")?,
        destination,
        dest_asset: native(),
        dest_min: parse_amount("123456789.987")?,
        path: path.try_into()?,
    }))
}

fn op_path_payment_strict_send(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_send(ctx.kp1.muxed(), vec![usdc()?, panda()?])?)
}

fn op_path_payment_strict_send_with_empty_path(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_send(ctx.kp1.muxed(), vec![])?)
}

fn op_path_payment_strict_send_with_muxed_destination(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, strict_send(muxed_kp1(ctx), vec![usdc()?, panda()?])?)
}

fn claimant(destination: AccountId, predicate: ClaimPredicate) -> Claimant {
    Claimant::ClaimantTypeV0(ClaimantV0 {
        destination,
        predicate,
    })
}

fn create_claimable_balance(
    ctx: &FixtureContext,
    claimants: Vec<Claimant>,
) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::CreateClaimableBalance(CreateClaimableBalanceOp {
            asset: usd()?,
            amount: parse_amount("100")?,
            claimants: claimants.try_into()?,
        }),
    )
}

/// 2022-12-12T04:12:12+00:00, same as the transactions' upper time bound
const CLAIM_BEFORE_ABSOLUTE: i64 = 1670818332;
const CLAIM_BEFORE_RELATIVE: i64 = 3600;

fn op_create_claimable_balance(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    let predicate = ClaimPredicate::And(
        vec![
            ClaimPredicate::BeforeRelativeTime(2352354235232),
            ClaimPredicate::Not(Some(Box::new(ClaimPredicate::BeforeAbsoluteTime(
                12343433254,
            )))),
        ]
        .try_into()?,
    );

    create_claimable_balance(
        ctx,
        vec![
            claimant(ctx.kp1.account_id(), ClaimPredicate::Unconditional),
            claimant(ctx.kp2.account_id(), predicate),
        ],
    )
}

fn op_create_claimable_balance_predicate_or(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    let predicate = ClaimPredicate::Or(
        vec![
            ClaimPredicate::BeforeAbsoluteTime(CLAIM_BEFORE_ABSOLUTE),
            ClaimPredicate::BeforeRelativeTime(CLAIM_BEFORE_RELATIVE),
        ]
        .try_into()?,
    );
    create_claimable_balance(ctx, vec![claimant(ctx.kp1.account_id(), predicate)])
}

fn op_create_claimable_balance_predicate_not(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    let predicate = ClaimPredicate::Not(Some(Box::new(ClaimPredicate::BeforeRelativeTime(
        CLAIM_BEFORE_RELATIVE,
    ))));
    create_claimable_balance(ctx, vec![claimant(ctx.kp1.account_id(), predicate)])
}

fn op_create_claimable_balance_predicate_before_absolute_time(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    let predicate = ClaimPredicate::BeforeAbsoluteTime(CLAIM_BEFORE_ABSOLUTE);
    create_claimable_balance(ctx, vec![claimant(ctx.kp1.account_id(), predicate)])
}

fn op_create_claimable_balance_predicate_before_relative_time(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    let predicate = ClaimPredicate::BeforeRelativeTime(CLAIM_BEFORE_RELATIVE);
    create_claimable_balance(ctx, vec![claimant(ctx.kp1.account_id(), predicate)])
}

fn op_create_claimable_balance_multi_claimant(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    create_claimable_balance(
        ctx,
        vec![
            claimant(ctx.kp0.account_id(), ClaimPredicate::Unconditional),
            claimant(
                ctx.kp1.account_id(),
                ClaimPredicate::BeforeAbsoluteTime(CLAIM_BEFORE_ABSOLUTE),
            ),
            claimant(
                ctx.kp2.account_id(),
                ClaimPredicate::BeforeRelativeTime(CLAIM_BEFORE_RELATIVE),
            ),
        ],
    )
}

fn op_claim_claimable_balance(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::ClaimClaimableBalance(ClaimClaimableBalanceOp {
            balance_id: claimable_balance_id(BALANCE_ID)?,
        }),
    )
}

fn op_begin_sponsoring_future_reserves(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::BeginSponsoringFutureReserves(BeginSponsoringFutureReservesOp {
            sponsored_id: ctx.kp1.account_id(),
        }),
    )
}

fn op_end_sponsoring_future_reserves(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, OperationBody::EndSponsoringFutureReserves)
}

fn revoke_entry(ctx: &FixtureContext, key: LedgerKey) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::RevokeSponsorship(RevokeSponsorshipOp::LedgerEntry(key)),
    )
}

fn revoke_signer(ctx: &FixtureContext, signer_key: SignerKey) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::RevokeSponsorship(RevokeSponsorshipOp::Signer(RevokeSponsorshipOpSigner {
            account_id: ctx.kp1.account_id(),
            signer_key,
        })),
    )
}

fn op_revoke_sponsorship_account(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::Account(LedgerKeyAccount {
            account_id: ctx.kp1.account_id(),
        }),
    )
}

fn revoke_trust_line(ctx: &FixtureContext, asset: TrustLineAsset) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::Trustline(LedgerKeyTrustLine {
            account_id: ctx.kp1.account_id(),
            asset,
        }),
    )
}

fn op_revoke_sponsorship_trust_line(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    revoke_trust_line(ctx, trust_line_asset(&btc()?))
}

fn op_revoke_sponsorship_trust_line_liquidity_pool(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_trust_line(ctx, btc_usdc_pool()?.trust_line_asset()?)
}

fn op_revoke_sponsorship_offer(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::Offer(LedgerKeyOffer {
            seller_id: ctx.kp1.account_id(),
            offer_id: 123456,
        }),
    )
}

fn op_revoke_sponsorship_data(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::Data(LedgerKeyData {
            account_id: ctx.kp1.account_id(),
            data_name: data_name()?,
        }),
    )
}

fn op_revoke_sponsorship_claimable_balance(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::ClaimableBalance(LedgerKeyClaimableBalance {
            balance_id: claimable_balance_id(BALANCE_ID)?,
        }),
    )
}

fn op_revoke_sponsorship_liquidity_pool(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_entry(
        ctx,
        LedgerKey::LiquidityPool(LedgerKeyLiquidityPool {
            liquidity_pool_id: pool_id_from_hex(POOL_ID)?,
        }),
    )
}

fn op_revoke_sponsorship_ed25519_public_key_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_signer(ctx, SignerKey::Ed25519(Uint256(ctx.kp2.public_key())))
}

fn op_revoke_sponsorship_hash_x_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_signer(ctx, signer_key(HASH_X_SIGNER)?)
}

fn op_revoke_sponsorship_pre_auth_tx_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    revoke_signer(ctx, signer_key(PRE_AUTH_TX_SIGNER)?)
}

fn clawback(from: MuxedAccount) -> Result<OperationBody, FixtureError> {
    Ok(OperationBody::Clawback(ClawbackOp {
        asset: usdc()?,
        from,
        amount: parse_amount("1000.85")?,
    }))
}

fn op_clawback(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, clawback(ctx.kp1.muxed())?)
}

fn op_clawback_with_muxed_destination(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    single(ctx, clawback(muxed_kp1(ctx))?)
}

fn op_clawback_claimable_balance(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::ClawbackClaimableBalance(ClawbackClaimableBalanceOp {
            balance_id: claimable_balance_id(BALANCE_ID)?,
        }),
    )
}

/// Flags set to `true` are set, flags set to `false` are cleared
fn set_trust_line_flags(
    ctx: &FixtureContext,
    authorized: bool,
    maintain_liabilities: bool,
    clawback_enabled: bool,
) -> Result<BuiltTransaction, FixtureError> {
    let (mut set_flags, mut clear_flags) = (0, 0);
    for (enabled, bit) in [
        (authorized, FLAG_AUTHORIZED),
        (maintain_liabilities, FLAG_AUTHORIZED_TO_MAINTAIN_LIABILITIES),
        (clawback_enabled, FLAG_CLAWBACK_ENABLED),
    ] {
        if enabled {
            set_flags |= bit;
        } else {
            clear_flags |= bit;
        }
    }

    single(
        ctx,
        OperationBody::SetTrustLineFlags(SetTrustLineFlagsOp {
            trustor: ctx.kp1.account_id(),
            asset: usdc()?,
            clear_flags,
            set_flags,
        }),
    )
}

fn op_set_trust_line_flags_unauthorized(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    set_trust_line_flags(ctx, false, false, false)
}

fn op_set_trust_line_flags_authorized(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    set_trust_line_flags(ctx, true, true, false)
}

fn op_set_trust_line_flags_authorized_to_maintain_liabilities(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    set_trust_line_flags(ctx, false, true, false)
}

fn op_set_trust_line_flags_authorized_and_clawback_enabled(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    set_trust_line_flags(ctx, true, false, true)
}

fn op_liquidity_pool_deposit(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::LiquidityPoolDeposit(LiquidityPoolDepositOp {
            liquidity_pool_id: btc_usdc_pool()?.pool_id()?,
            max_amount_a: parse_amount("1000000")?,
            max_amount_b: parse_amount("0.2321")?,
            min_price: parse_price("14324232.23")?,
            max_price: parse_price("10000000.00")?,
        }),
    )
}

fn op_liquidity_pool_withdraw(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    single(
        ctx,
        OperationBody::LiquidityPoolWithdraw(LiquidityPoolWithdrawOp {
            liquidity_pool_id: btc_usdc_pool()?.pool_id()?,
            amount: parse_amount("5000")?,
            min_amount_a: parse_amount("10000")?,
            min_amount_b: parse_amount("20000")?,
        }),
    )
}

fn memo_hash() -> Hash {
    Hash(Sha256::digest(b"hello world").into())
}

fn with_memo(ctx: &FixtureContext, memo: Memo) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .memo(memo)
        .add_operation(operation(Some(ctx.kp0.muxed()), create_account_body(ctx)?))
        .build()
}

fn tx_memo_none(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_memo(ctx, Memo::None)
}

fn tx_memo_id(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_memo(ctx, Memo::Id(u64::MAX))
}

fn tx_memo_hash(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_memo(ctx, Memo::Hash(memo_hash()))
}

fn tx_memo_return(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_memo(ctx, Memo::Return(memo_hash()))
}

/// Operations with the transaction source, an explicit source and a multiplexed source
fn tx_multi_op(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .add_operation(operation(None, create_account_body(ctx)?))
        .add_operation(operation(
            Some(ctx.kp1.muxed()),
            payment(ctx.kp2.muxed(), btc()?)?,
        ))
        .add_operation(operation(
            Some(ctx.kp2.muxed_with_id(MUXED_ID)),
            OperationBody::ManageData(ManageDataOp {
                data_name: data_name()?,
                data_value: Some(DataValue(DATA_VALUE.as_bytes().to_vec().try_into()?)),
            }),
        ))
        .add_operation(operation(Some(ctx.kp0.muxed()), OperationBody::Inflation))
        .build()
}

fn tx_op_source_omitted(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .add_operation(operation(None, create_account_body(ctx)?))
        .build()
}

fn tx_muxed_source(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .source(ctx.kp0.muxed_with_id(MUXED_ID))
        .add_operation(operation(None, create_account_body(ctx)?))
        .build()
}

fn tx_testnet(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .network(Network::Testnet)
        .add_operation(operation(Some(ctx.kp0.muxed()), create_account_body(ctx)?))
        .build()
}

fn common_time_bounds(ctx: &FixtureContext) -> TimeBounds {
    TimeBounds {
        min_time: TimePoint(0),
        max_time: TimePoint(ctx.max_time),
    }
}

fn with_preconditions(
    ctx: &FixtureContext,
    cond: PreconditionsV2,
) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .preconditions(cond)
        .add_operation(operation(Some(ctx.kp0.muxed()), create_account_body(ctx)?))
        .build()
}

fn empty_preconditions(ctx: &FixtureContext) -> PreconditionsV2 {
    PreconditionsV2 {
        time_bounds: Some(common_time_bounds(ctx)),
        ledger_bounds: None,
        min_seq_num: None,
        min_seq_age: Duration(0),
        min_seq_ledger_gap: 0,
        extra_signers: Default::default(),
    }
}

fn ledger_bounds() -> LedgerBounds {
    LedgerBounds {
        min_ledger: 40351800,
        max_ledger: 40352000,
    }
}

fn tx_cond_ledger_bounds(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            ledger_bounds: Some(ledger_bounds()),
            ..empty_preconditions(ctx)
        },
    )
}

fn tx_cond_min_seq_num(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            min_seq_num: Some(SequenceNumber(ctx.sequence - 100)),
            ..empty_preconditions(ctx)
        },
    )
}

fn full_preconditions(ctx: &FixtureContext) -> Result<PreconditionsV2, FixtureError> {
    Ok(PreconditionsV2 {
        time_bounds: Some(common_time_bounds(ctx)),
        ledger_bounds: Some(ledger_bounds()),
        min_seq_num: Some(SequenceNumber(ctx.sequence - 100)),
        min_seq_age: Duration(1649239999),
        min_seq_ledger_gap: 30,
        extra_signers: vec![
            SignerKey::Ed25519(Uint256(ctx.kp1.public_key())),
            signer_key(HASH_X_SIGNER)?,
        ]
        .try_into()?,
    })
}

fn tx_cond_full(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(ctx, full_preconditions(ctx)?)
}

fn with_time_bounds(
    ctx: &FixtureContext,
    min_time: u64,
    max_time: u64,
) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .time_bounds(min_time, max_time)
        .add_operation(operation(Some(ctx.kp0.muxed()), create_account_body(ctx)?))
        .build()
}

/// A zero upper bound means the transaction never expires
fn tx_cond_time_bounds_max_is_zero(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_time_bounds(ctx, ctx.max_time, 0)
}

fn tx_cond_time_bounds_min_is_zero(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_time_bounds(ctx, 0, ctx.max_time)
}

fn tx_cond_time_bounds_are_zero(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_time_bounds(ctx, 0, 0)
}

fn tx_cond_ledger_bounds_max_is_zero(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            ledger_bounds: Some(LedgerBounds {
                max_ledger: 0,
                ..ledger_bounds()
            }),
            ..empty_preconditions(ctx)
        },
    )
}

fn tx_cond_ledger_bounds_min_is_zero(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            ledger_bounds: Some(LedgerBounds {
                min_ledger: 0,
                ..ledger_bounds()
            }),
            ..empty_preconditions(ctx)
        },
    )
}

fn tx_cond_min_seq_age(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            min_seq_age: Duration(1649239999),
            ..empty_preconditions(ctx)
        },
    )
}

fn tx_cond_min_seq_ledger_gap(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            min_seq_ledger_gap: 30,
            ..empty_preconditions(ctx)
        },
    )
}

fn tx_cond_extra_signers(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            extra_signers: vec![
                SignerKey::Ed25519(Uint256(ctx.kp1.public_key())),
                signer_key(HASH_X_SIGNER)?,
            ]
            .try_into()?,
            ..empty_preconditions(ctx)
        },
    )
}

/// Every precondition except the ledger bounds
fn tx_cond_without_ledger_bounds(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    with_preconditions(
        ctx,
        PreconditionsV2 {
            ledger_bounds: None,
            ..full_preconditions(ctx)?
        },
    )
}

fn source_equal_signer_payment(ctx: &FixtureContext) -> Result<OperationBody, FixtureError> {
    payment(ctx.kp1.muxed(), native())
}

/// Neither the transaction nor the operation name a source other than the signer
fn tx_source_equal_signer(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .add_operation(operation(None, source_equal_signer_payment(ctx)?))
        .build()
}

fn tx_source_equal_op_source_equal_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .add_operation(operation(
            Some(ctx.kp0.muxed()),
            source_equal_signer_payment(ctx)?,
        ))
        .build()
}

fn tx_source_muxed_account_equal_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    ctx.builder()?
        .source(ctx.kp0.muxed_with_id(MUXED_ID))
        .add_operation(operation(None, source_equal_signer_payment(ctx)?))
        .build()
}

/// Fee bumps pay 500 stroops for each operation, plus one for the wrapper
const FEE_BUMP_BASE_FEE: i64 = 500;

fn fee_bump_tx(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    op_create_account(ctx)?.fee_bump(ctx.kp1.muxed(), FEE_BUMP_BASE_FEE, &ctx.kp0)
}

fn fee_bump_tx_muxed_fee_source(ctx: &FixtureContext) -> Result<BuiltTransaction, FixtureError> {
    op_create_account(ctx)?.fee_bump(muxed_kp1(ctx), FEE_BUMP_BASE_FEE, &ctx.kp0)
}

fn fee_bump_tx_fee_source_equal_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    op_create_account(ctx)?.fee_bump(ctx.kp0.muxed(), FEE_BUMP_BASE_FEE, &ctx.kp0)
}

fn fee_bump_tx_fee_source_muxed_account_equal_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    op_create_account(ctx)?.fee_bump(ctx.kp0.muxed_with_id(MUXED_ID), FEE_BUMP_BASE_FEE, &ctx.kp0)
}

fn fee_bump_tx_inner_source_equal_signer(
    ctx: &FixtureContext,
) -> Result<BuiltTransaction, FixtureError> {
    tx_source_equal_signer(ctx)?.fee_bump(ctx.kp1.muxed(), FEE_BUMP_BASE_FEE, &ctx.kp0)
}

pub static CATALOG: &[FixtureEntry] = &[
    FixtureEntry::new("opCreateAccount", op_create_account),
    FixtureEntry::new("opPaymentAssetNative", op_payment_asset_native),
    FixtureEntry::new("opPaymentAssetAlphanum4", op_payment_asset_alphanum4),
    FixtureEntry::new("opPaymentAssetAlphanum12", op_payment_asset_alphanum12),
    FixtureEntry::new("opPaymentWithMuxedDestination", op_payment_with_muxed_destination),
    FixtureEntry::new("opPathPaymentStrictReceive", op_path_payment_strict_receive),
    FixtureEntry::new(
        "opPathPaymentStrictReceiveWithEmptyPath",
        op_path_payment_strict_receive_with_empty_path,
    ),
    FixtureEntry::new(
        "opPathPaymentStrictReceiveWithMuxedDestination",
        op_path_payment_strict_receive_with_muxed_destination,
    ),
    FixtureEntry::new("opManageSellOfferCreate", op_manage_sell_offer_create),
    FixtureEntry::new("opManageSellOfferUpdate", op_manage_sell_offer_update),
    FixtureEntry::new("opManageSellOfferDelete", op_manage_sell_offer_delete),
    FixtureEntry::new("opCreatePassiveSellOffer", op_create_passive_sell_offer),
    FixtureEntry::new("opSetOptions", op_set_options),
    FixtureEntry::new("opSetOptionsWithEmptyBody", op_set_options_with_empty_body),
    FixtureEntry::new("opSetOptionsNoSigner", op_set_options_no_signer),
    FixtureEntry::new("opSetOptionsRemoveHomeDomain", op_set_options_remove_home_domain),
    FixtureEntry::new("opSetOptionsAddPublicKeySigner", op_set_options_add_public_key_signer),
    FixtureEntry::new("opSetOptionsAddHashXSigner", op_set_options_add_hash_x_signer),
    FixtureEntry::new("opSetOptionsAddPreAuthTxSigner", op_set_options_add_pre_auth_tx_signer),
    FixtureEntry::new("opAppendChangeTrustAddTrustLine", op_change_trust_add_trust_line),
    FixtureEntry::new("opAppendChangeTrustRemoveTrustLine", op_change_trust_remove_trust_line),
    FixtureEntry::new(
        "opAppendChangeTrustWithLiquidityPoolAssetAddTrustLine",
        op_change_trust_pool_add_trust_line,
    ),
    FixtureEntry::new(
        "opAppendChangeTrustWithLiquidityPoolAssetRemoveTrustLine",
        op_change_trust_pool_remove_trust_line,
    ),
    FixtureEntry::new("opAllowTrustDeauthorize", op_allow_trust_deauthorize),
    FixtureEntry::new("opAllowTrustAuthorize", op_allow_trust_authorize),
    FixtureEntry::new(
        "opAllowTrustAuthorizeToMaintainLiabilities",
        op_allow_trust_authorize_to_maintain_liabilities,
    ),
    FixtureEntry::new("opAccountMerge", op_account_merge),
    FixtureEntry::new("opAccountMergeWithMuxedDestination", op_account_merge_with_muxed_destination),
    FixtureEntry::new("opInflation", op_inflation),
    FixtureEntry::new("opManageDataAdd", op_manage_data_add),
    FixtureEntry::new("opManageDataRemove", op_manage_data_remove),
    FixtureEntry::new("opBumpSequence", op_bump_sequence),
    FixtureEntry::new("opManageBuyOfferCreate", op_manage_buy_offer_create),
    FixtureEntry::new("opManageBuyOfferUpdate", op_manage_buy_offer_update),
    FixtureEntry::new("opManageBuyOfferDelete", op_manage_buy_offer_delete),
    FixtureEntry::new("opPathPaymentStrictSend", op_path_payment_strict_send),
    FixtureEntry::new(
        "opPathPaymentStrictSendWithEmptyPath",
        op_path_payment_strict_send_with_empty_path,
    ),
    FixtureEntry::new(
        "opPathPaymentStrictSendWithMuxedDestination",
        op_path_payment_strict_send_with_muxed_destination,
    ),
    FixtureEntry::new("opCreateClaimableBalance", op_create_claimable_balance),
    FixtureEntry::new(
        "opCreateClaimableBalancePredicateOr",
        op_create_claimable_balance_predicate_or,
    ),
    FixtureEntry::new(
        "opCreateClaimableBalancePredicateNot",
        op_create_claimable_balance_predicate_not,
    ),
    FixtureEntry::new(
        "opCreateClaimableBalancePredicateBeforeAbsoluteTime",
        op_create_claimable_balance_predicate_before_absolute_time,
    ),
    FixtureEntry::new(
        "opCreateClaimableBalancePredicateBeforeRelativeTime",
        op_create_claimable_balance_predicate_before_relative_time,
    ),
    FixtureEntry::new(
        "opCreateClaimableBalanceMultiClaimant",
        op_create_claimable_balance_multi_claimant,
    ),
    FixtureEntry::new("opClaimClaimableBalance", op_claim_claimable_balance),
    FixtureEntry::new("opBeginSponsoringFutureReserves", op_begin_sponsoring_future_reserves),
    FixtureEntry::new("opEndSponsoringFutureReserves", op_end_sponsoring_future_reserves),
    FixtureEntry::new("opRevokeSponsorshipAccount", op_revoke_sponsorship_account),
    FixtureEntry::new("opRevokeSponsorshipTrustLine", op_revoke_sponsorship_trust_line),
    FixtureEntry::new(
        "opRevokeSponsorshipTrustLineLiquidityPool",
        op_revoke_sponsorship_trust_line_liquidity_pool,
    ),
    FixtureEntry::new("opRevokeSponsorshipOffer", op_revoke_sponsorship_offer),
    FixtureEntry::new("opRevokeSponsorshipData", op_revoke_sponsorship_data),
    FixtureEntry::new(
        "opRevokeSponsorshipClaimableBalance",
        op_revoke_sponsorship_claimable_balance,
    ),
    FixtureEntry::new("opRevokeSponsorshipLiquidityPool", op_revoke_sponsorship_liquidity_pool),
    FixtureEntry::new(
        "opRevokeSponsorshipEd25519PublicKeySigner",
        op_revoke_sponsorship_ed25519_public_key_signer,
    ),
    FixtureEntry::new("opRevokeSponsorshipHashXSigner", op_revoke_sponsorship_hash_x_signer),
    FixtureEntry::new(
        "opRevokeSponsorshipPreAuthTxSigner",
        op_revoke_sponsorship_pre_auth_tx_signer,
    ),
    FixtureEntry::new("opClawback", op_clawback),
    FixtureEntry::new("opClawbackWithMuxedDestination", op_clawback_with_muxed_destination),
    FixtureEntry::new("opClawbackClaimableBalance", op_clawback_claimable_balance),
    FixtureEntry::new("opSetTrustLineFlagsUnauthorized", op_set_trust_line_flags_unauthorized),
    FixtureEntry::new("opSetTrustLineFlagsAuthorized", op_set_trust_line_flags_authorized),
    FixtureEntry::new(
        "opSetTrustLineFlagsAuthorizedToMaintainLiabilities",
        op_set_trust_line_flags_authorized_to_maintain_liabilities,
    ),
    FixtureEntry::new(
        "opSetTrustLineFlagsAuthorizedAndClawbackEnabled",
        op_set_trust_line_flags_authorized_and_clawback_enabled,
    ),
    FixtureEntry::new("opLiquidityPoolDeposit", op_liquidity_pool_deposit),
    FixtureEntry::new("opLiquidityPoolWithdraw", op_liquidity_pool_withdraw),
    FixtureEntry::new("txMemoNone", tx_memo_none),
    FixtureEntry::new("txMemoId", tx_memo_id),
    FixtureEntry::new("txMemoHash", tx_memo_hash),
    FixtureEntry::new("txMemoReturn", tx_memo_return),
    FixtureEntry::new("txMultiOp", tx_multi_op),
    FixtureEntry::new("txOpSourceOmitted", tx_op_source_omitted),
    FixtureEntry::new("txMuxedSource", tx_muxed_source),
    FixtureEntry::new("txTestnet", tx_testnet),
    FixtureEntry::new("txSourceEqualSigner", tx_source_equal_signer),
    FixtureEntry::new(
        "txSourceEqualOpSourceEqualSigner",
        tx_source_equal_op_source_equal_signer,
    ),
    FixtureEntry::new(
        "txSourceMuxedAccountEqualSigner",
        tx_source_muxed_account_equal_signer,
    ),
    FixtureEntry::new("txCondTimeBoundsMaxIsZero", tx_cond_time_bounds_max_is_zero),
    FixtureEntry::new("txCondTimeBoundsMinIsZero", tx_cond_time_bounds_min_is_zero),
    FixtureEntry::new("txCondTimeBoundsAreZero", tx_cond_time_bounds_are_zero),
    FixtureEntry::new("txCondLedgerBounds", tx_cond_ledger_bounds),
    FixtureEntry::new("txCondMinSeqNum", tx_cond_min_seq_num),
    FixtureEntry::new("txCondLedgerBoundsMaxIsZero", tx_cond_ledger_bounds_max_is_zero),
    FixtureEntry::new("txCondLedgerBoundsMinIsZero", tx_cond_ledger_bounds_min_is_zero),
    FixtureEntry::new("txCondMinSeqAge", tx_cond_min_seq_age),
    FixtureEntry::new("txCondMinSeqLedgerGap", tx_cond_min_seq_ledger_gap),
    FixtureEntry::new("txCondExtraSigners", tx_cond_extra_signers),
    FixtureEntry::new("txCondWithoutLedgerBounds", tx_cond_without_ledger_bounds),
    FixtureEntry::new("txCondFull", tx_cond_full),
    FixtureEntry::new("feeBumpTx", fee_bump_tx),
    FixtureEntry::new("feeBumpTxMuxedFeeSource", fee_bump_tx_muxed_fee_source),
    FixtureEntry::new("feeBumpTxFeeSourceEqualSigner", fee_bump_tx_fee_source_equal_signer),
    FixtureEntry::new(
        "feeBumpTxFeeSourceMuxedAccountEqualSigner",
        fee_bump_tx_fee_source_muxed_account_equal_signer,
    ),
    FixtureEntry::new("feeBumpTxInnerSourceEqualSigner", fee_bump_tx_inner_source_equal_signer),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::amount::{format_amount, MAX_AMOUNT};
    use crate::builder::BuiltTransaction;
    use crate::naming::is_valid_identifier;
    use crate::xdr::{
        ClaimPredicateType, FeeBumpTransactionInnerTx, OperationType, Preconditions,
        TransactionSignaturePayloadTaggedTransaction,
    };

    fn ctx() -> FixtureContext {
        FixtureContext::new().unwrap()
    }

    fn cond(id: &str) -> Preconditions {
        match (find(id).unwrap().build)(&ctx()).unwrap().transaction {
            TransactionSignaturePayloadTaggedTransaction::Tx(tx) => tx.cond,
            _ => panic!("{} is a fee bump", id),
        }
    }

    fn cond_v2(id: &str) -> PreconditionsV2 {
        match cond(id) {
            Preconditions::V2(cond) => cond,
            other => panic!("unexpected preconditions {:?}", other),
        }
    }

    fn collect_predicates(predicate: &ClaimPredicate, seen: &mut Vec<ClaimPredicateType>) {
        seen.push(predicate.discriminant());
        match predicate {
            ClaimPredicate::And(inner) | ClaimPredicate::Or(inner) => {
                inner.iter().for_each(|p| collect_predicates(p, seen))
            }
            ClaimPredicate::Not(Some(inner)) => collect_predicates(inner, seen),
            _ => {}
        }
    }

    fn single_body(id: &str) -> OperationBody {
        let tx = (find(id).unwrap().build)(&ctx()).unwrap();
        assert_eq!(tx.operations().len(), 1);
        tx.operations()[0].body.clone()
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = HashSet::new();
        for entry in CATALOG {
            assert!(is_valid_identifier(entry.id), "invalid identifier {}", entry.id);
            assert!(names.insert(entry.name()), "duplicate name {}", entry.name());
        }
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_every_entry_builds_deterministically() {
        let ctx = ctx();
        for entry in CATALOG {
            let first = entry
                .signature_base(&ctx)
                .unwrap_or_else(|e| panic!("{} failed: {}", entry.id, e));
            let second = entry.signature_base(&ctx).unwrap();
            assert_eq!(first, second, "{} is not deterministic", entry.id);
        }
    }

    #[test]
    fn test_round_trip() {
        let ctx = ctx();
        for entry in CATALOG {
            let tx = (entry.build)(&ctx).unwrap();
            let decoded = BuiltTransaction::decode(&tx.signature_base().unwrap()).unwrap();
            assert_eq!(decoded, tx.payload(), "{} does not round trip", entry.id);
            assert_eq!(decoded.network_id, tx.network.id());
        }
    }

    #[test]
    fn test_classic_operation_coverage() {
        const SOROBAN: [OperationType; 3] = [
            OperationType::InvokeHostFunction,
            OperationType::ExtendFootprintTtl,
            OperationType::RestoreFootprint,
        ];

        let ctx = ctx();
        let covered = CATALOG
            .iter()
            .flat_map(|entry| {
                let tx = (entry.build)(&ctx).unwrap();
                tx.operations()
                    .iter()
                    .map(|op| op.body.discriminant())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        for ty in OperationType::VARIANTS {
            if SOROBAN.contains(&ty) {
                continue;
            }
            assert!(covered.contains(&ty), "{:?} is not covered", ty);
        }
    }

    #[test]
    fn test_create_account_conformance() {
        let base = find("opCreateAccount").unwrap().signature_base(&ctx()).unwrap();
        assert_eq!(base.len(), 220);
        assert_eq!(
            hex::encode(base),
            "7ac33997544e3175d266bd022439b22cdb16508c01163f26e5cb2a3e1045a9790000000200000000e93388bbfd2fbd11806dd0bd59cea9079e7cc70ce7b1e154f114cdfe4e466ecd0000006401707da0316ec068000000010000000000000000000000006396aa1c000000010000000b68656c6c6f20776f726c6400000000010000000100000000e93388bbfd2fbd11806dd0bd59cea9079e7cc70ce7b1e154f114cdfe4e466ecd0000000000000000e2c6810f9b509b264bf25c5ff849745bcfcc75658919ddda36aca732e669e855000000003b9aca0000000000"
        );
    }

    #[test]
    fn test_max_amount() {
        match single_body("opPaymentAssetNative") {
            OperationBody::Payment(op) => {
                assert_eq!(op.amount, i64::MAX);
                assert_eq!(format_amount(op.amount), MAX_AMOUNT);
                assert_eq!(op.asset, Asset::Native);
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_offers() {
        let sell = |id| match single_body(id) {
            OperationBody::ManageSellOffer(op) => (op.amount, op.offer_id),
            other => panic!("unexpected operation {:?}", other),
        };
        assert_eq!(sell("opManageSellOfferCreate"), (9884484232134000, 0));
        assert_eq!(sell("opManageSellOfferUpdate"), (9884484232134000, 7123456));
        assert_eq!(sell("opManageSellOfferDelete"), (0, 7123456));

        let buy = |id| match single_body(id) {
            OperationBody::ManageBuyOffer(op) => (op.buy_amount, op.offer_id),
            other => panic!("unexpected operation {:?}", other),
        };
        assert_eq!(buy("opManageBuyOfferCreate"), (9884481112222000, 0));
        assert_eq!(buy("opManageBuyOfferUpdate"), (9884481112222000, 3523456));
        assert_eq!(buy("opManageBuyOfferDelete"), (0, 3523456));
    }

    #[test]
    fn test_trust_line_flags() {
        let flags = |id| match single_body(id) {
            OperationBody::SetTrustLineFlags(op) => (op.set_flags, op.clear_flags),
            other => panic!("unexpected operation {:?}", other),
        };
        assert_eq!(flags("opSetTrustLineFlagsUnauthorized"), (0, 7));
        assert_eq!(flags("opSetTrustLineFlagsAuthorized"), (3, 4));
        assert_eq!(flags("opSetTrustLineFlagsAuthorizedToMaintainLiabilities"), (2, 5));
        assert_eq!(flags("opSetTrustLineFlagsAuthorizedAndClawbackEnabled"), (5, 2));
    }

    #[test]
    fn test_muxed_destination() {
        match single_body("opPaymentWithMuxedDestination") {
            OperationBody::Payment(op) => assert_eq!(op.destination, ctx().kp1.muxed_with_id(10000)),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_paths() {
        match single_body("opPathPaymentStrictSendWithEmptyPath") {
            OperationBody::PathPaymentStrictSend(op) => assert!(op.path.as_slice().is_empty()),
            other => panic!("unexpected operation {:?}", other),
        }
        match single_body("opPathPaymentStrictReceive") {
            OperationBody::PathPaymentStrictReceive(op) => {
                assert_eq!(op.path.as_slice(), &[usdc().unwrap(), panda().unwrap()])
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_liquidity_pool_id() {
        match single_body("opLiquidityPoolDeposit") {
            OperationBody::LiquidityPoolDeposit(op) => {
                assert_eq!(
                    hex::encode(op.liquidity_pool_id.0 .0),
                    "3aab0ed6d0b6f570c5b32b0339cc5930be36c4ae2c07697b70f11f9387e3f831"
                );
                assert_eq!((op.min_price.n, op.min_price.d), (1432423223, 100));
                assert_eq!((op.max_price.n, op.max_price.d), (10000000, 1));
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_fee_bump_entries() {
        let ctx = ctx();
        let inner = (find("opCreateAccount").unwrap().build)(&ctx).unwrap();

        let tx = (find("feeBumpTxMuxedFeeSource").unwrap().build)(&ctx).unwrap();
        match tx.transaction {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(fb) => {
                assert_eq!(fb.fee, 1000);
                assert_eq!(fb.fee_source, ctx.kp1.muxed_with_id(10000));
                let FeeBumpTransactionInnerTx::Tx(envelope) = fb.inner_tx;
                assert_eq!(
                    TransactionSignaturePayloadTaggedTransaction::Tx(envelope.tx),
                    inner.transaction
                );
            }
            _ => panic!("not a fee bump"),
        }
    }

    #[test]
    fn test_claim_predicate_coverage() {
        let ctx = ctx();
        let mut seen = vec![];
        for entry in CATALOG {
            let tx = (entry.build)(&ctx).unwrap();
            for op in tx.operations() {
                if let OperationBody::CreateClaimableBalance(op) = &op.body {
                    for Claimant::ClaimantTypeV0(claimant) in op.claimants.iter() {
                        collect_predicates(&claimant.predicate, &mut seen);
                    }
                }
            }
        }

        for ty in ClaimPredicateType::VARIANTS {
            assert!(seen.contains(&ty), "{:?} is not covered", ty);
        }

        match single_body("opCreateClaimableBalancePredicateOr") {
            OperationBody::CreateClaimableBalance(op) => {
                let Claimant::ClaimantTypeV0(claimant) = &op.claimants[0];
                assert_eq!(
                    claimant.predicate,
                    ClaimPredicate::Or(
                        vec![
                            ClaimPredicate::BeforeAbsoluteTime(1670818332),
                            ClaimPredicate::BeforeRelativeTime(3600),
                        ]
                        .try_into()
                        .unwrap()
                    )
                );
            }
            other => panic!("unexpected operation {:?}", other),
        }
        match single_body("opCreateClaimableBalanceMultiClaimant") {
            OperationBody::CreateClaimableBalance(op) => assert_eq!(op.claimants.len(), 3),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_time_bound_edges() {
        let bounds = |id| match cond(id) {
            Preconditions::Time(tb) => (tb.min_time.0, tb.max_time.0),
            other => panic!("unexpected preconditions {:?}", other),
        };
        assert_eq!(bounds("txCondTimeBoundsMaxIsZero"), (1670818332, 0));
        assert_eq!(bounds("txCondTimeBoundsMinIsZero"), (0, 1670818332));
        assert_eq!(bounds("txCondTimeBoundsAreZero"), (0, 0));
    }

    #[test]
    fn test_preconditions_v2() {
        let ledger = |id| {
            cond_v2(id)
                .ledger_bounds
                .map(|lb| (lb.min_ledger, lb.max_ledger))
        };
        assert_eq!(ledger("txCondLedgerBounds"), Some((40351800, 40352000)));
        assert_eq!(ledger("txCondLedgerBoundsMaxIsZero"), Some((40351800, 0)));
        assert_eq!(ledger("txCondLedgerBoundsMinIsZero"), Some((0, 40352000)));

        let age = cond_v2("txCondMinSeqAge");
        assert_eq!(age.min_seq_age, Duration(1649239999));
        assert_eq!((age.min_seq_num, age.min_seq_ledger_gap), (None, 0));
        assert!(age.ledger_bounds.is_none() && age.extra_signers.is_empty());

        let gap = cond_v2("txCondMinSeqLedgerGap");
        assert_eq!((gap.min_seq_age, gap.min_seq_ledger_gap), (Duration(0), 30));

        let signers = cond_v2("txCondExtraSigners");
        assert_eq!(signers.extra_signers.len(), 2);
        assert!(signers.min_seq_num.is_none());

        let without = cond_v2("txCondWithoutLedgerBounds");
        assert!(without.ledger_bounds.is_none());
        assert_eq!(
            PreconditionsV2 {
                ledger_bounds: Some(ledger_bounds()),
                ..without
            },
            cond_v2("txCondFull")
        );
    }

    #[test]
    fn test_set_options_variants() {
        match single_body("opSetOptionsNoSigner") {
            OperationBody::SetOptions(op) => {
                assert!(op.signer.is_none());
                assert_eq!(op.home_domain.unwrap().0.as_slice(), b"stellar.org");
                assert_eq!(op.master_weight, Some(255));
            }
            other => panic!("unexpected operation {:?}", other),
        }
        match single_body("opSetOptionsRemoveHomeDomain") {
            OperationBody::SetOptions(op) => {
                assert!(op.home_domain.unwrap().0.as_slice().is_empty());
                assert!(op.signer.is_none() && op.inflation_dest.is_none());
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_sources_equal_to_signer() {
        let ctx = ctx();
        let tx = |id| (find(id).unwrap().build)(&ctx).unwrap();

        let plain = tx("txSourceEqualSigner");
        assert!(plain.operations()[0].source_account.is_none());
        match &plain.transaction {
            TransactionSignaturePayloadTaggedTransaction::Tx(t) => {
                assert_eq!(t.source_account, ctx.kp0.muxed())
            }
            _ => panic!("not a transaction"),
        }
        assert_eq!(
            tx("txSourceEqualOpSourceEqualSigner").operations()[0].source_account,
            Some(ctx.kp0.muxed())
        );

        let fee_source = |id| match tx(id).transaction {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(fb) => fb.fee_source,
            _ => panic!("{} is not a fee bump", id),
        };
        assert_eq!(fee_source("feeBumpTxFeeSourceEqualSigner"), ctx.kp0.muxed());
        assert_eq!(
            fee_source("feeBumpTxFeeSourceMuxedAccountEqualSigner"),
            ctx.kp0.muxed_with_id(10000)
        );
        assert_eq!(fee_source("feeBumpTxInnerSourceEqualSigner"), ctx.kp1.muxed());
        assert!(tx("feeBumpTxInnerSourceEqualSigner").operations()[0]
            .source_account
            .is_none());
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name("op-create-account").unwrap().id, "opCreateAccount");
        assert_eq!(find_by_name("txMemoId").unwrap().id, "txMemoId");
        assert!(find_by_name("op-does-not-exist").is_none());
    }
}
