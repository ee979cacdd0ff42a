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

use sha2::{Digest, Sha256};

use crate::context::{Keypair, Network, BASE_FEE};
use crate::xdr::{
    DecoratedSignature, FeeBumpTransaction, FeeBumpTransactionExt, FeeBumpTransactionInnerTx,
    Limits, Memo, MuxedAccount, Operation, OperationBody, Preconditions, PreconditionsV2,
    ReadXdr, SequenceNumber, TimeBounds, TimePoint, Transaction, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, WriteXdr,
};
use crate::FixtureError;

/// Operation with an optional explicit source
pub fn operation(source: Option<MuxedAccount>, body: OperationBody) -> Operation {
    Operation {
        source_account: source,
        body,
    }
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source: MuxedAccount,
    sequence: i64,
    base_fee: u32,
    network: Network,
    memo: Memo,
    cond: Preconditions,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    /// `sequence` is the sequence number of the transaction itself
    pub fn new(source: MuxedAccount, sequence: i64) -> Self {
        TransactionBuilder {
            source,
            sequence,
            base_fee: BASE_FEE,
            network: Network::Public,
            memo: Memo::None,
            cond: Preconditions::None,
            operations: Vec::new(),
        }
    }

    pub fn source(mut self, source: MuxedAccount) -> Self {
        self.source = source;
        self
    }

    pub fn base_fee(mut self, base_fee: u32) -> Self {
        self.base_fee = base_fee;
        self
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn memo_text(self, text: &str) -> Result<Self, FixtureError> {
        Ok(self.memo(Memo::Text(text.as_bytes().to_vec().try_into()?)))
    }

    pub fn time_bounds(mut self, min_time: u64, max_time: u64) -> Self {
        self.cond = Preconditions::Time(TimeBounds {
            min_time: TimePoint(min_time),
            max_time: TimePoint(max_time),
        });
        self
    }

    pub fn preconditions(mut self, cond: PreconditionsV2) -> Self {
        self.cond = Preconditions::V2(cond);
        self
    }

    /// Current time bounds, if any
    pub fn current_time_bounds(&self) -> Option<TimeBounds> {
        match &self.cond {
            Preconditions::Time(tb) => Some(tb.clone()),
            Preconditions::V2(cond) => cond.time_bounds.clone(),
            Preconditions::None => None,
        }
    }

    pub fn add_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// The fee is `base_fee` for every operation
    pub fn build(self) -> Result<BuiltTransaction, FixtureError> {
        if self.operations.is_empty() {
            return Err(FixtureError::NoOperations);
        }
        let fee = u32::try_from(self.operations.len())
            .ok()
            .and_then(|n| n.checked_mul(self.base_fee))
            .ok_or_else(|| FixtureError::InvalidFee("fee overflow".into()))?;
        let operations = self
            .operations
            .try_into()
            .map_err(|_| FixtureError::TooManyOperations)?;

        let tx = Transaction {
            source_account: self.source,
            fee,
            seq_num: SequenceNumber(self.sequence),
            cond: self.cond,
            memo: self.memo,
            operations,
            ext: TransactionExt::V0,
        };

        Ok(BuiltTransaction {
            network: self.network,
            transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx),
        })
    }
}

/// An unsigned transaction together with the network it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub network: Network,
    pub transaction: TransactionSignaturePayloadTaggedTransaction,
}

impl BuiltTransaction {
    pub fn payload(&self) -> TransactionSignaturePayload {
        TransactionSignaturePayload {
            network_id: self.network.id(),
            tagged_transaction: self.transaction.clone(),
        }
    }

    /// Network id, envelope type and transaction: the bytes the device hashes and signs
    pub fn signature_base(&self) -> Result<Vec<u8>, FixtureError> {
        Ok(self.payload().to_xdr(Limits::none())?)
    }

    pub fn hash(&self) -> Result<[u8; 32], FixtureError> {
        Ok(Sha256::digest(self.signature_base()?).into())
    }

    pub fn sign(&self, keypair: &Keypair) -> Result<DecoratedSignature, FixtureError> {
        keypair.sign_decorated(&self.hash()?)
    }

    /// Operations of the transaction, or of the inner transaction of a fee bump
    pub fn operations(&self) -> &[Operation] {
        match &self.transaction {
            TransactionSignaturePayloadTaggedTransaction::Tx(tx) => tx.operations.as_slice(),
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(fee_bump) => {
                match &fee_bump.inner_tx {
                    FeeBumpTransactionInnerTx::Tx(envelope) => envelope.tx.operations.as_slice(),
                }
            }
        }
    }

    /// Wrap this transaction, signed by `signer`, in a fee bump paying `base_fee` per
    /// operation plus one for the fee bump itself
    pub fn fee_bump(
        self,
        fee_source: MuxedAccount,
        base_fee: i64,
        signer: &Keypair,
    ) -> Result<BuiltTransaction, FixtureError> {
        let signature = self.sign(signer)?;
        let tx = match self.transaction {
            TransactionSignaturePayloadTaggedTransaction::Tx(tx) => tx,
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(_) => {
                return Err(FixtureError::NestedFeeBump)
            }
        };

        let ops = tx.operations.len() as i64;
        let inner_rate = tx.fee as i64 / ops;
        if base_fee < inner_rate || base_fee < BASE_FEE as i64 {
            return Err(FixtureError::InvalidFee(format!(
                "base fee {} is lower than the inner transaction rate {}",
                base_fee, inner_rate
            )));
        }
        let fee = base_fee
            .checked_mul(ops + 1)
            .ok_or_else(|| FixtureError::InvalidFee("fee overflow".into()))?;

        let inner = TransactionV1Envelope {
            tx,
            signatures: vec![signature].try_into()?,
        };

        Ok(BuiltTransaction {
            network: self.network,
            transaction: TransactionSignaturePayloadTaggedTransaction::TxFeeBump(
                FeeBumpTransaction {
                    fee_source,
                    fee,
                    inner_tx: FeeBumpTransactionInnerTx::Tx(inner),
                    ext: FeeBumpTransactionExt::V0,
                },
            ),
        })
    }

    /// Decode signature base bytes with the XDR reference decoder
    pub fn decode(bytes: &[u8]) -> Result<TransactionSignaturePayload, FixtureError> {
        Ok(TransactionSignaturePayload::from_xdr(bytes, Limits::none())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixtureContext;
    use crate::xdr::{CreateAccountOp, EnvelopeType};

    /// Signature base of a `kp0 -> kp1` create account of 100 XLM
    const CREATE_ACCOUNT_BASE: &str = "7ac33997544e3175d266bd022439b22cdb16508c01163f26e5cb2a3e1045a9790000000200000000e93388bbfd2fbd11806dd0bd59cea9079e7cc70ce7b1e154f114cdfe4e466ecd0000006401707da0316ec068000000010000000000000000000000006396aa1c000000010000000b68656c6c6f20776f726c6400000000010000000100000000e93388bbfd2fbd11806dd0bd59cea9079e7cc70ce7b1e154f114cdfe4e466ecd0000000000000000e2c6810f9b509b264bf25c5ff849745bcfcc75658919ddda36aca732e669e855000000003b9aca0000000000";

    fn create_account(ctx: &FixtureContext) -> Operation {
        operation(
            Some(ctx.kp0.muxed()),
            OperationBody::CreateAccount(CreateAccountOp {
                destination: ctx.kp1.account_id(),
                starting_balance: 1_000_000_000,
            }),
        )
    }

    #[test]
    fn test_signature_base() {
        let ctx = FixtureContext::new().unwrap();
        let tx = ctx
            .builder()
            .unwrap()
            .add_operation(create_account(&ctx))
            .build()
            .unwrap();

        let base = tx.signature_base().unwrap();
        assert_eq!(base.len(), 220);
        assert_eq!(hex::encode(&base), CREATE_ACCOUNT_BASE);
        assert_eq!(
            hex::encode(tx.hash().unwrap()),
            "628f49cfc49d29df6040837c93658944ca5197c31b076eb7ead9cedb7b779e7d"
        );
        assert_eq!(
            hex::encode(tx.sign(&ctx.kp0).unwrap().signature.0.as_slice()),
            "a8c7b45196c38e1e4b9d1191af87acdf2df2cf0da23bdba76beb9b9171b89e0b140832ee2ae5d9087b2a7081d0739bc8d678353dba604d4392b587c6e1e70900"
        );
    }

    #[test]
    fn test_fee_per_operation() {
        let ctx = FixtureContext::new().unwrap();
        let tx = ctx
            .builder()
            .unwrap()
            .add_operation(create_account(&ctx))
            .add_operation(create_account(&ctx))
            .add_operation(create_account(&ctx))
            .build()
            .unwrap();

        match tx.transaction {
            TransactionSignaturePayloadTaggedTransaction::Tx(tx) => assert_eq!(tx.fee, 300),
            _ => panic!("not a transaction"),
        }
    }

    #[test]
    fn test_empty_transaction() {
        let ctx = FixtureContext::new().unwrap();
        assert!(matches!(
            ctx.builder().unwrap().build(),
            Err(FixtureError::NoOperations)
        ));
    }

    #[test]
    fn test_fee_bump() {
        let ctx = FixtureContext::new().unwrap();
        let inner = ctx
            .builder()
            .unwrap()
            .add_operation(create_account(&ctx))
            .build()
            .unwrap();

        assert!(matches!(
            inner.clone().fee_bump(ctx.kp1.muxed(), 50, &ctx.kp0),
            Err(FixtureError::InvalidFee(_))
        ));

        let fee_bump = inner.clone().fee_bump(ctx.kp1.muxed(), 500, &ctx.kp0).unwrap();
        assert_eq!(fee_bump.operations(), inner.operations());

        let decoded = BuiltTransaction::decode(&fee_bump.signature_base().unwrap()).unwrap();
        match decoded.tagged_transaction {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(fb) => {
                assert_eq!(fb.fee, 1000);
                assert_eq!(fb.fee_source, ctx.kp1.muxed());
                let FeeBumpTransactionInnerTx::Tx(envelope) = fb.inner_tx;
                assert_eq!(
                    envelope.signatures.as_slice(),
                    &[inner.sign(&ctx.kp0).unwrap()]
                );
            }
            _ => panic!("not a fee bump"),
        }

        let base = fee_bump.signature_base().unwrap();
        assert_eq!(&base[32..36], &(EnvelopeType::TxFeeBump as i32).to_be_bytes());

        assert!(matches!(
            fee_bump.fee_bump(ctx.kp2.muxed(), 500, &ctx.kp0),
            Err(FixtureError::NestedFeeBump)
        ));
    }
}
