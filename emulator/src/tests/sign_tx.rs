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


use fixtures::{BuiltTransaction, Keypair};

use super::*;

fn fixture(id: &str) -> Result<(FixtureContext, BuiltTransaction), crate::Error> {
    let ctx = context()?;
    let entry = fixtures::catalog::find(id).ok_or_else(|| format!("Unknown fixture {}", id))?;
    let tx = (entry.build)(&ctx)?;
    Ok((ctx, tx))
}

fn signature(tx: &BuiltTransaction, keypair: &Keypair) -> Result<Vec<u8>, crate::Error> {
    Ok(tx.sign(keypair)?.signature.0.as_slice().to_vec())
}

async fn sign_and_verify(
    tester: &mut Tester,
    id: &str,
    index: u32,
) -> Result<(), crate::Error> {
    let (ctx, tx) = fixture(id)?;
    let keypair = ctx.keypair(index).ok_or("Unknown account")?;

    tester
        .review(
            Request::SignTransaction {
                path: account(index),
                data: tx.signature_base()?,
            },
            "Finalize",
        )
        .await?;
    tester
        .expect_signature(keypair.public_key(), &tx.hash()?, signature(&tx, keypair)?)
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_create_account(mut tester: Tester) -> Result<(), crate::Error> {
    sign_and_verify(&mut tester, "opCreateAccount", 0).await
}

#[functional_test_wrapper::functional_test]
async fn test_sign_multi_op(mut tester: Tester) -> Result<(), crate::Error> {
    sign_and_verify(&mut tester, "txMultiOp", 0).await
}

#[functional_test_wrapper::functional_test]
async fn test_sign_fee_bump(mut tester: Tester) -> Result<(), crate::Error> {
    sign_and_verify(&mut tester, "feeBumpTx", 0).await
}

#[functional_test_wrapper::functional_test]
async fn test_sign_muxed_source(mut tester: Tester) -> Result<(), crate::Error> {
    sign_and_verify(&mut tester, "txMuxedSource", 0).await
}

#[functional_test_wrapper::functional_test(models = "nanosp, nanox")]
async fn test_sign_testnet_second_account(mut tester: Tester) -> Result<(), crate::Error> {
    sign_and_verify(&mut tester, "txTestnet", 1).await
}

#[functional_test_wrapper::functional_test]
async fn test_reject_transaction(mut tester: Tester) -> Result<(), crate::Error> {
    let (_, tx) = fixture("opPaymentAssetNative")?;

    tester
        .review(
            Request::SignTransaction {
                path: account(0),
                data: tx.signature_base()?,
            },
            "Reject",
        )
        .await?;
    tester.expect_error(DeviceError::UserRejected).await?;
    tester.screen_contains("is ready").await?;

    Ok(())
}
