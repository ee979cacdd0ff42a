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


use super::*;

const HASH: [u8; 32] = [
    0x3a, 0xab, 0x0e, 0xd6, 0x0c, 0x1f, 0x27, 0xd9, 0x55, 0x45, 0x6c, 0x67, 0x47, 0x3b, 0xb4, 0x3f,
    0x08, 0x1f, 0x0b, 0x0b, 0x6f, 0x38, 0xef, 0x8c, 0xd1, 0x4a, 0x63, 0xa2, 0xc7, 0x5a, 0x12, 0x9f,
];

#[functional_test_wrapper::functional_test]
async fn test_hash_signing_disabled(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .send(Request::SignHash {
            path: account(0),
            hash: HASH,
        })
        .await?;
    tester.expect_error(DeviceError::HashSigningNotAllowed).await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_hash(mut tester: Tester) -> Result<(), crate::Error> {
    let ctx = context()?;

    enable_hash_signing(&mut tester).await?;

    tester
        .review(
            Request::SignHash {
                path: account(0),
                hash: HASH,
            },
            "Approve",
        )
        .await?;
    tester
        .expect_signature(ctx.kp0.public_key(), &HASH, ctx.kp0.sign(&HASH).to_vec())
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_reject_hash(mut tester: Tester) -> Result<(), crate::Error> {
    enable_hash_signing(&mut tester).await?;

    tester
        .review(
            Request::SignHash {
                path: account(0),
                hash: HASH,
            },
            "Reject",
        )
        .await?;
    tester.expect_error(DeviceError::UserRejected).await?;

    Ok(())
}
