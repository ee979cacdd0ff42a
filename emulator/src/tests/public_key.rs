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

#[functional_test_wrapper::functional_test]
async fn test_get_public_key(mut tester: Tester) -> Result<(), crate::Error> {
    let ctx = context()?;

    tester
        .send(Request::GetPublicKey {
            path: account(0),
            display: false,
        })
        .await?;
    tester.expect(Reply::PublicKey(ctx.kp0.public_key())).await?;

    tester
        .send(Request::GetPublicKey {
            path: account(2),
            display: false,
        })
        .await?;
    tester.expect(Reply::PublicKey(ctx.kp2.public_key())).await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_show_address(mut tester: Tester) -> Result<(), crate::Error> {
    let ctx = context()?;

    tester
        .review(
            Request::GetPublicKey {
                path: account(1),
                display: true,
            },
            "Approve",
        )
        .await?;
    tester.expect(Reply::PublicKey(ctx.kp1.public_key())).await?;
    tester.screen_contains("is ready").await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_reject_address(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .review(
            Request::GetPublicKey {
                path: account(0),
                display: true,
            },
            "Reject",
        )
        .await?;
    tester.expect_error(DeviceError::UserRejected).await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_app_configuration(mut tester: Tester) -> Result<(), crate::Error> {
    tester.send(Request::GetAppConfiguration).await?;
    tester
        .expect(Reply::AppConfiguration {
            hash_signing: false,
            version: "5.0.3".to_string(),
        })
        .await?;

    Ok(())
}
