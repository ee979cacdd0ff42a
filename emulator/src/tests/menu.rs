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
async fn test_main_menu(mut tester: Tester) -> Result<(), crate::Error> {
    tester.screen_contains("is ready").await?;

    tester.press(Button::Right).await?;
    tester.screen_contains("Settings").await?;

    tester.press(Button::Both).await?;
    tester.screen_contains("Hash signing").await?;
    tester.screen_contains("Disabled").await?;

    tester.press(Button::Right).await?;
    tester.screen_contains("Back").await?;

    tester.press(Button::Both).await?;
    tester.screen_contains("is ready").await?;

    tester.finish().await
}
