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


use std::sync::{Once, OnceLock};

use fixtures::FixtureContext;
use model::{Bip32Path, DeviceError, DeviceModel, Reply, Request};

use crate::driver::Tester;
use crate::utils::model::*;
use crate::utils::snapshot::{SnapshotMode, SnapshotStore};
use crate::utils::DriverConfig;

mod menu;
mod public_key;
mod sign_hash;
mod sign_tx;

pub static INIT_LOG: Once = Once::new();

#[cfg(not(feature = "speculos"))]
pub type TestDevice = crate::fake::FakeDevice;
#[cfg(feature = "speculos")]
pub type TestDevice = crate::utils::SpeculosInstance;

pub fn driver_config() -> DriverConfig {
    DriverConfig::from_env()
}

pub async fn spawn_device(
    model: DeviceModel,
    config: &DriverConfig,
) -> Result<TestDevice, crate::Error> {
    #[cfg(not(feature = "speculos"))]
    let device = crate::fake::FakeDevice::spawn(model, config)?;
    #[cfg(feature = "speculos")]
    let device = crate::utils::SpeculosInstance::spawn(model, config).await?;

    Ok(device)
}

/// Goldens of the fake device are not checked in: its screens are recorded into a
/// temporary directory, and comparison is covered by the `snapshots` tests
pub fn snapshot_store(config: &DriverConfig) -> Result<SnapshotStore, crate::Error> {
    if cfg!(feature = "speculos") {
        return Ok(config.snapshot_store());
    }

    // n.b. never dropped, the recorded screens stay around for inspection
    static ROOT: OnceLock<Option<tempdir::TempDir>> = OnceLock::new();
    let root = ROOT
        .get_or_init(|| tempdir::TempDir::new("stellar-snapshots").ok())
        .as_ref()
        .map(|d| d.path().to_path_buf())
        .ok_or("Unable to create the snapshot directory")?;

    Ok(SnapshotStore::new(root.join("snapshots"), SnapshotMode::Record))
}

pub fn context() -> Result<FixtureContext, crate::Error> {
    Ok(FixtureContext::new()?)
}

pub fn account(index: u32) -> Bip32Path {
    Bip32Path::stellar(index)
}

/// Turn on hash signing from the settings menu, ending back on the idle screen
pub async fn enable_hash_signing(tester: &mut Tester) -> Result<(), crate::Error> {
    tester.navigate_and_confirm("Settings").await?;
    tester.navigate_and_confirm("Hash signing").await?;
    tester.navigate_and_confirm("Back").await?;
    Ok(())
}
