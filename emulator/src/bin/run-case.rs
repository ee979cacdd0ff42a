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


use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, ValueEnum};
use env_logger::Env;

use model::{Bip32Path, DeviceModel, Request};

use emulator::driver::{execute_case, Session, Tester};
use emulator::fake::FakeDevice;
use emulator::link::DeviceLink;
use emulator::utils::model::TestLog;
use emulator::utils::report::{render_report, report_path, HtmlReport};
use emulator::utils::screen::Simulator;
use emulator::utils::snapshot::SnapshotMode;
use emulator::utils::{DriverConfig, SpeculosInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceKind {
    /// In-process device, no simulator needed
    Fake,
    Speculos,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Fixture to sign, by identifier or file name
    #[clap(long, short = 'c', default_value = "opCreateAccount")]
    case: String,

    /// Device model to run on. Can be repeated, defaults to every model.
    #[clap(long, short = 'm')]
    model: Vec<DeviceModel>,

    /// Device the case runs against
    #[clap(long, value_enum, default_value_t = DeviceKind::Speculos)]
    device: DeviceKind,

    /// Account index of the signing key (`44'/148'/<account>'`)
    #[clap(long, default_value_t = 0)]
    account: u32,

    /// Overwrite the goldens instead of comparing against them
    #[clap(long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    record: bool,

    /// Directory of the golden snapshots
    #[clap(long)]
    snapshots_dir: Option<PathBuf>,

    /// Which cases get an HTML report
    #[clap(long, value_enum, default_value_t = HtmlReport::OnlyFailing)]
    html_report: HtmlReport,
}

struct Case {
    name: String,
    path: Bip32Path,
    data: Vec<u8>,
    public_key: [u8; 32],
    hash: [u8; 32],
    signature: Vec<u8>,
}

fn load_case(id: &str, account: u32) -> Result<Case, emulator::Error> {
    let entry = fixtures::catalog::find_by_name(id).ok_or_else(|| format!("Unknown case {}", id))?;
    let ctx = fixtures::FixtureContext::new()?;
    let keypair = ctx
        .keypair(account)
        .ok_or_else(|| format!("No key for account {}", account))?;

    let tx = (entry.build)(&ctx)?;
    Ok(Case {
        name: entry.name(),
        path: Bip32Path::stellar(account),
        data: tx.signature_base()?,
        public_key: keypair.public_key(),
        hash: tx.hash()?,
        signature: tx.sign(keypair)?.signature.0.as_slice().to_vec(),
    })
}

async fn run_on<S: Simulator>(
    sim: &S,
    link: DeviceLink,
    model: DeviceModel,
    config: DriverConfig,
    case: &Case,
) -> Result<TestLog, emulator::Error> {
    let store = config.snapshot_store();
    let mut session = Session::new(model, &case.name, sim, link, store, config);

    let request = Request::SignTransaction {
        path: case.path.clone(),
        data: case.data.clone(),
    };
    let (public_key, hash, expected) = (case.public_key, case.hash, case.signature.clone());
    execute_case(&mut session, move |mut tester: Tester| async move {
        tester.review(request, "Finalize").await?;
        tester.expect_signature(public_key, &hash, expected).await
    })
    .await
}

async fn run_model(
    model: DeviceModel,
    device: DeviceKind,
    config: DriverConfig,
    case: &Case,
) -> Result<TestLog, emulator::Error> {
    match device {
        DeviceKind::Fake => {
            let device = FakeDevice::spawn(model, &config)?;
            run_on(&device, device.link.clone(), model, config, case).await
        }
        DeviceKind::Speculos => {
            let device = SpeculosInstance::spawn(model, &config).await?;
            run_on(&device, device.link.clone(), model, config, case).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse().global_opts;

    let mut config = DriverConfig::from_env();
    if args.record {
        config.snapshot_mode = SnapshotMode::Record;
    }
    if let Some(dir) = args.snapshots_dir {
        config.snapshots_dir = dir;
    }

    let case = match load_case(&args.case, args.account) {
        Ok(case) => case,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let models = match args.model.is_empty() {
        true => DeviceModel::ALL.to_vec(),
        false => args.model,
    };

    let runs = models
        .iter()
        .map(|model| run_model(*model, args.device, config.clone(), &case));
    let results = futures::future::join_all(runs).await;

    let mut success = true;
    for (model, result) in models.iter().zip(results) {
        let log = match result {
            Ok(log) => log,
            Err(e) => {
                log::error!("{} on {}: {}", case.name, model, e);
                success = false;
                continue;
            }
        };

        match log.failure() {
            None => log::info!("{} on {}: {:?}", case.name, model, log.state),
            Some(failure) => {
                log::error!("{} on {} failed at {}", case.name, model, failure);
                success = false;
            }
        }

        if args.html_report.wants(&log) {
            let rendered = report_path(&log).and_then(|to| render_report(&to, &log));
            if let Err(e) = rendered {
                log::warn!("Unable to render the report: {}", e);
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
