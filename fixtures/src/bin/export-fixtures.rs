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

use clap::{Args, Parser};
use env_logger::Env;

use fixtures::export::{export, select, DEFAULT_OUT_DIR};
use fixtures::FixtureContext;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Directory the `.raw` fixtures are written to
    #[clap(long, short = 'o', default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Only export the given fixture (identifier or file name). Can be repeated.
    #[clap(long)]
    only: Vec<String>,

    /// Print the fixture names without writing anything
    #[clap(long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    list: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    let entries = match select(&args.global_opts.only) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.global_opts.list {
        for entry in entries {
            println!("{}", entry.name());
        }
        return ExitCode::SUCCESS;
    }

    let ctx = match FixtureContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("Invalid fixture context: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match export(&ctx, entries, &args.global_opts.out_dir) {
        Ok(report) => report,
        Err(e) => {
            log::error!(
                "Unable to create {}: {}",
                args.global_opts.out_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Exported {} fixtures to {}, {} failed",
        report.written.len(),
        args.global_opts.out_dir.display(),
        report.failures.len()
    );
    for failure in &report.failures {
        log::error!("{}: {}", failure.id, failure.error);
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
