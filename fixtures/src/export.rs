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

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{find_by_name, FixtureEntry, CATALOG};
use crate::context::FixtureContext;
use crate::naming::fixture_file;
use crate::FixtureError;

pub const DEFAULT_OUT_DIR: &str = "testcases";

#[derive(Debug)]
pub struct ExportFailure {
    pub id: &'static str,
    pub error: FixtureError,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entries matching `only` (identifiers or derived names), or the whole catalog when empty
pub fn select(only: &[String]) -> Result<Vec<&'static FixtureEntry>, FixtureError> {
    if only.is_empty() {
        return Ok(CATALOG.iter().collect());
    }

    only.iter()
        .map(|name| find_by_name(name).ok_or_else(|| FixtureError::UnknownEntry(name.clone())))
        .collect()
}

fn export_one(
    ctx: &FixtureContext,
    entry: &FixtureEntry,
    out_dir: &Path,
) -> Result<PathBuf, FixtureError> {
    let bytes = entry.signature_base(ctx)?;
    let path = out_dir.join(fixture_file(entry.id));
    fs::write(&path, bytes)?;

    Ok(path)
}

/// Write the signature base of every entry to `<out_dir>/<name>.raw`
///
/// A failing entry is recorded in the report and does not stop the export. Only failing to
/// create `out_dir` aborts.
pub fn export<'a, I>(ctx: &FixtureContext, entries: I, out_dir: &Path) -> Result<ExportReport, FixtureError>
where
    I: IntoIterator<Item = &'a FixtureEntry>,
{
    fs::create_dir_all(out_dir)?;

    let mut report = ExportReport::default();
    for entry in entries {
        match export_one(ctx, entry, out_dir) {
            Ok(path) => {
                log::info!("Wrote {}", path.display());
                report.written.push(path);
            }
            Err(error) => {
                log::error!("Failed to export {}: {}", entry.name(), error);
                report.failures.push(ExportFailure { id: entry.id, error });
            }
        }
    }

    Ok(report)
}
