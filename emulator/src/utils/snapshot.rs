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

use serde::Serialize;

use model::DeviceModel;

use super::screen::Frame;

pub const SNAPSHOT_EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum SnapshotMode {
    /// Compare every capture with the stored golden
    Compare,
    /// Overwrite the goldens with the captures
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Match,
    Recorded,
    Mismatch(PathBuf),
    Missing(PathBuf),
}

/// Golden screenshots, stored as `<root>/<model prefix>-<case>/<index>.png`
///
/// Every capture is also written under `tmp_root` with the same layout, so a failing
/// comparison can be inspected next to its golden.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    tmp_root: PathBuf,
    mode: SnapshotMode,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>, mode: SnapshotMode) -> Self {
        let root = root.into();
        let tmp_root = match root.file_name() {
            Some(name) => root.with_file_name(format!("{}-tmp", name.to_string_lossy())),
            None => root.join("tmp"),
        };

        SnapshotStore {
            root,
            tmp_root,
            mode,
        }
    }

    pub fn with_tmp_root(mut self, tmp_root: impl Into<PathBuf>) -> Self {
        self.tmp_root = tmp_root.into();
        self
    }

    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn case_dir(&self, model: DeviceModel, case: &str) -> PathBuf {
        self.root.join(case_dir_name(model, case))
    }

    pub fn golden_path(&self, model: DeviceModel, case: &str, index: usize) -> PathBuf {
        self.case_dir(model, case).join(snapshot_file_name(index))
    }

    pub fn capture_path(&self, model: DeviceModel, case: &str, index: usize) -> PathBuf {
        self.tmp_root
            .join(case_dir_name(model, case))
            .join(snapshot_file_name(index))
    }

    /// Clear the captures of a previous run. When recording the old goldens go too, so a
    /// flow that got shorter leaves no stale screens behind.
    pub fn begin_case(&self, model: DeviceModel, case: &str) -> Result<(), crate::Error> {
        remove_dir_if_exists(&self.tmp_root.join(case_dir_name(model, case)))?;
        if self.mode == SnapshotMode::Record {
            remove_dir_if_exists(&self.case_dir(model, case))?;
        }
        Ok(())
    }

    pub fn check(
        &self,
        model: DeviceModel,
        case: &str,
        index: usize,
        frame: &Frame,
    ) -> Result<SnapshotOutcome, crate::Error> {
        write_file(&self.capture_path(model, case, index), &frame.png)?;

        let golden = self.golden_path(model, case, index);
        match self.mode {
            SnapshotMode::Record => {
                write_file(&golden, &frame.png)?;
                log::debug!("Recorded {}", golden.display());
                Ok(SnapshotOutcome::Recorded)
            }
            SnapshotMode::Compare if !golden.exists() => Ok(SnapshotOutcome::Missing(golden)),
            SnapshotMode::Compare => {
                let expected = Frame::from_png(fs::read(&golden)?)?;
                if expected.same_pixels(frame) {
                    Ok(SnapshotOutcome::Match)
                } else {
                    Ok(SnapshotOutcome::Mismatch(golden))
                }
            }
        }
    }

    /// Number of goldens stored for a case
    pub fn golden_count(&self, model: DeviceModel, case: &str) -> Result<usize, crate::Error> {
        let dir = self.case_dir(model, case);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn case_dir_name(model: DeviceModel, case: &str) -> String {
    format!("{}-{}", model.prefix(), case)
}

fn snapshot_file_name(index: usize) -> String {
    format!("{:05}.{}", index, SNAPSHOT_EXTENSION)
}

fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)
}
