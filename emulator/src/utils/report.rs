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


use std::fs::File;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;

use super::model::TestLog;

pub const HB_TEMPLATE: &'static str = include_str!("../../report.hb");

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HtmlReport {
    None,
    OnlyFailing,
    All,
}

impl HtmlReport {
    pub fn wants(&self, log: &TestLog) -> bool {
        match self {
            HtmlReport::None => false,
            HtmlReport::OnlyFailing => !log.result,
            HtmlReport::All => true,
        }
    }
}

pub fn render_report(to: &Path, log: &TestLog) -> Result<(), crate::Error> {
    let mut hb = Handlebars::new();
    hb.register_template_string("report", HB_TEMPLATE)?;

    let writer = File::create(to)?;
    hb.render_to_write("report", log, writer)?;

    log::info!("Rendered report to: {}", to.display());

    Ok(())
}

/// `<report dir>/<model>-<case>.html`
pub fn report_path(log: &TestLog) -> Result<PathBuf, crate::Error> {
    Ok(super::report_dir()?.join(format!("{}-{}.html", log.model, log.case)))
}
