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

//! Device test harness for the Stellar app
//!
//! Drives either the Speculos simulator or an in-process fake device through scripted
//! navigation, compares every screen against golden snapshots and checks the replies
//! against locally computed values.

pub mod driver;
pub mod fake;
pub mod link;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

#[cfg(test)]
mod tests;
