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


use std::fmt;
use std::time::Duration;

use super::model::Button;

/// Screen and buttons of a running device
#[allow(async_fn_in_trait)]
pub trait Simulator {
    /// PNG of the current screen
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error>;

    async fn press(&self, button: Button) -> Result<(), crate::Error>;

    /// Text shown on the current screen
    async fn texts(&self) -> Result<Vec<String>, crate::Error>;

    /// Log lines produced since the last call
    fn drain_logs(&self) -> Vec<String> {
        vec![]
    }
}

/// A decoded screenshot
#[derive(Debug, Clone)]
pub struct Frame {
    pub png: Vec<u8>,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn from_png(png: Vec<u8>) -> Result<Self, crate::Error> {
        let image = image::load_from_memory(&png)?.to_rgba8();
        let (width, height) = image.dimensions();

        Ok(Frame {
            png,
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel-exact comparison, the PNG encoding itself is ignored
    pub fn same_pixels(&self, other: &Frame) -> bool {
        self.dimensions() == other.dimensions() && self.pixels == other.pixels
    }
}

#[derive(Debug)]
pub enum ScreenError {
    Timeout,
    Simulator(crate::Error),
}

impl fmt::Display for ScreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenError::Timeout => write!(f, "Timeout waiting for screen update"),
            ScreenError::Simulator(e) => write!(f, "Simulator error: {}", e),
        }
    }
}

impl std::error::Error for ScreenError {}

pub async fn capture<S: Simulator>(sim: &S) -> Result<Frame, ScreenError> {
    let png = sim.screenshot().await.map_err(ScreenError::Simulator)?;
    Frame::from_png(png).map_err(ScreenError::Simulator)
}

/// Poll the screen until it differs from `previous`
pub async fn wait_for_screen_update<S: Simulator>(
    sim: &S,
    previous: &Frame,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Frame, ScreenError> {
    let poll = async {
        loop {
            let frame = capture(sim).await?;
            if !frame.same_pixels(previous) {
                return Ok(frame);
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| ScreenError::Timeout)?
}
