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


use serde::{Deserialize, Serialize};

use super::model::Button;
use super::screen::Simulator;

#[derive(Debug, Serialize)]
struct ButtonAction {
    action: &'static str,
}

#[derive(Debug, Deserialize)]
struct Events {
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    text: String,
}

/// Client of the simulator's REST API
#[derive(Debug, Clone)]
pub struct SpeculosApi {
    client: reqwest::Client,
    base_url: String,
}

impl SpeculosApi {
    pub fn new(port: u16) -> Self {
        SpeculosApi {
            client: reqwest::Client::new(),
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    /// Whether the API is accepting requests
    pub async fn is_ready(&self) -> bool {
        self.client
            .get(format!("{}/events?currentscreenonly=true", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

impl Simulator for SpeculosApi {
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error> {
        let bytes = self
            .client
            .get(format!("{}/screenshot", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn press(&self, button: Button) -> Result<(), crate::Error> {
        log::trace!("Pressing {:?}", button);

        self.client
            .post(format!("{}/button/{}", self.base_url, button.name()))
            .json(&ButtonAction {
                action: "press-and-release",
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn texts(&self) -> Result<Vec<String>, crate::Error> {
        let events: Events = self
            .client
            .get(format!("{}/events?currentscreenonly=true", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(events.events.into_iter().map(|e| e.text).collect())
    }
}
