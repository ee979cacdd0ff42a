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


use core::fmt;

use serde::{Deserialize, Serialize};

use model::{DeviceError, DeviceModel, Reply, Request};

use crate::driver::CaseState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Button {
    Left,
    Right,
    Both,
}

impl Button {
    /// Path segment of the simulator's button endpoint
    pub fn name(&self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
            Button::Both => "both",
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub enum TestOp {
    Action(TestAction),
    Assertion(TestAssertion),
}

impl From<TestAction> for TestOp {
    fn from(value: TestAction) -> Self {
        TestOp::Action(value)
    }
}
impl From<TestAssertion> for TestOp {
    fn from(value: TestAssertion) -> Self {
        TestOp::Assertion(value)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub enum TestAction {
    /// Send a request without waiting for its reply
    Send(Request),
    /// Wait until the screen changes and capture it
    WaitScreen,
    Press(Button),
    /// Press right until a screen containing `text` is shown, then optionally press both
    NavigateUntil { text: String, confirm: bool },
    /// End a case that expects no reply from the device
    Finish,
}

#[derive(Debug, Deserialize, Serialize)]
pub enum TestAssertion {
    Reply(Reply),
    Error(DeviceError),
    ScreenContains(String),
    /// The reply must be `reference` and a valid signature of `message` by `public_key`
    Signature {
        public_key: [u8; 32],
        message: Vec<u8>,
        reference: Vec<u8>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum AssertionResult {
    WrongScreen { index: usize, golden: String },
    MissingGolden(String),
    UnmatchedGoldens { expected: usize, captured: usize },
    TextNotFound(String),
    WrongReply(String),
    NoPendingRequest,
    Timeout(String),
    Transport(String),
    Simulator(String),
    BadSignature(String),
    /// The test body returned an error or panicked
    Body(String),
    /// A request was sent but its reply was never checked
    UnresolvedRequest,
    /// The case ended without checking a reply or calling finish
    NoOutcome,
}
impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self, f)
    }
}
impl std::error::Error for AssertionResult {}

#[derive(Debug)]
pub struct TestLogStep {
    pub op: TestOp,
    /// PNG of the screen after the step
    pub display: Option<Vec<u8>>,
    pub captured: Vec<usize>,
    pub pass: bool,
    pub fail: Option<AssertionResult>,
    pub log_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TestLog {
    pub result: bool, // used in the Handlebars template
    pub case: String,
    pub model: DeviceModel,
    pub state: CaseState,
    /// Failure detected after the last step
    #[serde(serialize_with = "serialize_display")]
    pub error: Option<AssertionResult>,
    pub steps: Vec<TestLogStep>,
}

impl TestLog {
    /// Description of what made the case fail
    pub fn failure(&self) -> Option<String> {
        if self.result {
            return None;
        }

        self.steps
            .iter()
            .find(|s| !s.pass)
            .map(|s| {
                let fail = s.fail.as_ref().map(ToString::to_string).unwrap_or_default();
                format!("{:?}: {}", s.op, fail)
            })
            .or_else(|| self.error.as_ref().map(ToString::to_string))
            .or_else(|| Some(format!("{:?}", self.state)))
    }
}

fn serialize_display<S>(
    value: &Option<AssertionResult>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    value
        .as_ref()
        .map(ToString::to_string)
        .serialize(serializer)
}

impl Serialize for TestLogStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{Error, SerializeMap};

        let mut map = serializer.serialize_map(None)?;
        match &self.op {
            TestOp::Assertion(a) => {
                map.serialize_entry("is_assertion", &true)?;
                map.serialize_entry("assertion", &a)?;
                map.serialize_entry(
                    "assertion_json",
                    &serde_json::to_string(&a).map_err(S::Error::custom)?,
                )?;
            }
            TestOp::Action(a) => {
                map.serialize_entry("is_action", &true)?;
                map.serialize_entry(
                    "action",
                    &serde_json::to_string(&a).map_err(S::Error::custom)?,
                )?;
            }
        }
        map.serialize_entry("display", &self.display.as_ref().map(base64::encode))?;
        map.serialize_entry("captured", &self.captured)?;
        map.serialize_entry("pass", &self.pass)?;
        map.serialize_entry("fail", &self.fail.as_ref().map(ToString::to_string))?;
        map.serialize_entry("print_log_lines", &!self.log_lines.is_empty())?;
        map.serialize_entry("log_lines", &self.log_lines)?;
        map.end()
    }
}
