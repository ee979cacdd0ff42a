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


//! Scripted device sessions
//!
//! A test body talks to a [`Tester`], which forwards every step to [`run_script`] over a
//! channel and waits for its outcome. `run_script` owns the [`Session`]: it presses
//! buttons, captures and compares screens, and keeps track of the in-flight request.
//! Once the body returns, [`Session::conclude`] decides the final state of the case.

use std::future::Future;

use ed25519_dalek::{Signature, SignatureError, VerifyingKey};

use serde::Serialize;
use tokio::sync::mpsc;

use model::{DeviceError, DeviceModel, Reply, Request};

use crate::link::{DeviceLink, LinkError, PendingReply};
use crate::utils::model::*;
use crate::utils::screen::{self, Frame, ScreenError, Simulator};
use crate::utils::snapshot::{SnapshotMode, SnapshotOutcome, SnapshotStore};
use crate::utils::DriverConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaseState {
    NotStarted,
    Started,
    TransportOpen,
    NavigatingScreens,
    AwaitingDeviceResponse,
    Verified,
    Rejected,
    TimedOut,
    Failed,
}

impl CaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseState::Verified | CaseState::Rejected | CaseState::TimedOut | CaseState::Failed
        )
    }

    pub fn can_advance_to(&self, next: CaseState) -> bool {
        use CaseState::*;

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Failed) | (_, TimedOut) => true,
            (NotStarted, Started) | (Started, TransportOpen) => true,
            (
                TransportOpen | NavigatingScreens | AwaitingDeviceResponse,
                NavigatingScreens | AwaitingDeviceResponse | Verified | Rejected,
            ) => true,
            _ => false,
        }
    }
}

/// Outcome of a single step, split by the state it leads to
fn failure_state(fail: &AssertionResult) -> CaseState {
    match fail {
        AssertionResult::Timeout(_) => CaseState::TimedOut,
        _ => CaseState::Failed,
    }
}

/// A test case running against one device
pub struct Session<'a, S: Simulator> {
    pub model: DeviceModel,
    pub case: String,

    sim: &'a S,
    link: DeviceLink,
    store: SnapshotStore,
    config: DriverConfig,

    state: CaseState,
    /// Terminal state reached if nothing else fails, set by a reply check or `finish`
    outcome: Option<CaseState>,
    frame: Option<Frame>,
    next_index: usize,
    pending: Option<PendingReply>,
}

impl<'a, S: Simulator> Session<'a, S> {
    pub fn new(
        model: DeviceModel,
        case: &str,
        sim: &'a S,
        link: DeviceLink,
        store: SnapshotStore,
        config: DriverConfig,
    ) -> Self {
        Session {
            model,
            case: case.to_string(),
            sim,
            link,
            store,
            config,
            state: CaseState::NotStarted,
            outcome: None,
            frame: None,
            next_index: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    /// Number of screens captured so far
    pub fn captured(&self) -> usize {
        self.next_index
    }

    fn advance(&mut self, next: CaseState) -> Result<(), crate::Error> {
        if next == self.state {
            return Ok(());
        }
        if !self.state.can_advance_to(next) {
            return Err(format!("Invalid transition {:?} -> {:?}", self.state, next).into());
        }

        log::debug!("{} ({}): {:?} -> {:?}", self.case, self.model, self.state, next);
        self.state = next;
        Ok(())
    }

    async fn open(&mut self) -> Result<(), crate::Error> {
        self.advance(CaseState::Started)?;
        self.store.begin_case(self.model, &self.case)?;
        self.frame = Some(screen::capture(self.sim).await?);
        self.advance(CaseState::TransportOpen)
    }

    fn record(&mut self, frame: Frame) -> Option<AssertionResult> {
        let index = self.next_index;
        self.next_index += 1;

        let outcome = self.store.check(self.model, &self.case, index, &frame);
        self.frame = Some(frame);

        match outcome {
            Ok(SnapshotOutcome::Match) | Ok(SnapshotOutcome::Recorded) => None,
            Ok(SnapshotOutcome::Mismatch(golden)) => Some(AssertionResult::WrongScreen {
                index,
                golden: golden.display().to_string(),
            }),
            Ok(SnapshotOutcome::Missing(golden)) => {
                Some(AssertionResult::MissingGolden(golden.display().to_string()))
            }
            Err(e) => Some(AssertionResult::Simulator(e.to_string())),
        }
    }

    async fn baseline(&mut self) -> Result<Frame, AssertionResult> {
        match &self.frame {
            Some(frame) => Ok(frame.clone()),
            None => screen::capture(self.sim).await.map_err(screen_failure),
        }
    }

    /// Wait for the screen to change and capture the new one
    async fn next_screen(&mut self) -> Option<AssertionResult> {
        let previous = match self.baseline().await {
            Ok(frame) => frame,
            Err(e) => return Some(e),
        };

        match screen::wait_for_screen_update(
            self.sim,
            &previous,
            self.config.screen_update_timeout,
            self.config.poll_interval,
        )
        .await
        {
            Ok(frame) => self.record(frame),
            Err(e) => Some(screen_failure(e)),
        }
    }

    async fn press(&mut self, button: Button) -> Option<AssertionResult> {
        if let Err(e) = self.sim.press(button).await {
            return Some(AssertionResult::Simulator(e.to_string()));
        }
        self.next_screen().await
    }

    async fn shows_text(&self, text: &str) -> Result<bool, AssertionResult> {
        let texts = self
            .sim
            .texts()
            .await
            .map_err(|e| AssertionResult::Simulator(e.to_string()))?;
        Ok(texts.iter().any(|t| t.contains(text)))
    }

    async fn navigate_until(&mut self, text: &str, confirm: bool) -> Option<AssertionResult> {
        let mut found = false;
        for _ in 0..self.config.max_navigation_steps {
            match self.shows_text(text).await {
                Ok(true) => {
                    found = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => return Some(e),
            }

            if let Some(fail) = self.press(Button::Right).await {
                return Some(fail);
            }
        }

        if !found {
            return Some(AssertionResult::TextNotFound(text.to_string()));
        }
        if confirm {
            return self.press(Button::Both).await;
        }
        None
    }

    fn send(&mut self, request: &Request) -> Option<AssertionResult> {
        if self.pending.is_some() {
            return Some(AssertionResult::Transport(
                "A request is already in flight".into(),
            ));
        }

        log::debug!("Sending {:?}", request);
        match self.link.send(request.clone()) {
            Ok(pending) => {
                self.pending = Some(pending);
                None
            }
            Err(e) => Some(AssertionResult::Transport(e.to_string())),
        }
    }

    async fn wait_reply(&mut self) -> Result<Result<Reply, DeviceError>, AssertionResult> {
        let pending = self
            .pending
            .take()
            .ok_or(AssertionResult::NoPendingRequest)?;

        match tokio::time::timeout(self.config.reply_timeout, pending.wait()).await {
            Err(_) | Ok(Err(LinkError::Timeout)) => {
                Err(AssertionResult::Timeout(LinkError::Timeout.to_string()))
            }
            Ok(Err(LinkError::Device(e))) => Ok(Err(e)),
            Ok(Err(e)) => Err(AssertionResult::Transport(e.to_string())),
            Ok(Ok(reply)) => Ok(Ok(reply)),
        }
    }

    async fn expect(&mut self, expected: Result<Reply, DeviceError>) -> Option<AssertionResult> {
        let reply = match self.wait_reply().await {
            Ok(reply) => reply,
            Err(e) => return Some(e),
        };

        if reply != expected {
            return Some(AssertionResult::WrongReply(format!(
                "expected {:?}, got {:?}",
                expected, reply
            )));
        }

        self.outcome = Some(match expected {
            Ok(_) => CaseState::Verified,
            Err(_) => CaseState::Rejected,
        });
        None
    }

    async fn expect_signature(
        &mut self,
        public_key: &[u8; 32],
        message: &[u8],
        reference: &[u8],
    ) -> Option<AssertionResult> {
        let signature = match self.wait_reply().await {
            Ok(Ok(Reply::Signature(signature))) => signature,
            Ok(other) => {
                return Some(AssertionResult::WrongReply(format!(
                    "expected a signature, got {:?}",
                    other
                )))
            }
            Err(e) => return Some(e),
        };

        if signature != reference {
            return Some(AssertionResult::WrongReply(format!(
                "expected signature {}, got {}",
                hex::encode(reference),
                hex::encode(&signature)
            )));
        }
        if let Err(e) = verify_signature(public_key, message, &signature) {
            return Some(AssertionResult::BadSignature(e.to_string()));
        }

        self.outcome = Some(CaseState::Verified);
        None
    }

    fn finish(&mut self) -> Option<AssertionResult> {
        if self.pending.is_some() {
            return Some(AssertionResult::UnresolvedRequest);
        }
        self.outcome = Some(CaseState::Verified);
        None
    }

    async fn apply(&mut self, op: &TestOp) -> Result<Option<AssertionResult>, crate::Error> {
        let fail = match op {
            TestOp::Action(TestAction::Send(request)) => self.send(request),
            TestOp::Action(TestAction::WaitScreen) => {
                self.advance(CaseState::NavigatingScreens)?;
                self.next_screen().await
            }
            TestOp::Action(TestAction::Press(button)) => {
                self.advance(CaseState::NavigatingScreens)?;
                self.press(*button).await
            }
            TestOp::Action(TestAction::NavigateUntil { text, confirm }) => {
                self.advance(CaseState::NavigatingScreens)?;
                self.navigate_until(text, *confirm).await
            }
            TestOp::Action(TestAction::Finish) => self.finish(),
            TestOp::Assertion(TestAssertion::Reply(reply)) => {
                self.advance(CaseState::AwaitingDeviceResponse)?;
                self.expect(Ok(reply.clone())).await
            }
            TestOp::Assertion(TestAssertion::Error(error)) => {
                self.advance(CaseState::AwaitingDeviceResponse)?;
                self.expect(Err(*error)).await
            }
            TestOp::Assertion(TestAssertion::Signature {
                public_key,
                message,
                reference,
            }) => {
                self.advance(CaseState::AwaitingDeviceResponse)?;
                self.expect_signature(public_key, message, reference).await
            }
            TestOp::Assertion(TestAssertion::ScreenContains(text)) => {
                match self.shows_text(text).await {
                    Ok(true) => None,
                    Ok(false) => Some(AssertionResult::TextNotFound(text.clone())),
                    Err(e) => Some(e),
                }
            }
        };

        Ok(fail)
    }

    /// Every golden of the case must have been matched by a capture
    fn check_golden_count(&self) -> Result<Option<AssertionResult>, crate::Error> {
        if self.store.mode() != SnapshotMode::Compare {
            return Ok(None);
        }

        let expected = self.store.golden_count(self.model, &self.case)?;
        if expected != self.next_index {
            return Ok(Some(AssertionResult::UnmatchedGoldens {
                expected,
                captured: self.next_index,
            }));
        }
        Ok(None)
    }

    /// Final state of a case whose steps all passed
    fn verdict(
        &self,
        body_error: Option<String>,
    ) -> Result<Result<CaseState, AssertionResult>, crate::Error> {
        if let Some(e) = body_error {
            return Ok(Err(AssertionResult::Body(e)));
        }
        if self.pending.is_some() {
            return Ok(Err(AssertionResult::UnresolvedRequest));
        }
        let outcome = match self.outcome {
            Some(outcome) => outcome,
            None => return Ok(Err(AssertionResult::NoOutcome)),
        };

        Ok(match self.check_golden_count()? {
            Some(fail) => Err(fail),
            None => Ok(outcome),
        })
    }

    /// Build the log of the case from its steps and the way the test body ended
    pub fn conclude(
        &mut self,
        steps: Vec<TestLogStep>,
        body_error: Option<String>,
    ) -> Result<TestLog, crate::Error> {
        let mut error = None;
        let result = if steps.iter().all(|s| s.pass) {
            match self.verdict(body_error)? {
                Ok(outcome) => {
                    self.advance(outcome)?;
                    true
                }
                Err(fail) => {
                    self.advance(failure_state(&fail))?;
                    error = Some(fail);
                    false
                }
            }
        } else {
            false
        };

        Ok(TestLog {
            result,
            case: self.case.clone(),
            model: self.model,
            state: self.state,
            error,
            steps,
        })
    }
}

fn verify_signature(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let key = VerifyingKey::from_bytes(public_key)?;
    let signature = Signature::from_slice(signature)?;
    key.verify_strict(message, &signature)
}

fn screen_failure(e: ScreenError) -> AssertionResult {
    match e {
        ScreenError::Timeout => AssertionResult::Timeout(e.to_string()),
        ScreenError::Simulator(e) => AssertionResult::Simulator(e.to_string()),
    }
}

/// Execute the steps received on `script` until the first failure or until the test body
/// drops its [`Tester`]
pub async fn run_script<S: Simulator>(
    mut script: mpsc::Receiver<TestOp>,
    result_chan: mpsc::Sender<Result<(), AssertionResult>>,
    session: &mut Session<'_, S>,
) -> Result<Vec<TestLogStep>, crate::Error> {
    if let Err(e) = session.open().await {
        session.advance(CaseState::Failed)?;
        return Err(e);
    }

    let mut log = vec![];

    while let Some(op) = script.recv().await {
        log::debug!("OP: {:?}", op);

        let first_capture = session.captured();
        let fail = session.apply(&op).await?;

        let pass = fail.is_none();
        if let Some(fail) = &fail {
            result_chan.send(Err(fail.clone())).await?;
        } else {
            result_chan.send(Ok(())).await?;
        }

        log.push(TestLogStep {
            op,
            display: session.frame.as_ref().map(|f| f.png.clone()),
            captured: (first_capture..session.captured()).collect(),
            pass,
            fail: fail.clone(),
            log_lines: session.sim.drain_logs(),
        });

        if let Some(fail) = fail {
            session.advance(failure_state(&fail))?;
            break;
        }
    }

    Ok(log)
}

pub struct Tester {
    op_sender: mpsc::Sender<TestOp>,
    res_receiver: mpsc::Receiver<Result<(), AssertionResult>>,
}

impl Tester {
    pub fn new(
        op_sender: mpsc::Sender<TestOp>,
        res_receiver: mpsc::Receiver<Result<(), AssertionResult>>,
    ) -> Self {
        Tester {
            op_sender,
            res_receiver,
        }
    }

    async fn expect_reply(&mut self) -> Result<(), crate::Error> {
        self.res_receiver.recv().await.ok_or("No reply")??;
        Ok(())
    }

    async fn run(&mut self, op: TestOp) -> Result<(), crate::Error> {
        self.op_sender.send(op).await?;
        self.expect_reply().await
    }

    pub async fn send(&mut self, request: Request) -> Result<(), crate::Error> {
        self.run(TestAction::Send(request).into()).await
    }

    pub async fn wait_screen(&mut self) -> Result<(), crate::Error> {
        self.run(TestAction::WaitScreen.into()).await
    }

    pub async fn press(&mut self, button: Button) -> Result<(), crate::Error> {
        self.run(TestAction::Press(button).into()).await
    }

    pub async fn navigate_until(&mut self, text: &str) -> Result<(), crate::Error> {
        self.run(
            TestAction::NavigateUntil {
                text: text.to_string(),
                confirm: false,
            }
            .into(),
        )
        .await
    }

    pub async fn navigate_and_confirm(&mut self, text: &str) -> Result<(), crate::Error> {
        self.run(
            TestAction::NavigateUntil {
                text: text.to_string(),
                confirm: true,
            }
            .into(),
        )
        .await
    }

    /// Send a request, then walk its review screens and confirm on `confirm_text`
    pub async fn review(&mut self, request: Request, confirm_text: &str) -> Result<(), crate::Error> {
        self.send(request).await?;
        self.wait_screen().await?;
        self.navigate_and_confirm(confirm_text).await
    }

    pub async fn expect(&mut self, reply: Reply) -> Result<(), crate::Error> {
        self.run(TestAssertion::Reply(reply).into()).await
    }

    pub async fn expect_error(&mut self, error: DeviceError) -> Result<(), crate::Error> {
        self.run(TestAssertion::Error(error).into()).await
    }

    /// Expect a signature equal to `reference` that also verifies against `message`
    pub async fn expect_signature(
        &mut self,
        public_key: [u8; 32],
        message: &[u8],
        reference: Vec<u8>,
    ) -> Result<(), crate::Error> {
        self.run(
            TestAssertion::Signature {
                public_key,
                message: message.to_vec(),
                reference,
            }
            .into(),
        )
        .await
    }

    pub async fn screen_contains(&mut self, text: &str) -> Result<(), crate::Error> {
        self.run(TestAssertion::ScreenContains(text.to_string()).into())
            .await
    }

    /// Mark a case that expects no device reply as passed
    pub async fn finish(&mut self) -> Result<(), crate::Error> {
        self.run(TestAction::Finish.into()).await
    }
}

/// Run `body` against `session`, returning the log of every executed step
pub async fn execute_case<S, F, Fut>(
    session: &mut Session<'_, S>,
    body: F,
) -> Result<TestLog, crate::Error>
where
    S: Simulator,
    F: FnOnce(Tester) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), crate::Error>> + Send + 'static,
{
    let (op_sender, op_receiver) = mpsc::channel(16);
    let (res_sender, res_receiver) = mpsc::channel::<Result<(), AssertionResult>>(16);

    let tester = Tester::new(op_sender, res_receiver);
    let mut handle = tokio::spawn(async move { body(tester).await.map_err(|e| e.to_string()) });

    let steps = match run_script(op_receiver, res_sender, session).await {
        Ok(steps) => steps,
        Err(e) => {
            handle.abort();
            return Err(e);
        }
    };

    // The script ends when the body drops its tester, so it is about to return
    let body_error = match tokio::time::timeout(session.config.reply_timeout, &mut handle).await {
        Ok(Ok(Ok(()))) => None,
        Ok(Ok(Err(e))) => Some(e),
        Ok(Err(e)) => Some(format!("Test body panicked: {}", e)),
        Err(_) => {
            handle.abort();
            Some("Test body did not return".to_string())
        }
    };
    if let Some(e) = &body_error {
        log::debug!("Test body stopped: {}", e);
    }

    session.conclude(steps, body_error)
}
