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


//! In-process device speaking the Stellar app's APDU protocol
//!
//! Screens are rendered with `embedded-graphics` at the resolution of the emulated model,
//! so the whole driver (navigation, snapshots, replies) can be exercised without a
//! simulator. Keys are the fixture keypairs, derived at `44'/148'/{0,1,2}'`.

use std::sync::{Arc, Mutex, MutexGuard};

use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Text};
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use fixtures::amount::format_amount;
use fixtures::xdr::{
    Asset, FeeBumpTransactionInnerTx, Memo, MuxedAccount, OperationBody, Preconditions,
    Transaction, TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
};
use fixtures::{BuiltTransaction, FixtureContext, Keypair, Network};
use model::apdu::*;
use model::{Bip32Path, DeviceError, DeviceModel};

use crate::link::DeviceLink;
use crate::utils::model::Button;
use crate::utils::screen::Simulator;
use crate::utils::DriverConfig;

pub const APP_VERSION: (u8, u8, u8) = (5, 0, 3);

const CHAR_WIDTH: u32 = 6;
const LINE_HEIGHT: u32 = 12;

/// Reply data and status word
type Response = (Vec<u8>, u16);

enum Pending {
    Now(Response),
    /// Sent once the user approves or rejects
    Later(oneshot::Receiver<Response>),
}

impl Pending {
    fn ok(data: Vec<u8>) -> Self {
        Pending::Now((data, SW_OK))
    }
}

enum Screen {
    Idle(usize),
    Settings(usize),
    Review {
        pages: Vec<Vec<String>>,
        index: usize,
        approved: Vec<u8>,
        reply: Option<oneshot::Sender<Response>>,
    },
}

struct DeviceState {
    model: DeviceModel,
    ctx: FixtureContext,
    hash_signing: bool,
    screen: Screen,
    tx: Option<(Bip32Path, Vec<u8>)>,
    logs: Vec<String>,
}

/// Wrap a label/value pair into pages of at most `lines` lines
fn paginate(model: DeviceModel, fields: &[(String, String)]) -> Vec<Vec<String>> {
    let (width, height) = model.screen_size();
    let columns = (width / CHAR_WIDTH) as usize;
    let value_lines = ((height / LINE_HEIGHT) as usize).saturating_sub(1).max(1);

    let mut pages = vec![];
    for (title, value) in fields {
        let chars = value.chars().collect::<Vec<_>>();
        let lines = chars
            .chunks(columns)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>();
        if lines.is_empty() {
            pages.push(vec![title.clone()]);
            continue;
        }

        let chunks = lines.chunks(value_lines).collect::<Vec<_>>();
        let count = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let title = match count {
                1 => title.clone(),
                _ => format!("{} ({}/{})", title, i + 1, count),
            };
            let mut page = vec![title];
            page.extend(chunk.iter().cloned());
            pages.push(page);
        }
    }
    pages
}

fn render(model: DeviceModel, lines: &[String]) -> Result<Vec<u8>, crate::Error> {
    let (width, height) = model.screen_size();
    let mut display = SimulatorDisplay::<BinaryColor>::new(Size::new(width, height));
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    let top = (height as i32 - (lines.len() as u32 * LINE_HEIGHT) as i32) / 2;
    for (i, line) in lines.iter().enumerate() {
        let baseline = top + (i as u32 * LINE_HEIGHT) as i32 + 9;
        Text::with_alignment(
            line,
            Point::new(width as i32 / 2, baseline),
            style,
            Alignment::Center,
        )
        .draw(&mut display)?;
    }

    let output_settings = OutputSettingsBuilder::new().scale(1).build();
    let png = display
        .to_grayscale_output_image(&output_settings)
        .to_base64_png()?;
    Ok(base64::decode(png)?)
}

fn muxed_address(account: &MuxedAccount) -> String {
    match account {
        MuxedAccount::Ed25519(key) => stellar_strkey::ed25519::PublicKey(key.0).to_string(),
        MuxedAccount::MuxedEd25519(muxed) => stellar_strkey::ed25519::MuxedAccount {
            ed25519: muxed.ed25519.0,
            id: muxed.id,
        }
        .to_string(),
    }
}

fn asset_name(asset: &Asset) -> String {
    let trim = |code: &[u8]| {
        let end = code.iter().position(|b| *b == 0).unwrap_or(code.len());
        String::from_utf8_lossy(&code[..end]).to_string()
    };
    match asset {
        Asset::Native => "XLM".to_string(),
        Asset::CreditAlphanum4(a) => trim(&a.asset_code.0),
        Asset::CreditAlphanum12(a) => trim(&a.asset_code.0),
    }
}

fn operation_details(body: &OperationBody) -> Vec<(String, String)> {
    match body {
        OperationBody::CreateAccount(op) => vec![
            (
                "Starting Balance".into(),
                format!("{} XLM", format_amount(op.starting_balance)),
            ),
            (
                "Destination".into(),
                stellar_strkey::ed25519::PublicKey(account_key(&op.destination)).to_string(),
            ),
        ],
        OperationBody::Payment(op) => vec![
            (
                "Send".into(),
                format!("{} {}", format_amount(op.amount), asset_name(&op.asset)),
            ),
            ("Destination".into(), muxed_address(&op.destination)),
        ],
        OperationBody::BumpSequence(op) => vec![("Bump To".into(), op.bump_to.0.to_string())],
        _ => vec![],
    }
}

fn account_key(account: &fixtures::xdr::AccountId) -> [u8; 32] {
    let fixtures::xdr::AccountId(fixtures::xdr::PublicKey::PublicKeyTypeEd25519(key)) = account;
    key.0
}

fn network_name(payload: &TransactionSignaturePayload) -> &'static str {
    if payload.network_id == Network::Public.id() {
        "Public"
    } else if payload.network_id == Network::Testnet.id() {
        "Testnet"
    } else {
        "Unknown"
    }
}

fn transaction_details(tx: &Transaction, fields: &mut Vec<(String, String)>) {
    match &tx.memo {
        Memo::None => {}
        Memo::Text(text) => fields.push((
            "Memo Text".into(),
            String::from_utf8_lossy(text.as_slice()).to_string(),
        )),
        Memo::Id(id) => fields.push(("Memo ID".into(), id.to_string())),
        Memo::Hash(hash) => fields.push(("Memo Hash".into(), hex::encode(hash.0))),
        Memo::Return(hash) => fields.push(("Memo Return".into(), hex::encode(hash.0))),
    }
    fields.push((
        "Max Fee".into(),
        format!("{} XLM", format_amount(tx.fee as i64)),
    ));
    fields.push(("Sequence Num".into(), tx.seq_num.0.to_string()));

    let (time_bounds, v2) = match &tx.cond {
        Preconditions::None => (None, None),
        Preconditions::Time(tb) => (Some(tb), None),
        Preconditions::V2(cond) => (cond.time_bounds.as_ref(), Some(cond)),
    };
    if let Some(tb) = time_bounds {
        fields.push(("Valid After".into(), tb.min_time.0.to_string()));
        fields.push(("Valid Before".into(), tb.max_time.0.to_string()));
    }
    if let Some(cond) = v2 {
        if let Some(lb) = &cond.ledger_bounds {
            fields.push((
                "Ledger Bounds".into(),
                format!("{} - {}", lb.min_ledger, lb.max_ledger),
            ));
        }
        if let Some(seq) = &cond.min_seq_num {
            fields.push(("Min Seq Num".into(), seq.0.to_string()));
        }
    }

    fields.push(("Tx Source".into(), muxed_address(&tx.source_account)));

    let count = tx.operations.len();
    for (i, op) in tx.operations.iter().enumerate() {
        fields.push((
            format!("Operation {} of {}", i + 1, count),
            op.body.name().to_string(),
        ));
        fields.extend(operation_details(&op.body));
        if let Some(source) = &op.source_account {
            fields.push(("Op Source".into(), muxed_address(source)));
        }
    }
}

/// Review fields of a transaction, in the order they are shown
fn transaction_fields(payload: &TransactionSignaturePayload) -> Vec<(String, String)> {
    let mut fields = vec![("Network".to_string(), network_name(payload).to_string())];
    match &payload.tagged_transaction {
        TransactionSignaturePayloadTaggedTransaction::Tx(tx) => {
            transaction_details(tx, &mut fields)
        }
        TransactionSignaturePayloadTaggedTransaction::TxFeeBump(fee_bump) => {
            fields.push(("Fee Source".into(), muxed_address(&fee_bump.fee_source)));
            fields.push((
                "Max Fee".into(),
                format!("{} XLM", format_amount(fee_bump.fee)),
            ));
            match &fee_bump.inner_tx {
                FeeBumpTransactionInnerTx::Tx(inner) => transaction_details(&inner.tx, &mut fields),
            }
        }
    }
    fields
}

impl DeviceState {
    fn log(&mut self, line: String) {
        log::trace!("{}", line);
        self.logs.push(line);
    }

    fn lines(&self) -> Vec<String> {
        let (major, minor, patch) = APP_VERSION;
        let lines: Vec<&str> = match &self.screen {
            Screen::Idle(0) => vec!["Stellar", "is ready"],
            Screen::Idle(1) => vec!["Settings"],
            Screen::Idle(2) => {
                return vec![
                    "Version".to_string(),
                    format!("{}.{}.{}", major, minor, patch),
                ]
            }
            Screen::Idle(_) => vec!["Quit"],
            Screen::Settings(0) if self.hash_signing => vec!["Hash signing", "Enabled"],
            Screen::Settings(0) => vec!["Hash signing", "Disabled"],
            Screen::Settings(_) => vec!["Back"],
            Screen::Review { pages, index, .. } => return pages[*index].clone(),
        };
        lines.into_iter().map(String::from).collect()
    }

    fn press(&mut self, button: Button) {
        self.log(format!("Button {:?}", button));

        let wrap = |page: usize, len: usize| match button {
            Button::Left => (page + len - 1) % len,
            Button::Right => (page + 1) % len,
            Button::Both => page,
        };

        let next = match (&mut self.screen, button) {
            (Screen::Idle(1), Button::Both) => Some(Screen::Settings(0)),
            (Screen::Idle(page), _) => {
                *page = wrap(*page, 4);
                None
            }
            (Screen::Settings(0), Button::Both) => {
                self.hash_signing = !self.hash_signing;
                None
            }
            (Screen::Settings(_), Button::Both) => Some(Screen::Idle(0)),
            (Screen::Settings(page), _) => {
                *page = wrap(*page, 2);
                None
            }
            (Screen::Review { pages, index, .. }, Button::Left) => {
                *index = index.saturating_sub(1).min(pages.len() - 1);
                None
            }
            (Screen::Review { pages, index, .. }, Button::Right) => {
                *index = (*index + 1).min(pages.len() - 1);
                None
            }
            (
                Screen::Review {
                    pages,
                    index,
                    approved,
                    reply,
                },
                Button::Both,
            ) => {
                let response = if *index == pages.len() - 2 {
                    (std::mem::take(approved), SW_OK)
                } else if *index == pages.len() - 1 {
                    (vec![], SW_DENY)
                } else {
                    return;
                };

                if let Some(reply) = reply.take() {
                    let _ = reply.send(response);
                }
                Some(Screen::Idle(0))
            }
        };

        if let Some(next) = next {
            self.screen = next;
        }
    }

    fn keypair(&self, path: &Bip32Path) -> Result<Keypair, DeviceError> {
        path.stellar_account()
            .and_then(|account| self.ctx.keypair(account))
            .cloned()
            .ok_or(DeviceError::BadState)
    }

    fn review(
        &mut self,
        fields: Vec<(String, String)>,
        confirm: &str,
        approved: Vec<u8>,
    ) -> Result<Pending, DeviceError> {
        let mut pages = paginate(self.model, &fields);
        pages.push(vec![confirm.to_string()]);
        pages.push(vec!["Reject".to_string()]);

        let (sender, receiver) = oneshot::channel();
        self.screen = Screen::Review {
            pages,
            index: 0,
            approved,
            reply: Some(sender),
        };
        Ok(Pending::Later(receiver))
    }

    fn get_public_key(&mut self, command: &Command) -> Result<Pending, DeviceError> {
        let (path, _) = Bip32Path::decode(&command.data)?;
        let keypair = self.keypair(&path)?;

        match command.p2 {
            P2_CONFIRM => self.review(
                vec![("Address".into(), keypair.address())],
                "Approve",
                keypair.public_key().to_vec(),
            ),
            _ => Ok(Pending::ok(keypair.public_key().to_vec())),
        }
    }

    fn sign_transaction(&mut self, command: &Command) -> Result<Pending, DeviceError> {
        match command.p1 {
            P1_FIRST => {
                let (path, used) = Bip32Path::decode(&command.data)?;
                self.tx = Some((path, command.data[used..].to_vec()));
            }
            P1_MORE => {
                let (_, data) = self.tx.as_mut().ok_or(DeviceError::BadState)?;
                data.extend_from_slice(&command.data);
            }
            _ => return Err(DeviceError::BadState),
        }
        if command.p2 == P2_MORE {
            return Ok(Pending::ok(vec![]));
        }

        let (path, data) = self.tx.take().ok_or(DeviceError::BadState)?;
        let keypair = self.keypair(&path)?;
        let payload = BuiltTransaction::decode(&data).map_err(|e| {
            log::debug!("Unable to parse transaction: {}", e);
            DeviceError::ParsingFailed
        })?;

        let hash = Sha256::digest(&data);
        let signature = keypair.sign(&hash);
        self.review(
            transaction_fields(&payload),
            "Finalize",
            signature.to_vec(),
        )
    }

    fn sign_hash(&mut self, command: &Command) -> Result<Pending, DeviceError> {
        if !self.hash_signing {
            return Err(DeviceError::HashSigningNotAllowed);
        }

        let (path, used) = Bip32Path::decode(&command.data)?;
        let hash = &command.data[used..];
        if hash.len() != 32 {
            return Err(DeviceError::WrongDataLength);
        }
        let keypair = self.keypair(&path)?;
        let signature = keypair.sign(hash);

        self.review(
            vec![("Hash".into(), hex::encode(hash))],
            "Approve",
            signature.to_vec(),
        )
    }

    fn handle(&mut self, raw: &[u8]) -> Pending {
        let command = match Command::decode(raw) {
            Ok(command) => command,
            Err(e) => return Pending::Now((vec![], e.status())),
        };
        self.log(format!(
            "APDU ins={:02X} p1={:02X} p2={:02X} len={}",
            command.ins,
            command.p1,
            command.p2,
            command.data.len()
        ));

        let result = if command.cla != CLA {
            Err(DeviceError::WrongClass)
        } else if matches!(self.screen, Screen::Review { .. }) {
            Err(DeviceError::BadState)
        } else {
            match command.ins {
                INS_GET_PK => self.get_public_key(&command),
                INS_SIGN_TX => self.sign_transaction(&command),
                INS_SIGN_TX_HASH => self.sign_hash(&command),
                INS_GET_CONF => {
                    let (major, minor, patch) = APP_VERSION;
                    Ok(Pending::ok(vec![
                        self.hash_signing as u8,
                        major,
                        minor,
                        patch,
                    ]))
                }
                _ => Err(DeviceError::UnknownInstruction),
            }
        };

        result.unwrap_or_else(|e| {
            self.log(format!("Replying with {}", e));
            Pending::Now((vec![], e.status()))
        })
    }
}

async fn serve(mut stream: DuplexStream, state: Arc<Mutex<DeviceState>>) {
    loop {
        let mut len = [0u8; 4];
        if stream.read_exact(&mut len).await.is_err() {
            break;
        }
        let mut apdu = vec![0u8; u32::from_be_bytes(len) as usize];
        if stream.read_exact(&mut apdu).await.is_err() {
            break;
        }

        let pending = match state.lock() {
            Ok(mut state) => state.handle(&apdu),
            Err(_) => break,
        };
        let (data, sw) = match pending {
            Pending::Now(response) => response,
            Pending::Later(receiver) => match receiver.await {
                Ok(response) => response,
                Err(_) => break,
            },
        };

        if stream.write_all(&frame_response(&data, sw)).await.is_err() {
            break;
        }
    }

    log::trace!("Fake device server finished");
}

/// A device emulated in-process, reachable through [`FakeDevice::link`]
pub struct FakeDevice {
    pub model: DeviceModel,
    pub link: DeviceLink,

    state: Arc<Mutex<DeviceState>>,
    server: JoinHandle<()>,
}

impl FakeDevice {
    pub fn spawn(model: DeviceModel, config: &DriverConfig) -> Result<Self, crate::Error> {
        let state = Arc::new(Mutex::new(DeviceState {
            model,
            ctx: FixtureContext::new()?,
            hash_signing: false,
            screen: Screen::Idle(0),
            tx: None,
            logs: vec![],
        }));

        let (client, server) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve(server, Arc::clone(&state)));
        let link = DeviceLink::attach(client, config.reply_timeout);

        log::debug!("Spawned fake {} device", model);

        Ok(FakeDevice {
            model,
            link,
            state,
            server,
        })
    }

    fn state(&self) -> Result<MutexGuard<'_, DeviceState>, crate::Error> {
        self.state
            .lock()
            .map_err(|_| "Fake device state poisoned".into())
    }

    pub fn hash_signing(&self) -> Result<bool, crate::Error> {
        Ok(self.state()?.hash_signing)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl Simulator for FakeDevice {
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error> {
        let lines = self.state()?.lines();
        render(self.model, &lines)
    }

    async fn press(&self, button: Button) -> Result<(), crate::Error> {
        self.state()?.press(button);
        Ok(())
    }

    async fn texts(&self) -> Result<Vec<String>, crate::Error> {
        Ok(self.state()?.lines())
    }

    fn drain_logs(&self) -> Vec<String> {
        match self.state() {
            Ok(mut state) => std::mem::take(&mut state.logs),
            Err(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_paginate_address() {
        let address = "GDUTHCF37UX32EMANXIL2WOOVEDZ47GHBTT3DYKU6EKM37SOIZXM2FN7".to_string();
        let fields = vec![("Address".to_string(), address)];

        let pages = paginate(DeviceModel::NanoS, &fields);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], vec!["Address (1/3)", "GDUTHCF37UX32EMANXIL2"]);
        assert_eq!(pages[2], vec!["Address (3/3)", "KM37SOIZXM2FN7"]);

        let pages = paginate(DeviceModel::NanoX, &fields);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 4);
    }

    #[test]
    fn test_render_size() {
        for model in DeviceModel::ALL {
            let png = render(model, &["Stellar".to_string()]).unwrap();
            let image = image::load_from_memory(&png).unwrap();
            let (width, height) = model.screen_size();
            assert_eq!((image.width(), image.height()), (width, height));
        }
    }

    #[test]
    fn test_transaction_fields() {
        let ctx = FixtureContext::new().unwrap();
        let entry = fixtures::catalog::find("opCreateAccount").unwrap();
        let data = entry.signature_base(&ctx).unwrap();
        let payload = BuiltTransaction::decode(&data).unwrap();

        let fields = transaction_fields(&payload);
        let get = |title: &str| {
            fields
                .iter()
                .find(|(t, _)| t == title)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("Network").as_deref(), Some("Public"));
        assert_eq!(get("Memo Text").as_deref(), Some("hello world"));
        assert_eq!(get("Max Fee").as_deref(), Some("0.00001 XLM"));
        assert_eq!(get("Sequence Num").as_deref(), Some("103720918407102568"));
        assert_eq!(get("Operation 1 of 1").as_deref(), Some("CreateAccount"));
    }

    #[tokio::test]
    async fn test_settings_toggle() {
        let device = FakeDevice::spawn(DeviceModel::NanoSP, &DriverConfig::default()).unwrap();
        assert!(!device.hash_signing().unwrap());

        device.press(Button::Right).await.unwrap();
        assert_eq!(device.texts().await.unwrap(), vec!["Settings"]);
        device.press(Button::Both).await.unwrap();
        device.press(Button::Both).await.unwrap();
        assert_eq!(
            device.texts().await.unwrap(),
            vec!["Hash signing", "Enabled"]
        );
        assert!(device.hash_signing().unwrap());

        let (enabled, version) = device.link.get_app_configuration().await.unwrap();
        assert!(enabled);
        assert_eq!(version, "5.0.3");
    }

    #[tokio::test]
    async fn test_unknown_account_is_refused() {
        let device = FakeDevice::spawn(DeviceModel::NanoS, &DriverConfig::default()).unwrap();
        let result = device
            .link
            .get_public_key(Bip32Path::stellar(7), false)
            .await;
        assert_eq!(
            result,
            Err(crate::link::LinkError::Device(DeviceError::BadState))
        );
    }

    #[tokio::test]
    async fn test_garbage_transaction() {
        let device = FakeDevice::spawn(DeviceModel::NanoS, &DriverConfig::default()).unwrap();
        let result = device
            .link
            .sign_transaction(Bip32Path::stellar(0), vec![0xFF; 40])
            .await;
        assert_eq!(
            result,
            Err(crate::link::LinkError::Device(DeviceError::ParsingFailed))
        );
    }
}
