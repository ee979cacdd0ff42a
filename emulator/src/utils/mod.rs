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


use std::ops::Range;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command as ProcessCommand};
use tokio::sync::mpsc;

use ::model::DeviceModel;

use crate::link::DeviceLink;

pub mod api;
pub mod model;
pub mod report;
pub mod screen;
pub mod snapshot;

use self::api::SpeculosApi;
use self::screen::Simulator;
use self::snapshot::{SnapshotMode, SnapshotStore};

pub const DEFAULT_PORT_RANGE: Range<u16> = 20000..40000;

/// Hands out TCP ports that are unique within the process
///
/// The counter starts at a random offset so concurrent test binaries are unlikely to
/// collide, and every candidate is checked with a bind before being returned.
#[derive(Debug)]
pub struct PortAllocator {
    range: Range<u16>,
    next: AtomicU32,
}

impl PortAllocator {
    pub fn new(range: Range<u16>) -> Self {
        use rand::Rng;

        let len = range.len().max(1) as u32;
        PortAllocator {
            range,
            next: AtomicU32::new(rand::thread_rng().gen_range(0..len)),
        }
    }

    pub fn global() -> &'static PortAllocator {
        static ALLOCATOR: OnceLock<PortAllocator> = OnceLock::new();
        ALLOCATOR.get_or_init(|| PortAllocator::new(DEFAULT_PORT_RANGE))
    }

    pub fn allocate(&self) -> Result<u16, crate::Error> {
        let len = self.range.len() as u32;
        for _ in 0..len {
            let offset = self.next.fetch_add(1, Ordering::Relaxed) % len;
            let port = self.range.start + offset as u16;
            if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
                return Ok(port);
            }
        }

        Err("No free port available".into())
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub speculos_bin: PathBuf,
    /// Contains the app builds as `<model>/bin/app.elf`
    pub app_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub snapshot_mode: SnapshotMode,
    pub screen_update_timeout: Duration,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
    pub startup_timeout: Duration,
    pub max_navigation_steps: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            speculos_bin: "speculos".into(),
            app_dir: "../build".into(),
            snapshots_dir: "snapshots".into(),
            snapshot_mode: SnapshotMode::Compare,
            screen_update_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            reply_timeout: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(30),
            max_navigation_steps: 64,
        }
    }
}

impl DriverConfig {
    /// Defaults overridden by `SPECULOS_BIN`, `STELLAR_APP_DIR`, `SNAPSHOTS_DIR` and
    /// `RECORD_SNAPSHOTS=1`
    pub fn from_env() -> Self {
        let mut config = DriverConfig::default();
        if let Ok(bin) = std::env::var("SPECULOS_BIN") {
            config.speculos_bin = bin.into();
        }
        if let Ok(dir) = std::env::var("STELLAR_APP_DIR") {
            config.app_dir = dir.into();
        }
        if let Ok(dir) = std::env::var("SNAPSHOTS_DIR") {
            config.snapshots_dir = dir.into();
        }
        if std::env::var("RECORD_SNAPSHOTS").as_deref() == Ok("1") {
            config.snapshot_mode = SnapshotMode::Record;
        }
        config
    }

    pub fn app_path(&self, model: DeviceModel) -> PathBuf {
        self.app_dir.join(model.name()).join("bin").join("app.elf")
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.snapshots_dir, self.snapshot_mode)
    }
}

fn forward_lines<R>(reader: R, sender: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::trace!("Log line: {}", line);
            if sender.send(line).is_err() {
                break;
            }
        }
    });
}

/// A Speculos process running the Stellar app
pub struct SpeculosInstance {
    pub model: DeviceModel,
    pub api: SpeculosApi,
    pub link: DeviceLink,
    pub api_port: u16,
    pub apdu_port: u16,

    logs: Mutex<mpsc::UnboundedReceiver<String>>,
    _process: Child,
}

impl SpeculosInstance {
    pub async fn spawn(model: DeviceModel, config: &DriverConfig) -> Result<Self, crate::Error> {
        let app = config.app_path(model);
        if !app.is_file() {
            return Err(format!("App binary not found at {}", app.display()).into());
        }

        let api_port = PortAllocator::global().allocate()?;
        let apdu_port = PortAllocator::global().allocate()?;

        let args = vec![
            "--model".to_string(),
            model.name().to_string(),
            "--display".into(),
            "headless".into(),
            "--api-port".into(),
            api_port.to_string(),
            "--apdu-port".into(),
            apdu_port.to_string(),
            "--seed".into(),
            fixtures::context::APP_SEED.into(),
            app.display().to_string(),
        ];
        log::trace!("Speculos args: {:?}", args);

        let mut child = ProcessCommand::new(&config.speculos_bin)
            .kill_on_drop(true)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (log_sender, logs) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, log_sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, log_sender);
        }

        let api = SpeculosApi::new(api_port);
        let startup = async {
            loop {
                if api.is_ready().await {
                    if let Ok(stream) = TcpStream::connect(("127.0.0.1", apdu_port)).await {
                        break stream;
                    }
                }
                tokio::time::sleep(config.poll_interval).await;
            }
        };
        let stream = tokio::time::timeout(config.startup_timeout, startup)
            .await
            .map_err(|_| format!("Speculos for {} did not start in time", model))?;
        log::debug!(
            "Speculos for {} ready (api {}, apdu {})",
            model,
            api_port,
            apdu_port
        );

        let link = DeviceLink::attach(stream, config.reply_timeout);

        Ok(SpeculosInstance {
            model,
            api,
            link,
            api_port,
            apdu_port,
            logs: Mutex::new(logs),
            _process: child,
        })
    }
}

impl Simulator for SpeculosInstance {
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error> {
        self.api.screenshot().await
    }

    async fn press(&self, button: self::model::Button) -> Result<(), crate::Error> {
        self.api.press(button).await
    }

    async fn texts(&self) -> Result<Vec<String>, crate::Error> {
        self.api.texts().await
    }

    fn drain_logs(&self) -> Vec<String> {
        match self.logs.lock() {
            Ok(mut logs) => std::iter::from_fn(|| logs.try_recv().ok()).collect(),
            Err(_) => vec![],
        }
    }
}

/// Directory for HTML reports: `REPORT_TMP_DIR` or a temporary directory kept for the
/// lifetime of the process
pub fn report_dir() -> Result<PathBuf, crate::Error> {
    if let Ok(dir) = std::env::var("REPORT_TMP_DIR") {
        let path = PathBuf::from(&dir);
        std::fs::create_dir_all(&path)?;
        return Ok(path);
    }

    // n.b. static items do not call [`Drop`] on program termination, so the directory
    // outlives the test run
    static TEMPDIR: OnceLock<Option<tempdir::TempDir>> = OnceLock::new();
    TEMPDIR
        .get_or_init(|| tempdir::TempDir::new("stellar-func-tests").ok())
        .as_ref()
        .map(|d| d.path().to_path_buf())
        .ok_or_else(|| "Unable to create the report directory".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_are_unique() {
        let allocator = PortAllocator::new(45000..45100);
        let ports = (0..20)
            .map(|_| allocator.allocate().unwrap())
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(ports.len(), 20);
        assert!(ports.iter().all(|p| (45000..45100).contains(p)));
    }

    #[test]
    fn test_busy_port_is_skipped() {
        let allocator = PortAllocator::new(46000..46002);
        let first = allocator.allocate().unwrap();
        let _busy = std::net::TcpListener::bind(("127.0.0.1", first)).unwrap();

        let second = allocator.allocate().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_app_path() {
        let config = DriverConfig {
            app_dir: "/apps".into(),
            ..Default::default()
        };
        assert_eq!(
            config.app_path(DeviceModel::NanoSP),
            PathBuf::from("/apps/nanosp/bin/app.elf")
        );
    }
}
