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

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use model::apdu::{frame_command, SW_OK};
use model::{Bip32Path, DeviceError, Reply, Request};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The device answered with an error status word
    Device(DeviceError),
    Io(String),
    Timeout,
    Closed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Device(e) => write!(f, "{}", e),
            LinkError::Io(e) => write!(f, "Transport error: {}", e),
            LinkError::Timeout => write!(f, "Timeout waiting for the device reply"),
            LinkError::Closed => write!(f, "Device link closed"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        LinkError::Io(e.to_string())
    }
}

impl From<DeviceError> for LinkError {
    fn from(e: DeviceError) -> Self {
        LinkError::Device(e)
    }
}

/// Largest response body accepted from the device, status word excluded
pub const MAX_RESPONSE_LEN: usize = 260;

type ReplySender = oneshot::Sender<Result<Reply, LinkError>>;

/// Reply to a request that is still being processed by the device
#[derive(Debug)]
pub struct PendingReply(oneshot::Receiver<Result<Reply, LinkError>>);

impl PendingReply {
    pub async fn wait(self) -> Result<Reply, LinkError> {
        self.0.await.map_err(|_| LinkError::Closed)?
    }
}

/// Typed APDU link to a device
///
/// Requests are queued to a background task that owns the stream, so the caller can keep
/// pressing buttons while a request waits for the user's approval.
#[derive(Debug, Clone)]
pub struct DeviceLink {
    requests: mpsc::UnboundedSender<(Request, ReplySender)>,
}

impl DeviceLink {
    pub fn attach<S>(mut stream: S, reply_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        log::trace!("Attaching APDU link");

        let (requests, mut incoming) = mpsc::unbounded_channel::<(Request, ReplySender)>();
        tokio::spawn(async move {
            while let Some((request, reply)) = incoming.recv().await {
                let result = exchange(&mut stream, &request, reply_timeout).await;
                if let Err(e) = &result {
                    log::debug!("Request {:?} failed: {}", request, e);
                }
                let _ = reply.send(result);
            }
            log::trace!("APDU link task finished");
        });

        DeviceLink { requests }
    }

    pub fn send(&self, request: Request) -> Result<PendingReply, LinkError> {
        let (sender, receiver) = oneshot::channel();
        self.requests
            .send((request, sender))
            .map_err(|_| LinkError::Closed)?;
        Ok(PendingReply(receiver))
    }

    pub async fn request(&self, request: Request) -> Result<Reply, LinkError> {
        self.send(request)?.wait().await
    }

    pub async fn get_public_key(
        &self,
        path: Bip32Path,
        display: bool,
    ) -> Result<[u8; 32], LinkError> {
        match self.request(Request::GetPublicKey { path, display }).await? {
            Reply::PublicKey(key) => Ok(key),
            _ => Err(DeviceError::MalformedReply.into()),
        }
    }

    pub async fn sign_hash(&self, path: Bip32Path, hash: [u8; 32]) -> Result<Vec<u8>, LinkError> {
        match self.request(Request::SignHash { path, hash }).await? {
            Reply::Signature(sig) => Ok(sig),
            _ => Err(DeviceError::MalformedReply.into()),
        }
    }

    pub async fn sign_transaction(
        &self,
        path: Bip32Path,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, LinkError> {
        match self.request(Request::SignTransaction { path, data }).await? {
            Reply::Signature(sig) => Ok(sig),
            _ => Err(DeviceError::MalformedReply.into()),
        }
    }

    /// Returns whether hash signing is enabled and the app version
    pub async fn get_app_configuration(&self) -> Result<(bool, String), LinkError> {
        match self.request(Request::GetAppConfiguration).await? {
            Reply::AppConfiguration {
                hash_signing,
                version,
            } => Ok((hash_signing, version)),
            _ => Err(DeviceError::MalformedReply.into()),
        }
    }
}

async fn exchange<S>(
    stream: &mut S,
    request: &Request,
    reply_timeout: Duration,
) -> Result<Reply, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let commands = request.to_commands();
    let last = commands.len().saturating_sub(1);

    for (i, command) in commands.iter().enumerate() {
        let apdu = command.encode();
        log::trace!("> {:02X?}", apdu);
        stream.write_all(&frame_command(&apdu)).await?;

        let (data, sw) = tokio::time::timeout(reply_timeout, read_response(stream))
            .await
            .map_err(|_| LinkError::Timeout)??;
        log::trace!("< {:02X?} {:04X}", data, sw);

        if i < last {
            if sw != SW_OK {
                return Err(DeviceError::from_status(sw).into());
            }
            continue;
        }

        return Ok(request.parse_reply(&data, sw)?);
    }

    Err(LinkError::Closed)
}

async fn read_response<S>(stream: &mut S) -> Result<(Vec<u8>, u16), LinkError>
where
    S: AsyncRead + Unpin,
{
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).await?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_RESPONSE_LEN {
        return Err(LinkError::Io(format!(
            "Response of {} bytes exceeds the {} bytes limit",
            len, MAX_RESPONSE_LEN
        )));
    }

    let mut data = vec![0u8; len + 2];
    stream.read_exact(&mut data).await?;
    let sw = u16::from_be_bytes([data[len], data[len + 1]]);
    data.truncate(len);

    Ok((data, sw))
}

#[cfg(test)]
mod tests {
    use super::*;

    use model::apdu::{frame_response, Command, SW_DENY};

    async fn read_command<S: AsyncRead + Unpin>(stream: &mut S) -> Command {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await.unwrap();
        let mut apdu = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut apdu).await.unwrap();
        Command::decode(&apdu).unwrap()
    }

    #[tokio::test]
    async fn test_chunked_request() {
        let (client, mut server) = tokio::io::duplex(1024);
        let link = DeviceLink::attach(client, Duration::from_secs(5));

        let data = vec![0xAA; 400];
        let pending = link
            .send(Request::SignTransaction {
                path: Bip32Path::stellar(0),
                data: data.clone(),
            })
            .unwrap();

        let mut received = vec![];
        loop {
            let cmd = read_command(&mut server).await;
            received.extend(cmd.data);
            if cmd.p2 == model::apdu::P2_LAST {
                server
                    .write_all(&frame_response(&[0x11; 64], SW_OK))
                    .await
                    .unwrap();
                break;
            }
            server.write_all(&frame_response(&[], SW_OK)).await.unwrap();
        }

        let mut expected = Bip32Path::stellar(0).encode();
        expected.extend(data);
        assert_eq!(received, expected);
        assert_eq!(pending.wait().await, Ok(Reply::Signature(vec![0x11; 64])));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (client, mut server) = tokio::io::duplex(1024);
        let link = DeviceLink::attach(client, Duration::from_secs(5));

        let pending = link
            .send(Request::SignHash {
                path: Bip32Path::stellar(0),
                hash: [0; 32],
            })
            .unwrap();
        read_command(&mut server).await;
        server.write_all(&frame_response(&[], SW_DENY)).await.unwrap();

        assert_eq!(
            pending.wait().await,
            Err(LinkError::Device(DeviceError::UserRejected))
        );
    }

    #[tokio::test]
    async fn test_reply_timeout() {
        let (client, mut server) = tokio::io::duplex(1024);
        let link = DeviceLink::attach(client, Duration::from_millis(50));

        let pending = link.send(Request::GetAppConfiguration).unwrap();
        read_command(&mut server).await;

        assert_eq!(pending.wait().await, Err(LinkError::Timeout));
    }

    #[tokio::test]
    async fn test_oversized_response() {
        let (client, mut server) = tokio::io::duplex(1024);
        let link = DeviceLink::attach(client, Duration::from_secs(5));

        let pending = link.send(Request::GetAppConfiguration).unwrap();
        read_command(&mut server).await;
        server.write_all(&[0xFF; 4]).await.unwrap();

        match pending.wait().await {
            Err(LinkError::Io(e)) => assert!(e.contains("4294967295"), "{}", e),
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
