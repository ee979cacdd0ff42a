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

//! APDU encoding of the Stellar app commands and the length-prefixed framing used by the
//! simulator's APDU socket

use super::{Bip32Path, DeviceError, Reply, Request};

pub const CLA: u8 = 0xE0;

pub const INS_GET_PK: u8 = 0x02;
pub const INS_SIGN_TX: u8 = 0x04;
pub const INS_GET_CONF: u8 = 0x06;
pub const INS_SIGN_TX_HASH: u8 = 0x08;

pub const P1_FIRST: u8 = 0x00;
pub const P1_MORE: u8 = 0x80;
pub const P2_LAST: u8 = 0x00;
pub const P2_MORE: u8 = 0x80;
pub const P2_CONFIRM: u8 = 0x01;
pub const P2_NON_CONFIRM: u8 = 0x00;

pub const SW_OK: u16 = 0x9000;
pub const SW_DENY: u16 = 0x6985;
pub const SW_TX_HASH_SIGNING_MODE_NOT_ENABLED: u16 = 0x6C66;
pub const SW_TX_PARSING_FAIL: u16 = 0xB005;
pub const SW_BAD_STATE: u16 = 0xB007;
pub const SW_WRONG_DATA_LENGTH: u16 = 0x6A87;
pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;
pub const SW_CLA_NOT_SUPPORTED: u16 = 0x6E00;

/// Maximum payload of a single command
pub const APDU_MAX_PAYLOAD: usize = 150;

pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl Command {
    fn new(ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Command {
            cla: CLA,
            ins,
            p1,
            p2,
            data,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = vec![self.cla, self.ins, self.p1, self.p2, self.data.len() as u8];
        v.extend_from_slice(&self.data);
        v
    }

    pub fn decode(raw: &[u8]) -> Result<Self, DeviceError> {
        if raw.len() < 5 || raw.len() != 5 + raw[4] as usize {
            return Err(DeviceError::WrongDataLength);
        }

        Ok(Command {
            cla: raw[0],
            ins: raw[1],
            p1: raw[2],
            p2: raw[3],
            data: raw[5..].to_vec(),
        })
    }
}

impl Request {
    /// Split the request into the sequence of commands sent to the device. Every command
    /// except the last one is acknowledged with an empty `SW_OK`.
    pub fn to_commands(&self) -> Vec<Command> {
        match self {
            Request::GetPublicKey { path, display } => vec![Command::new(
                INS_GET_PK,
                P1_FIRST,
                if *display { P2_CONFIRM } else { P2_NON_CONFIRM },
                path.encode(),
            )],
            Request::SignHash { path, hash } => {
                let mut data = path.encode();
                data.extend_from_slice(hash);
                vec![Command::new(INS_SIGN_TX_HASH, P1_FIRST, P2_LAST, data)]
            }
            Request::GetAppConfiguration => {
                vec![Command::new(INS_GET_CONF, P1_FIRST, P2_LAST, vec![])]
            }
            Request::SignTransaction { path, data } => {
                let mut payload = path.encode();
                payload.extend_from_slice(data);

                let chunks = payload.chunks(APDU_MAX_PAYLOAD).collect::<Vec<_>>();
                let last = chunks.len() - 1;
                chunks
                    .into_iter()
                    .enumerate()
                    .map(|(i, chunk)| {
                        Command::new(
                            INS_SIGN_TX,
                            if i == 0 { P1_FIRST } else { P1_MORE },
                            if i == last { P2_LAST } else { P2_MORE },
                            chunk.to_vec(),
                        )
                    })
                    .collect()
            }
        }
    }

    pub fn path(&self) -> Option<&Bip32Path> {
        match self {
            Request::GetPublicKey { path, .. }
            | Request::SignHash { path, .. }
            | Request::SignTransaction { path, .. } => Some(path),
            Request::GetAppConfiguration => None,
        }
    }

    /// Interpret the response to the last command of this request
    pub fn parse_reply(&self, data: &[u8], sw: u16) -> Result<Reply, DeviceError> {
        if sw != SW_OK {
            return Err(DeviceError::from_status(sw));
        }

        match self {
            Request::GetPublicKey { .. } => {
                let key: [u8; 32] = data.try_into().map_err(|_| DeviceError::MalformedReply)?;
                Ok(Reply::PublicKey(key))
            }
            Request::SignHash { .. } | Request::SignTransaction { .. } => {
                if data.len() != SIGNATURE_LEN {
                    return Err(DeviceError::MalformedReply);
                }
                Ok(Reply::Signature(data.to_vec()))
            }
            Request::GetAppConfiguration => match data {
                [hash_signing, major, minor, patch] => Ok(Reply::AppConfiguration {
                    hash_signing: *hash_signing != 0,
                    version: format!("{}.{}.{}", major, minor, patch),
                }),
                _ => Err(DeviceError::MalformedReply),
            },
        }
    }
}

/// Frame a command for the simulator's APDU socket: 4-byte big-endian length + command
pub fn frame_command(apdu: &[u8]) -> Vec<u8> {
    let mut v = (apdu.len() as u32).to_be_bytes().to_vec();
    v.extend_from_slice(apdu);
    v
}

/// Frame a response: 4-byte big-endian length of `data`, `data`, 2-byte status word
pub fn frame_response(data: &[u8], sw: u16) -> Vec<u8> {
    let mut v = (data.len() as u32).to_be_bytes().to_vec();
    v.extend_from_slice(data);
    v.extend_from_slice(&sw.to_be_bytes());
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_public_key_command() {
        let req = Request::GetPublicKey {
            path: Bip32Path::stellar(0),
            display: true,
        };
        let cmds = req.to_commands();
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            hex::encode(cmds[0].encode()),
            "e00200010d038000002c8000009480000000"
        );
    }

    #[test]
    fn test_sign_transaction_chunks() {
        let req = Request::SignTransaction {
            path: Bip32Path::stellar(0),
            data: vec![0x42; 300],
        };
        let cmds = req.to_commands();

        // 13 bytes of path + 300 bytes of transaction
        assert_eq!(cmds.len(), 3);
        assert_eq!((cmds[0].p1, cmds[0].p2), (P1_FIRST, P2_MORE));
        assert_eq!((cmds[1].p1, cmds[1].p2), (P1_MORE, P2_MORE));
        assert_eq!((cmds[2].p1, cmds[2].p2), (P1_MORE, P2_LAST));
        assert_eq!(cmds[0].data.len(), APDU_MAX_PAYLOAD);
        assert_eq!(cmds[2].data.len(), 313 - 2 * APDU_MAX_PAYLOAD);

        let reassembled = cmds.iter().flat_map(|c| c.data.clone()).collect::<Vec<_>>();
        assert_eq!(&reassembled[13..], &[0x42; 300][..]);
    }

    #[test]
    fn test_command_decode() {
        let cmd = Command::new(INS_SIGN_TX_HASH, P1_FIRST, P2_LAST, vec![1, 2, 3]);
        assert_eq!(Command::decode(&cmd.encode()), Ok(cmd));
        assert_eq!(
            Command::decode(&[0xE0, 0x02, 0x00]),
            Err(DeviceError::WrongDataLength)
        );
    }

    #[test]
    fn test_parse_reply() {
        let req = Request::SignHash {
            path: Bip32Path::stellar(0),
            hash: [0; 32],
        };
        assert_eq!(
            req.parse_reply(&[], SW_TX_HASH_SIGNING_MODE_NOT_ENABLED),
            Err(DeviceError::HashSigningNotAllowed)
        );
        assert_eq!(
            req.parse_reply(&[0; 63], SW_OK),
            Err(DeviceError::MalformedReply)
        );
        assert_eq!(
            req.parse_reply(&[7; 64], SW_OK),
            Ok(Reply::Signature(vec![7; 64]))
        );

        assert_eq!(
            Request::GetAppConfiguration.parse_reply(&[1, 5, 0, 3], SW_OK),
            Ok(Reply::AppConfiguration {
                hash_signing: true,
                version: "5.0.3".into()
            })
        );
    }

    #[test]
    fn test_framing() {
        assert_eq!(frame_command(&[0xE0, 0x06]), vec![0, 0, 0, 2, 0xE0, 0x06]);
        assert_eq!(
            frame_response(&[0xAA], SW_OK),
            vec![0, 0, 0, 1, 0xAA, 0x90, 0x00]
        );
    }
}
