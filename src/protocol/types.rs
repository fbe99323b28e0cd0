//! X11 Forwarding Protocol Types

use bytes::{Buf, BufMut, Bytes, BytesMut};
use rand::RngCore;
use serde::Serialize;

use super::constants::*;
use super::cookie::CookieGenerator;

/// Body of the `x11-req` request, sent once per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardingRequest {
    pub single_connection: bool,
    pub auth_protocol: String,
    pub auth_cookie: String,
    pub screen_number: u32,
}

/// Errors decoding a request payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload truncated while reading {0}")]
    Truncated(&'static str),
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("{0} trailing bytes after request")]
    TrailingBytes(usize),
}

impl ForwardingRequest {
    /// Build the default request: MIT cookie scheme, screen 0, unlimited
    /// connections, cookie taken from `cookies`.
    pub fn new<R: RngCore>(cookies: &mut CookieGenerator<R>) -> Self {
        Self {
            single_connection: false,
            auth_protocol: AUTH_MIT_MAGIC_COOKIE_1.to_string(),
            auth_cookie: cookies.generate(COOKIE_BYTES),
            screen_number: 0,
        }
    }

    pub fn with_single_connection(mut self, single_connection: bool) -> Self {
        self.single_connection = single_connection;
        self
    }

    pub fn with_screen_number(mut self, screen_number: u32) -> Self {
        self.screen_number = screen_number;
        self
    }

    /// Serialize in field order using SSH wire types
    /// (boolean, string, string, uint32).
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            1 + 4 + self.auth_protocol.len() + 4 + self.auth_cookie.len() + 4,
        );
        buf.put_u8(self.single_connection as u8);
        put_string(&mut buf, &self.auth_protocol);
        put_string(&mut buf, &self.auth_cookie);
        buf.put_u32(self.screen_number);
        buf.freeze()
    }

    /// Parse a payload produced by [`ForwardingRequest::encode`]
    pub fn decode(mut payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.remaining() < 1 {
            return Err(DecodeError::Truncated("single_connection"));
        }
        let single_connection = payload.get_u8() != 0;
        let auth_protocol = get_string(&mut payload, "auth_protocol")?;
        let auth_cookie = get_string(&mut payload, "auth_cookie")?;
        if payload.remaining() < 4 {
            return Err(DecodeError::Truncated("screen_number"));
        }
        let screen_number = payload.get_u32();
        if payload.has_remaining() {
            return Err(DecodeError::TrailingBytes(payload.remaining()));
        }

        Ok(Self {
            single_connection,
            auth_protocol,
            auth_cookie,
            screen_number,
        })
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

fn get_string(payload: &mut &[u8], field: &'static str) -> Result<String, DecodeError> {
    if payload.remaining() < 4 {
        return Err(DecodeError::Truncated(field));
    }
    let len = payload.get_u32() as usize;
    if payload.remaining() < len {
        return Err(DecodeError::Truncated(field));
    }
    let raw = payload.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
}
