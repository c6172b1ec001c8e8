//! Client-facing buffers of one bound device.
//!
//! The client side writes commands and requests and reads replies and
//! observations through a [`DeviceClient`]; the dispatcher drains and fills
//! the same [`Mailbox`] once per cycle. Every access goes through one mutex,
//! so neither side ever sees a partially written buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::device::{Capabilities, DeviceId};
use crate::error::{Error, Result};
use crate::messages::{decode, ClientToken, Reply};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Latest observation published for a device.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub sim_time_ms: u64,
    /// Increments on every publish.
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl Observation {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.payload)
    }
}

#[derive(Default)]
struct Buffers {
    command: Option<Vec<u8>>,
    requests: VecDeque<(ClientToken, Vec<u8>)>,
    replies: Vec<Reply>,
    observation: Option<Observation>,
    published: u64,
}

pub struct Mailbox {
    device: DeviceId,
    capabilities: Capabilities,
    buffers: Mutex<Buffers>,
}

impl Mailbox {
    pub fn new(device: DeviceId, capabilities: Capabilities) -> Self {
        Self { device, capabilities, buffers: Mutex::new(Buffers::default()) }
    }

    fn buffers(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Newest command replaces any unread one.
    pub fn put_command(&self, bytes: Vec<u8>) -> Result<()> {
        if !self.capabilities.accepts_commands {
            warn!(device = %self.device, "command refused");
            return Err(Error::CommandsNotAccepted(self.device));
        }
        self.buffers().command = Some(bytes);
        Ok(())
    }

    pub fn put_request(&self, token: ClientToken, bytes: Vec<u8>) -> Result<()> {
        let mut buffers = self.buffers();
        if buffers.requests.len() >= self.capabilities.request_queue_len {
            return Err(Error::RequestQueueFull(self.device));
        }
        buffers.requests.push_back((token, bytes));
        Ok(())
    }

    /// Move the pending command, if any, into `scratch`. A command longer
    /// than `scratch` is consumed and reported as malformed.
    pub fn pull_command(&self, scratch: &mut [u8]) -> Result<Option<usize>> {
        let Some(command) = self.buffers().command.take() else {
            return Ok(None);
        };
        copy_bounded(&command, scratch).map(Some)
    }

    /// Pop at most one pending request into `scratch`. An oversized request
    /// is consumed; the error carries its token so the client can be told.
    pub fn pull_request(
        &self,
        scratch: &mut [u8],
    ) -> std::result::Result<Option<(ClientToken, usize)>, (ClientToken, Error)> {
        let Some((token, request)) = self.buffers().requests.pop_front() else {
            return Ok(None);
        };
        match copy_bounded(&request, scratch) {
            Ok(len) => Ok(Some((token, len))),
            Err(e) => Err((token, e)),
        }
    }

    /// A token holds at most as many replies as the request queue is deep;
    /// the oldest uncollected one goes first.
    pub fn push_reply(&self, reply: Reply) {
        let limit = self.capabilities.request_queue_len.max(1);
        let mut buffers = self.buffers();
        let held = buffers.replies.iter().filter(|r| r.token == reply.token).count();
        if held >= limit {
            if let Some(index) = buffers.replies.iter().position(|r| r.token == reply.token) {
                warn!(device = %self.device, token = reply.token.0, "dropping uncollected reply");
                buffers.replies.remove(index);
            }
        }
        buffers.replies.push(reply);
    }

    /// Forget everything queued for or addressed to `token`.
    pub fn discard(&self, token: ClientToken) {
        let mut buffers = self.buffers();
        buffers.requests.retain(|(t, _)| *t != token);
        buffers.replies.retain(|r| r.token != token);
    }

    pub fn publish(&self, sim_time_ms: u64, payload: Vec<u8>) {
        let mut buffers = self.buffers();
        buffers.published += 1;
        let seq = buffers.published;
        buffers.observation = Some(Observation { sim_time_ms, seq, payload });
    }

    pub fn take_reply(&self, token: ClientToken) -> Option<Reply> {
        let mut buffers = self.buffers();
        let index = buffers.replies.iter().position(|r| r.token == token)?;
        Some(buffers.replies.remove(index))
    }

    pub fn latest(&self) -> Option<Observation> {
        self.buffers().observation.clone()
    }

    pub fn has_pending_command(&self) -> bool {
        self.buffers().command.is_some()
    }

    pub fn pending_requests(&self) -> usize {
        self.buffers().requests.len()
    }

    pub fn pending_replies(&self) -> usize {
        self.buffers().replies.len()
    }
}

fn copy_bounded(src: &[u8], scratch: &mut [u8]) -> Result<usize> {
    if src.len() > scratch.len() {
        return Err(Error::malformed(format!(
            "{} byte message exceeds the {} byte limit",
            src.len(),
            scratch.len()
        )));
    }
    scratch[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::malformed(e.to_string()))
}

/// A client's handle on one device. Each handle, clones included, has its
/// own reply token; dropping a handle discards its outstanding traffic.
pub struct DeviceClient {
    device: DeviceId,
    token: ClientToken,
    mailbox: Arc<Mailbox>,
}

impl DeviceClient {
    pub(crate) fn new(device: DeviceId, mailbox: Arc<Mailbox>) -> Self {
        let token = ClientToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        Self { device, token, mailbox }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn token(&self) -> ClientToken {
        self.token
    }

    pub fn send_command<T: Serialize>(&self, command: &T) -> Result<()> {
        self.send_raw_command(to_bytes(command)?)
    }

    /// Queue raw command bytes. Size is checked when the dispatcher picks it up.
    pub fn send_raw_command(&self, bytes: Vec<u8>) -> Result<()> {
        self.mailbox.put_command(bytes)
    }

    pub fn request<T: Serialize>(&self, request: &T) -> Result<()> {
        self.request_raw(to_bytes(request)?)
    }

    /// Queue raw request bytes. Size is checked when the dispatcher picks it up.
    pub fn request_raw(&self, bytes: Vec<u8>) -> Result<()> {
        self.mailbox.put_request(self.token, bytes)
    }

    pub fn take_reply(&self) -> Option<Reply> {
        self.mailbox.take_reply(self.token)
    }

    pub fn latest(&self) -> Option<Observation> {
        self.mailbox.latest()
    }
}

impl Clone for DeviceClient {
    fn clone(&self) -> Self {
        DeviceClient::new(self.device, Arc::clone(&self.mailbox))
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        debug!(device = %self.device, token = self.token.0, "client handle dropped");
        self.mailbox.discard(self.token);
    }
}
