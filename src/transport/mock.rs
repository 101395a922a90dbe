//! Mock transport for testing.
//!
//! Replies come from a FIFO queue of scripted responses or, once that is
//! empty, from an optional responder closure that sees each request.

use super::Transport;
use crate::error::{Error, Result, TIMEOUT_INDICATION};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::CommunityVersion;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A scripted reply.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Reply with this message. Community messages get their request-id
    /// patched to match the request.
    Data(Bytes),
    /// Reply with this message exactly as given.
    RawData(Bytes),
    /// Never reply.
    Timeout,
    /// Fail the receive with an I/O error text.
    IoError(String),
}

type Responder = Box<dyn Fn(&Bytes) -> MockResponse + Send + Sync>;

struct MockTransportInner {
    target: SocketAddr,
    responses: VecDeque<MockResponse>,
    responder: Option<Responder>,
    requests: Vec<Bytes>,
    pending: VecDeque<MockResponse>,
}

/// Programmable in-memory transport.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                target,
                responses: VecDeque::new(),
                responder: None,
                requests: Vec::new(),
                pending: VecDeque::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply for the next unanswered request.
    pub fn queue_response(&self, data: impl Into<Bytes>) {
        self.lock().responses.push_back(MockResponse::Data(data.into()));
    }

    /// Queue a reply that is returned without request-id patching.
    pub fn queue_raw_response(&self, data: impl Into<Bytes>) {
        self.lock()
            .responses
            .push_back(MockResponse::RawData(data.into()));
    }

    /// Queue a lost request.
    pub fn queue_timeout(&self) {
        self.lock().responses.push_back(MockResponse::Timeout);
    }

    /// Queue a receive failure.
    pub fn queue_io_error(&self, message: impl Into<String>) {
        self.lock()
            .responses
            .push_back(MockResponse::IoError(message.into()));
    }

    /// Answer requests with `responder` once the queue runs dry.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&Bytes) -> MockResponse + Send + Sync + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<Bytes> {
        self.lock().requests.clone()
    }

    /// Number of scripted replies not yet consumed.
    pub fn queued_response_count(&self) -> usize {
        self.lock().responses.len()
    }

    fn patch_request_id(reply: Bytes, request: &Bytes) -> Bytes {
        let (Ok(mut reply_msg), Ok(request_msg)) = (
            CommunityMessage::decode_wire(reply.clone()),
            CommunityMessage::decode_wire(request.clone()),
        ) else {
            return reply;
        };
        reply_msg.pdu.request_id = request_msg.pdu.request_id;
        reply_msg.encode()
    }
}

impl Transport for MockTransport {
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send {
        let request = Bytes::copy_from_slice(data);
        let mut inner = self.lock();

        let reply = match inner.responses.pop_front() {
            Some(reply) => reply,
            None => match &inner.responder {
                Some(responder) => responder(&request),
                None => MockResponse::Timeout,
            },
        };
        let reply = match reply {
            MockResponse::Data(data) => MockResponse::RawData(Self::patch_request_id(data, &request)),
            other => other,
        };

        inner.requests.push(request);
        inner.pending.push_back(reply);
        async { Ok(()) }
    }

    fn recv(&self, _request_id: i32, _timeout: Duration) -> impl Future<Output = Result<Bytes>> + Send {
        let (reply, target) = {
            let mut inner = self.lock();
            (inner.pending.pop_front(), inner.target)
        };
        async move {
            match reply {
                Some(MockResponse::RawData(data)) | Some(MockResponse::Data(data)) => Ok(data),
                Some(MockResponse::IoError(message)) => Err(Error::transport(target, message)),
                Some(MockResponse::Timeout) | None => Err(Error::transport(target, TIMEOUT_INDICATION)),
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.lock().target
    }
}

/// Builds community-based Response messages for scripting replies.
pub struct ResponseBuilder {
    request_id: i32,
    varbinds: Vec<VarBind>,
    error_status: i32,
    error_index: i32,
}

impl ResponseBuilder {
    /// Start a response; the request-id is usually patched by
    /// [`MockTransport`] anyway.
    pub fn new(request_id: i32) -> Self {
        Self {
            request_id,
            varbinds: Vec::new(),
            error_status: 0,
            error_index: 0,
        }
    }

    pub fn varbind(mut self, oid: Oid, value: impl Into<Value>) -> Self {
        self.varbinds.push(VarBind::new(oid, value.into()));
        self
    }

    pub fn error_status(mut self, status: i32) -> Self {
        self.error_status = status;
        self
    }

    pub fn error_index(mut self, index: i32) -> Self {
        self.error_index = index;
        self
    }

    pub fn build(self, version: CommunityVersion, community: &[u8]) -> Bytes {
        let pdu = Pdu {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: self.error_status,
            error_index: self.error_index,
            varbinds: self.varbinds,
        };
        CommunityMessage::new(version, Bytes::copy_from_slice(community), pdu).encode()
    }

    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        self.build(CommunityVersion::V2c, community)
    }
}
