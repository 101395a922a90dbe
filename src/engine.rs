//! The SNMP engine handle.
//!
//! A probe constructs one [`SnmpEngine`] at its entry point and passes it
//! by reference into every query. The engine owns the retry policy, the
//! request-id counter and the SNMPv3 engine state learned from agents.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::ber::Decoder;
use crate::config::Configuration;
use crate::error::internal::{AuthErrorKind, WireError, WireResult};
use crate::error::{Error, ErrorStatus, Result, TIMEOUT_INDICATION};
use crate::message::{
    CommunityMessage, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData,
};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::security::{SecurityProfile, UserProfile};
use crate::transport::{Transport, UdpTransport};
use crate::v3::{LocalizedKey, MasterKey, PrivKey, UsmSecurityParams, auth};
use crate::value::hex_string;
use crate::varbind::VarBind;
use crate::version::CommunityVersion;

/// Per-attempt wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Resends after the first attempt times out.
pub const DEFAULT_RETRIES: u32 = 5;

/// Agent address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl From<&Configuration> for Target {
    fn from(config: &Configuration) -> Self {
        Self::new(config.host.clone(), config.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// What the agent answered: status, index and bindings, unclassified.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub error_status: i32,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Response {
    pub fn error_status(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }
}

impl From<Pdu> for Response {
    fn from(pdu: Pdu) -> Self {
        Self {
            error_status: pdu.error_status,
            error_index: pdu.error_index,
            varbinds: pdu.varbinds,
        }
    }
}

/// Performs one request/response exchange with an agent.
///
/// Implementations fail with [`Error::Transport`] when no usable reply
/// arrives; agent error statuses are returned in the [`Response`].
pub trait Engine: Send + Sync {
    fn exchange(
        &self,
        target: &Target,
        profile: &SecurityProfile,
        pdu_type: PduType,
        oids: &[Oid],
    ) -> impl Future<Output = Result<Response>> + Send;
}

/// USM statistics counters an agent reports on (RFC 3414 Section 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsmReport {
    UnsupportedSecLevel,
    NotInTimeWindow,
    UnknownUserName,
    UnknownEngineId,
    WrongDigest,
    DecryptionError,
    Other,
}

impl UsmReport {
    fn from_oid(oid: Option<&Oid>) -> Self {
        const USM_STATS: [u32; 9] = [1, 3, 6, 1, 6, 3, 15, 1, 1];
        let Some(oid) = oid else {
            return Self::Other;
        };
        match oid.suffix_after(&Oid::from_slice(&USM_STATS)) {
            Some([1, 0]) => Self::UnsupportedSecLevel,
            Some([2, 0]) => Self::NotInTimeWindow,
            Some([3, 0]) => Self::UnknownUserName,
            Some([4, 0]) => Self::UnknownEngineId,
            Some([5, 0]) => Self::WrongDigest,
            Some([6, 0]) => Self::DecryptionError,
            _ => Self::Other,
        }
    }

    fn indication(self) -> &'static str {
        match self {
            Self::UnsupportedSecLevel => "Unsupported SNMP security level",
            Self::NotInTimeWindow => "SNMP message timing parameters not in windows of trust",
            Self::UnknownUserName => "Unknown USM user",
            Self::UnknownEngineId => "Unknown SNMP engine ID",
            Self::WrongDigest => "Wrong SNMP PDU digest",
            Self::DecryptionError => "Decryption error",
            Self::Other => "Report PDU received",
        }
    }
}

enum UsmOutcome {
    Response(Response, UsmSecurityParams),
    Report(UsmReport, UsmSecurityParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UsmKey {
    target: String,
    user: String,
}

/// What we know about one authoritative engine, plus keys localized to it.
struct UsmState {
    engine_id: Bytes,
    boots: u32,
    time: u32,
    synced_at: Instant,
    auth: LocalizedKey,
    privacy: PrivKey,
}

impl UsmState {
    fn new(params: &UsmSecurityParams, user: &UserProfile) -> WireResult<Self> {
        let auth =
            MasterKey::from_password(user.auth_protocol, user.auth_password()).localize(&params.engine_id);
        let priv_localized =
            MasterKey::from_password(user.auth_protocol, user.priv_password()).localize(&params.engine_id);
        Ok(Self {
            engine_id: params.engine_id.clone(),
            boots: params.engine_boots,
            time: params.engine_time,
            synced_at: Instant::now(),
            auth,
            privacy: PrivKey::new(user.priv_protocol, &priv_localized)?,
        })
    }

    fn resync(&mut self, params: &UsmSecurityParams) {
        self.boots = params.engine_boots;
        self.time = params.engine_time;
        self.synced_at = Instant::now();
    }

    fn estimated_time(&self) -> u32 {
        let elapsed = u32::try_from(self.synced_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.time.saturating_add(elapsed)
    }

    /// Encrypt, wrap and authenticate a request at authPriv.
    fn encode_request(&mut self, user: &str, msg_id: i32, pdu: Pdu) -> WireResult<Bytes> {
        let (boots, time) = (self.boots, self.estimated_time());
        let plaintext = ScopedPdu::new(self.engine_id.clone(), pdu).encode_to_bytes();
        let (ciphertext, salt) = self.privacy.encrypt(&plaintext, boots, time)?;

        let params = UsmSecurityParams::new(
            self.engine_id.clone(),
            boots,
            time,
            Bytes::copy_from_slice(user.as_bytes()),
        )
        .with_auth_placeholder(self.auth.protocol().mac_len())
        .with_priv_params(salt);
        let message = V3Message {
            global_data: MsgGlobalData::new(msg_id, MsgFlags::new(SecurityLevel::AuthPriv, true)),
            security_params: params.encode(),
            data: V3MessageData::Encrypted(ciphertext),
        }
        .encode();

        let (offset, len) = UsmSecurityParams::find_auth_params(&message)?;
        let mut signed = message.to_vec();
        auth::authenticate_message(&self.auth, &mut signed, offset, len)?;
        Ok(Bytes::from(signed))
    }

    /// Authenticate, decrypt and classify a reply to `msg_id`.
    fn decode_reply(&self, reply: Bytes, msg_id: i32) -> WireResult<Option<UsmOutcome>> {
        let message = V3Message::decode(reply.clone())?;
        if message.msg_id() != msg_id {
            return Ok(None);
        }
        let params = UsmSecurityParams::decode(message.security_params.clone())?;
        let level = message.security_level();

        if level.requires_auth() {
            let (offset, len) = UsmSecurityParams::find_auth_params(&reply)?;
            auth::verify_message(&self.auth, &reply, offset, len)?;
        }

        let scoped = match message.data {
            V3MessageData::Plaintext(scoped) => scoped,
            V3MessageData::Encrypted(ciphertext) => {
                let plaintext = self.privacy.decrypt(
                    &ciphertext,
                    params.engine_boots,
                    params.engine_time,
                    &params.priv_params,
                )?;
                ScopedPdu::decode(&mut Decoder::new(plaintext))?
            }
        };

        match scoped.pdu.pdu_type {
            PduType::Report => {
                let report = UsmReport::from_oid(scoped.pdu.varbinds.first().map(|vb| &vb.oid));
                Ok(Some(UsmOutcome::Report(report, params)))
            }
            PduType::Response if scoped.pdu.request_id == msg_id => {
                if level != SecurityLevel::AuthPriv {
                    return Err(WireError::auth(AuthErrorKind::SecurityLevelMismatch));
                }
                Ok(Some(UsmOutcome::Response(Response::from(scoped.pdu), params)))
            }
            _ => Ok(None),
        }
    }
}

/// The UDP SNMP engine.
pub struct SnmpEngine {
    timeout: Duration,
    retries: u32,
    recv_buffer_size: Option<usize>,
    next_id: AtomicI32,
    usm: Mutex<HashMap<UsmKey, UsmState>>,
}

impl Default for SnmpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SnmpEngine {
    /// Engine with a 1 second timeout and 5 retries.
    pub fn new() -> Self {
        let mut seed = [0u8; 4];
        let first_id = match getrandom::fill(&mut seed) {
            Ok(()) => i32::from_ne_bytes(seed) & 0x3fff_ffff,
            Err(_) => 1,
        };
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            recv_buffer_size: None,
            next_id: AtomicI32::new(first_id.max(1)),
            usm: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Socket receive buffer hint for the UDP transport.
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn next_request_id(&self) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) & 0x7fff_ffff;
        if id == 0 { self.next_request_id() } else { id }
    }

    fn usm_states(&self) -> MutexGuard<'_, HashMap<UsmKey, UsmState>> {
        self.usm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one exchange over an already-connected transport.
    pub async fn exchange_via<T: Transport>(
        &self,
        transport: &T,
        target: &Target,
        profile: &SecurityProfile,
        pdu_type: PduType,
        oids: &[Oid],
    ) -> Result<Response> {
        tracing::debug!(target: "snmp_probe::engine", { snmp.target = %target, snmp.pdu_type = %pdu_type, snmp.oids = oids.len() }, "exchange");
        match profile {
            SecurityProfile::Community { community, version } => {
                self.community_exchange(transport, target, community, *version, pdu_type, oids)
                    .await
            }
            SecurityProfile::User(user) => {
                self.usm_exchange(transport, target, user, pdu_type, oids).await
            }
        }
    }

    /// Send `request` until `accept` yields a result or the retries run out.
    ///
    /// `accept` returns `Ok(None)` for datagrams that belong to some other
    /// request. Undecodable or unauthenticated datagrams are remembered and
    /// reported if nothing better arrives.
    async fn round_trip<T, R, F>(
        &self,
        transport: &T,
        target: &Target,
        request: &[u8],
        request_id: i32,
        mut accept: F,
    ) -> Result<R>
    where
        T: Transport,
        F: FnMut(Bytes) -> WireResult<Option<R>> + Send,
        R: Send,
    {
        let mut failure: Option<String> = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tracing::debug!(target: "snmp_probe::engine", { snmp.target = %target, snmp.request_id = request_id, snmp.attempt = attempt }, "retrying");
            }
            transport
                .send(request)
                .await
                .map_err(|e| Error::transport(target, e.to_string()))?;

            let deadline = Instant::now() + self.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match transport.recv(request_id, remaining).await {
                    Ok(reply) => match accept(reply) {
                        Ok(Some(result)) => return Ok(result),
                        Ok(None) => {
                            tracing::trace!(target: "snmp_probe::engine", { snmp.request_id = request_id }, "ignoring unrelated reply");
                        }
                        Err(e) => {
                            tracing::debug!(target: "snmp_probe::engine", { snmp.target = %target, error = %e }, "discarding reply");
                            failure = Some(e.to_string());
                        }
                    },
                    Err(e) if e.is_timeout() => break,
                    Err(e) => {
                        tracing::debug!(target: "snmp_probe::engine", { snmp.target = %target, error = %e }, "receive failed");
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        Err(Error::transport(
            target,
            failure.unwrap_or_else(|| TIMEOUT_INDICATION.to_string()),
        ))
    }

    async fn community_exchange<T: Transport>(
        &self,
        transport: &T,
        target: &Target,
        community: &str,
        version: CommunityVersion,
        pdu_type: PduType,
        oids: &[Oid],
    ) -> Result<Response> {
        let request_id = self.next_request_id();
        let request = CommunityMessage::new(
            version,
            Bytes::copy_from_slice(community.as_bytes()),
            Pdu::request(pdu_type, request_id, oids),
        )
        .encode();

        let pdu = self
            .round_trip(transport, target, &request, request_id, |reply| {
                let message = CommunityMessage::decode_wire(reply)?;
                let pdu = message.pdu;
                if pdu.request_id != request_id || pdu.pdu_type != PduType::Response {
                    return Ok(None);
                }
                Ok(Some(pdu))
            })
            .await?;
        Ok(Response::from(pdu))
    }

    async fn usm_exchange<T: Transport>(
        &self,
        transport: &T,
        target: &Target,
        user: &UserProfile,
        pdu_type: PduType,
        oids: &[Oid],
    ) -> Result<Response> {
        let key = UsmKey {
            target: target.to_string(),
            user: user.user.clone(),
        };
        let known = self.usm_states().contains_key(&key);
        if !known {
            self.discover(transport, target, &key, user).await?;
        }

        let mut resynced = false;
        loop {
            let msg_id = self.next_request_id();
            let request = {
                let mut states = self.usm_states();
                let state = states
                    .get_mut(&key)
                    .ok_or_else(|| Error::transport(target, "SNMPv3 engine state missing"))?;
                state
                    .encode_request(&user.user, msg_id, Pdu::request(pdu_type, msg_id, oids))
                    .map_err(|e| Error::transport(target, e.to_string()))?
            };

            let outcome = self
                .round_trip(transport, target, &request, msg_id, |reply| {
                    let states = self.usm_states();
                    match states.get(&key) {
                        Some(state) => state.decode_reply(reply, msg_id),
                        None => Ok(None),
                    }
                })
                .await?;

            match outcome {
                UsmOutcome::Response(response, params) => {
                    if let Some(state) = self.usm_states().get_mut(&key) {
                        state.resync(&params);
                    }
                    return Ok(response);
                }
                UsmOutcome::Report(UsmReport::NotInTimeWindow, params) if !resynced => {
                    tracing::debug!(target: "snmp_probe::usm", { snmp.target = %target, snmp.engine_boots = params.engine_boots, snmp.engine_time = params.engine_time }, "resynchronising engine time");
                    if let Some(state) = self.usm_states().get_mut(&key) {
                        state.resync(&params);
                    }
                    resynced = true;
                }
                UsmOutcome::Report(UsmReport::UnknownEngineId, _) if !resynced => {
                    self.usm_states().remove(&key);
                    self.discover(transport, target, &key, user).await?;
                    resynced = true;
                }
                UsmOutcome::Report(report, _) => {
                    return Err(Error::transport(target, report.indication()));
                }
            }
        }
    }

    /// Learn the agent's engine ID, boots and time (RFC 3414 Section 4).
    async fn discover<T: Transport>(
        &self,
        transport: &T,
        target: &Target,
        key: &UsmKey,
        user: &UserProfile,
    ) -> Result<()> {
        let msg_id = self.next_request_id();
        let request = V3Message::discovery_request(msg_id).encode();

        let params = self
            .round_trip(transport, target, &request, msg_id, |reply| {
                let message = V3Message::decode(reply)?;
                if message.msg_id() != msg_id {
                    return Ok(None);
                }
                let params = UsmSecurityParams::decode(message.security_params)?;
                Ok((!params.engine_id.is_empty()).then_some(params))
            })
            .await?;

        tracing::debug!(target: "snmp_probe::usm", { snmp.target = %target, snmp.engine_id = %hex_string(&params.engine_id), snmp.engine_boots = params.engine_boots, snmp.engine_time = params.engine_time }, "discovered engine");

        let state = UsmState::new(&params, user).map_err(|e| Error::transport(target, e.to_string()))?;
        self.usm_states().insert(key.clone(), state);
        Ok(())
    }
}

impl Engine for SnmpEngine {
    async fn exchange(
        &self,
        target: &Target,
        profile: &SecurityProfile,
        pdu_type: PduType,
        oids: &[Oid],
    ) -> Result<Response> {
        let addr = tokio::net::lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(|e| Error::transport(target, format!("Bad transport address {}: {}", target, e)))?
            .next()
            .ok_or_else(|| Error::transport(target, format!("Bad transport address {}", target)))?;

        let transport = UdpTransport::connect(addr, self.recv_buffer_size).await?;
        self.exchange_via(&transport, target, profile, pdu_type, oids)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::transport::{MockResponse, MockTransport, ResponseBuilder};
    use crate::v3::{AuthProtocol, PrivProtocol};
    use crate::value::Value;

    const SYS_DESCR: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 1, 0];
    const ENGINE_ID: &[u8] = b"\x80\x00\x1f\x88\x80probe-agent";

    fn target() -> Target {
        Target::new("127.0.0.1", 161)
    }

    fn mock() -> MockTransport {
        MockTransport::new("127.0.0.1:161".parse().unwrap())
    }

    fn community(version: CommunityVersion) -> SecurityProfile {
        let config = Configuration::new("127.0.0.1").with_community("public");
        SecurityProfile::build(&config, version).unwrap()
    }

    fn user(auth: &str, privacy: &str) -> SecurityProfile {
        let config = Configuration::new("127.0.0.1")
            .with_user("monitor", "authpassword", "privpassword")
            .with_protocols(auth, privacy);
        SecurityProfile::build(&config, CommunityVersion::V2c).unwrap()
    }

    #[tokio::test]
    async fn test_community_get() {
        let engine = SnmpEngine::new();
        let transport = mock();
        transport.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "Linux ap 4.4")
                .build(CommunityVersion::V1, b"public"),
        );

        let response = engine
            .exchange_via(&transport, &target(), &community(CommunityVersion::V1), PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
            .unwrap();
        assert_eq!(response.error_status(), ErrorStatus::NoError);
        assert_eq!(response.varbinds[0].value, Value::from("Linux ap 4.4"));

        let sent = CommunityMessage::decode(transport.requests()[0].clone()).unwrap();
        assert_eq!(sent.version, CommunityVersion::V1);
        assert_eq!(sent.community.as_ref(), b"public");
        assert_eq!(sent.pdu.pdu_type, PduType::GetRequest);
    }

    #[tokio::test]
    async fn test_timeout_after_retries() {
        let engine = SnmpEngine::new().with_retries(2);
        let transport = mock();

        let err = engine
            .exchange_via(&transport, &target(), &community(CommunityVersion::V2c), PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "No SNMP response received before timeout");
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_stray_reply_ignored_then_retry_succeeds() {
        let engine = SnmpEngine::new();
        let transport = mock();
        transport.queue_raw_response(ResponseBuilder::new(-5).build_v2c(b"public"));
        transport.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), 7)
                .build_v2c(b"public"),
        );

        let response = engine
            .exchange_via(&transport, &target(), &community(CommunityVersion::V2c), PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
            .unwrap();
        assert_eq!(response.varbinds[0].value, Value::Integer(7));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_reported() {
        let engine = SnmpEngine::new().with_retries(0);
        let transport = mock();
        transport.queue_raw_response(Bytes::from_static(&[0x30, 0x03, 0x02, 0x01]));

        let err = engine
            .exchange_via(&transport, &target(), &community(CommunityVersion::V2c), PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().starts_with("Malformed response at offset"));
    }

    #[tokio::test]
    async fn test_io_error_reported_after_retries() {
        let engine = SnmpEngine::new().with_retries(1);
        let transport = mock();
        transport.queue_io_error("Connection refused");
        transport.queue_io_error("Connection refused");

        let err = engine
            .exchange_via(&transport, &target(), &community(CommunityVersion::V2c), PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Connection refused");
    }

    /// Minimal authoritative USM agent answering sysDescr.
    struct Agent {
        auth_protocol: AuthProtocol,
        priv_protocol: PrivProtocol,
        boots: u32,
        time: u32,
        /// Reply to the first authenticated request with notInTimeWindow.
        stale_first: std::sync::atomic::AtomicBool,
    }

    impl Agent {
        fn new(auth_protocol: AuthProtocol, priv_protocol: PrivProtocol) -> Self {
            Self {
                auth_protocol,
                priv_protocol,
                boots: 3,
                time: 5000,
                stale_first: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn keys(&self) -> (LocalizedKey, PrivKey) {
            let auth = LocalizedKey::from_password(self.auth_protocol, b"authpassword", ENGINE_ID);
            let privacy = LocalizedKey::from_password(self.auth_protocol, b"privpassword", ENGINE_ID);
            (auth, PrivKey::new(self.priv_protocol, &privacy).unwrap())
        }

        fn sign(&self, auth: &LocalizedKey, message: V3Message) -> Bytes {
            let encoded = message.encode();
            let (offset, len) = UsmSecurityParams::find_auth_params(&encoded).unwrap();
            let mut signed = encoded.to_vec();
            auth::authenticate_message(auth, &mut signed, offset, len).unwrap();
            Bytes::from(signed)
        }

        fn report(&self, msg_id: i32, counter: u32, level: SecurityLevel, auth: &LocalizedKey) -> Bytes {
            let mut params = UsmSecurityParams::new(ENGINE_ID, self.boots, self.time, Bytes::new());
            if level.requires_auth() {
                params = params.with_auth_placeholder(12);
                params.username = Bytes::from_static(b"monitor");
            }
            let pdu = Pdu {
                pdu_type: PduType::Report,
                request_id: msg_id,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind::new(
                    oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, counter, 0),
                    Value::Counter32(1),
                )],
            };
            let message = V3Message {
                global_data: MsgGlobalData::new(msg_id, MsgFlags::new(level, false)),
                security_params: params.encode(),
                data: V3MessageData::Plaintext(ScopedPdu::new(ENGINE_ID, pdu)),
            };
            if level.requires_auth() {
                self.sign(auth, message)
            } else {
                message.encode()
            }
        }

        fn handle(&self, request: &Bytes) -> MockResponse {
            let (auth, mut privacy) = self.keys();
            let message = V3Message::decode(request.clone()).unwrap();
            let params = UsmSecurityParams::decode(message.security_params.clone()).unwrap();
            let msg_id = message.msg_id();

            if params.engine_id.is_empty() {
                return MockResponse::RawData(self.report(msg_id, 4, SecurityLevel::NoAuthNoPriv, &auth));
            }

            let (offset, len) = UsmSecurityParams::find_auth_params(request).unwrap();
            if auth::verify_message(&auth, request, offset, len).is_err() {
                return MockResponse::RawData(self.report(msg_id, 5, SecurityLevel::NoAuthNoPriv, &auth));
            }

            if self.stale_first.swap(false, Ordering::SeqCst) {
                return MockResponse::RawData(self.report(msg_id, 2, SecurityLevel::AuthNoPriv, &auth));
            }
            assert_eq!(params.engine_boots, self.boots);
            assert!(params.engine_time >= self.time);

            let V3MessageData::Encrypted(ciphertext) = message.data else {
                panic!("request not encrypted");
            };
            let plaintext = privacy
                .decrypt(&ciphertext, params.engine_boots, params.engine_time, &params.priv_params)
                .unwrap();
            let scoped = ScopedPdu::decode(&mut Decoder::new(plaintext)).unwrap();
            assert_eq!(scoped.context_engine_id.as_ref(), ENGINE_ID);

            let pdu = Pdu::response(
                scoped.pdu.request_id,
                vec![VarBind::new(Oid::from(SYS_DESCR), Value::from("UniFi AP"))],
            );
            let reply_scoped = ScopedPdu::new(ENGINE_ID, pdu).encode_to_bytes();
            let (ciphertext, salt) = privacy.encrypt(&reply_scoped, self.boots, self.time).unwrap();
            let reply_params = UsmSecurityParams::new(ENGINE_ID, self.boots, self.time, &b"monitor"[..])
                .with_auth_placeholder(12)
                .with_priv_params(salt);
            MockResponse::RawData(self.sign(
                &auth,
                V3Message {
                    global_data: MsgGlobalData::new(msg_id, MsgFlags::new(SecurityLevel::AuthPriv, false)),
                    security_params: reply_params.encode(),
                    data: V3MessageData::Encrypted(ciphertext),
                },
            ))
        }
    }

    async fn usm_get(engine: &SnmpEngine, transport: &MockTransport, profile: &SecurityProfile) -> Result<Response> {
        engine
            .exchange_via(transport, &target(), profile, PduType::GetRequest, &[Oid::from(SYS_DESCR)])
            .await
    }

    #[tokio::test]
    async fn test_usm_sha_aes_round_trip() {
        let engine = SnmpEngine::new();
        let transport = mock();
        let agent = std::sync::Arc::new(Agent::new(AuthProtocol::Sha1, PrivProtocol::Aes128));
        let responder = agent.clone();
        transport.respond_with(move |req| responder.handle(req));

        let response = usm_get(&engine, &transport, &user("SHA", "AES")).await.unwrap();
        assert_eq!(response.varbinds[0].value, Value::from("UniFi AP"));
        // discovery plus the request itself
        assert_eq!(transport.requests().len(), 2);

        // engine state is reused for the next query
        usm_get(&engine, &transport, &user("SHA", "AES")).await.unwrap();
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_usm_md5_des_round_trip() {
        let engine = SnmpEngine::new();
        let transport = mock();
        let agent = std::sync::Arc::new(Agent::new(AuthProtocol::Md5, PrivProtocol::Des));
        let responder = agent.clone();
        transport.respond_with(move |req| responder.handle(req));

        let response = usm_get(&engine, &transport, &user("MD5", "DES")).await.unwrap();
        assert_eq!(response.varbinds[0].value, Value::from("UniFi AP"));
    }

    #[tokio::test]
    async fn test_usm_not_in_time_window_resyncs_once() {
        let engine = SnmpEngine::new();
        let transport = mock();
        let agent = std::sync::Arc::new(Agent::new(AuthProtocol::Sha1, PrivProtocol::Aes128));
        agent.stale_first.store(true, Ordering::SeqCst);
        let responder = agent.clone();
        transport.respond_with(move |req| responder.handle(req));

        usm_get(&engine, &transport, &user("SHA", "AES")).await.unwrap();
        // discovery, stale request, resynchronised request
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_usm_wrong_digest_report() {
        let engine = SnmpEngine::new();
        let transport = mock();
        let agent = std::sync::Arc::new(Agent::new(AuthProtocol::Sha1, PrivProtocol::Aes128));
        let responder = agent.clone();
        transport.respond_with(move |req| responder.handle(req));

        // agent keys are SHA, ours MD5
        let err = usm_get(&engine, &transport, &user("MD5", "AES")).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Wrong SNMP PDU digest");
    }

    #[test]
    fn test_report_indications() {
        let oid = oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0);
        assert_eq!(UsmReport::from_oid(Some(&oid)).indication(), "Unknown USM user");
        assert_eq!(UsmReport::from_oid(None), UsmReport::Other);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::new("10.0.0.1", 161).to_string(), "10.0.0.1:161");
        assert_eq!(Target::new("::1", 1161).to_string(), "[::1]:1161");
    }
}
