//! A minimal community-string agent on a real UDP socket.

use bytes::Bytes;
use snmp_probe::message::CommunityMessage;
use snmp_probe::pdu::{Pdu, PduType};
use snmp_probe::version::CommunityVersion;
use snmp_probe::{Oid, Value, VarBind};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::UdpSocket;

/// noSuchName error status.
const NO_SUCH_NAME: i32 = 2;

/// How the agent treats requests.
#[derive(Debug, Clone, Default)]
pub struct AgentBehavior {
    /// Answer every request with this error status and index.
    pub fail_with: Option<(i32, i32)>,
    /// Drop requests without answering.
    pub silent: bool,
}

/// Handle on a spawned agent task.
pub struct TestAgent {
    pub addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl TestAgent {
    /// Spawn an agent serving `mib` on an ephemeral localhost port.
    pub async fn spawn(mib: BTreeMap<Oid, Value>, behavior: AgentBehavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if behavior.silent {
                    continue;
                }
                let Ok(request) = CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len]))
                else {
                    continue;
                };
                if request.community.as_ref() != super::COMMUNITY.as_bytes() {
                    continue;
                }

                let pdu = answer(&mib, &behavior, request.version, &request.pdu);
                let reply = CommunityMessage::new(request.version, request.community, pdu);
                let _ = socket.send_to(&reply.encode(), peer).await;
            }
        });

        Self { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Datagrams received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn answer(
    mib: &BTreeMap<Oid, Value>,
    behavior: &AgentBehavior,
    version: CommunityVersion,
    request: &Pdu,
) -> Pdu {
    let oids = request.oids();

    if let Some((status, index)) = behavior.fail_with {
        return error_response(request, status, index);
    }

    let mut varbinds = Vec::with_capacity(oids.len());
    for (i, oid) in oids.iter().enumerate() {
        let found = match request.pdu_type {
            PduType::GetNextRequest => mib
                .range(oid.clone()..)
                .find(|(candidate, _)| *candidate > oid)
                .map(|(next, value)| (next.clone(), value.clone())),
            _ => mib.get(oid).map(|value| (oid.clone(), value.clone())),
        };

        match (found, version) {
            (Some((oid, value)), _) => varbinds.push(VarBind::new(oid, value)),
            (None, CommunityVersion::V1) => {
                return error_response(request, NO_SUCH_NAME, i as i32 + 1);
            }
            (None, CommunityVersion::V2c) => {
                let exception = match request.pdu_type {
                    PduType::GetNextRequest => Value::EndOfMibView,
                    _ => Value::NoSuchObject,
                };
                varbinds.push(VarBind::new(oid.clone(), exception));
            }
        }
    }
    Pdu::response(request.request_id, varbinds)
}

/// Error response echoing the request bindings.
fn error_response(request: &Pdu, status: i32, index: i32) -> Pdu {
    let mut pdu = Pdu::response(request.request_id, request.varbinds.clone());
    pdu.error_status = status;
    pdu.error_index = index;
    pdu
}
