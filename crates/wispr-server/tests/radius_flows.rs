//! End-to-end flows over real UDP sockets: a registered NAS on loopback
//! talking to both listeners, verified down to the response
//! authenticator and the session rows left behind.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use wispr_proto::attributes::{MS_CHAP2_RESPONSE, MS_CHAP2_SUCCESS, MS_CHAP_CHALLENGE};
use wispr_proto::auth::{encrypt_user_password, verify_response_authenticator};
use wispr_proto::{Attribute, AttributeType, Code, Packet, Vsa, MICROSOFT};
use wispr_server::store::{NewNas, NewUser};
use wispr_server::{RadiusServer, Store};

const SECRET: &[u8] = b"xyzzy";
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Request authenticator 0x0102...10
fn request_authenticator() -> [u8; 16] {
    core::array::from_fn(|i| (i + 1) as u8)
}

struct Harness {
    store: Arc<Store>,
    auth_addr: SocketAddr,
    acct_addr: SocketAddr,
    client: UdpSocket,
}

impl Harness {
    /// Store with one NAS for loopback and alice/wonderland, server
    /// running on ephemeral ports
    async fn up() -> Harness {
        Self::up_with_nas(true).await
    }

    async fn up_with_nas(register_nas: bool) -> Harness {
        let store = Arc::new(Store::open_in_memory().await.unwrap());
        store.seed("admin", "admin123").await.unwrap();

        if register_nas {
            store
                .create_nas(
                    NewNas {
                        ip_address: "127.0.0.1".to_string(),
                        secret: Some("xyzzy".to_string()),
                        name: "test-nas".to_string(),
                        vendor: "mikrotik".to_string(),
                        is_active: true,
                    },
                    "fallback",
                )
                .await
                .unwrap();
        }
        store
            .create_user(NewUser {
                username: "alice".to_string(),
                password: "wonderland".to_string(),
                store_cleartext: true,
                is_active: true,
                profile: "default".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();

        let server = RadiusServer::bind_ephemeral(Arc::clone(&store)).await.unwrap();
        let auth_addr = server.auth_addr().unwrap();
        let acct_addr = server.acct_addr().unwrap();
        let server = Arc::new(server);
        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Harness {
            store,
            auth_addr,
            acct_addr,
            client,
        }
    }

    async fn exchange(&self, request: &Packet, to: SocketAddr) -> Packet {
        self.client
            .send_to(&request.encode().unwrap(), to)
            .await
            .unwrap();
        let mut buf = [0u8; 4096];
        let (len, _) = timeout(RECV_TIMEOUT, self.client.recv_from(&mut buf))
            .await
            .expect("no response before timeout")
            .unwrap();
        Packet::decode(&buf[..len]).unwrap()
    }

    async fn expect_silence(&self, request: &Packet, to: SocketAddr) {
        self.client
            .send_to(&request.encode().unwrap(), to)
            .await
            .unwrap();
        let mut buf = [0u8; 4096];
        assert!(
            timeout(Duration::from_millis(500), self.client.recv_from(&mut buf))
                .await
                .is_err(),
            "expected silent discard, got a response"
        );
    }
}

fn pap_request(username: &str, password: &str, identifier: u8) -> Packet {
    let authenticator = request_authenticator();
    let mut request = Packet::new(Code::AccessRequest, identifier, authenticator);
    request.add_attribute(Attribute::string(AttributeType::UserName, username).unwrap());
    let hidden = encrypt_user_password(password, SECRET, &authenticator).unwrap();
    request.add_attribute(Attribute::new(AttributeType::UserPassword, hidden).unwrap());
    request
}

#[tokio::test]
async fn pap_accept_for_correct_password() {
    let harness = Harness::up().await;
    let request = pap_request("alice", "wonderland", 42);

    let response = harness.exchange(&request, harness.auth_addr).await;

    assert_eq!(response.code, Code::AccessAccept);
    assert_eq!(response.identifier, 42);
    assert_eq!(
        response.attribute_string(AttributeType::UserName).unwrap(),
        "alice"
    );
    assert!(verify_response_authenticator(
        &response,
        &request.authenticator,
        SECRET
    ));
}

#[tokio::test]
async fn pap_reject_for_wrong_password() {
    let harness = Harness::up().await;
    let response = harness
        .exchange(&pap_request("alice", "rabbit", 43), harness.auth_addr)
        .await;
    assert_eq!(response.code, Code::AccessReject);
    assert_eq!(response.identifier, 43);
}

#[tokio::test]
async fn chap_accept_with_explicit_challenge() {
    let harness = Harness::up().await;
    let challenge = [0xAAu8; 16];

    let mut request = Packet::new(Code::AccessRequest, 7, request_authenticator());
    request.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
    // CHAP-Password = ident || MD5(ident || password || challenge)
    let mut hashed = vec![0x07u8];
    hashed.extend_from_slice(b"wonderland");
    hashed.extend_from_slice(&challenge);
    let mut chap = vec![0x07u8];
    chap.extend_from_slice(&md5::compute(&hashed).0);
    request.add_attribute(Attribute::new(AttributeType::ChapPassword, chap).unwrap());
    request.add_attribute(Attribute::new(AttributeType::ChapChallenge, challenge.to_vec()).unwrap());

    let response = harness.exchange(&request, harness.auth_addr).await;
    assert_eq!(response.code, Code::AccessAccept);
}

#[tokio::test]
async fn mschap2_accept_with_rfc2759_vectors() {
    let harness = Harness::up().await;
    harness
        .store
        .create_user(NewUser {
            username: "User".to_string(),
            password: "clientPass".to_string(),
            store_cleartext: true,
            is_active: true,
            profile: "default".to_string(),
            expires_at: None,
        })
        .await
        .unwrap();

    let auth_challenge = hex::decode("5B5D7C7D7B3F2F3E3C2C602132262628").unwrap();
    let peer_challenge = hex::decode("21402324255E262A28295F2B3A337C7E").unwrap();
    let nt_response =
        hex::decode("82309ECD8D708B5EA08FAA3981CD83544233114A3D85D6DF").unwrap();

    let mut request = Packet::new(Code::AccessRequest, 9, request_authenticator());
    request.add_attribute(Attribute::string(AttributeType::UserName, "User").unwrap());
    request.add_attribute(
        Vsa::new(MICROSOFT, MS_CHAP_CHALLENGE, auth_challenge)
            .encode()
            .unwrap(),
    );
    let mut value = vec![0x01u8, 0x00];
    value.extend_from_slice(&peer_challenge);
    value.extend_from_slice(&[0u8; 8]);
    value.extend_from_slice(&nt_response);
    request.add_attribute(Vsa::new(MICROSOFT, MS_CHAP2_RESPONSE, value).encode().unwrap());

    let response = harness.exchange(&request, harness.auth_addr).await;
    assert_eq!(response.code, Code::AccessAccept);

    let success = response.find_vsa(MICROSOFT, MS_CHAP2_SUCCESS).unwrap();
    assert_eq!(success.value[0], 0x01);
    assert_eq!(
        &success.value[1..],
        b"S=407A5589115FD0D6209F510FE9C04566932CDA56"
    );
}

#[tokio::test]
async fn accounting_start_stop_with_gigawords() {
    let harness = Harness::up().await;

    let mut start = Packet::new(Code::AccountingRequest, 50, request_authenticator());
    start.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
    start.add_attribute(Attribute::string(AttributeType::AcctSessionId, "S1").unwrap());
    start.add_attribute(Attribute::integer(AttributeType::AcctStatusType, 1).unwrap());

    let ack = harness.exchange(&start, harness.acct_addr).await;
    assert_eq!(ack.code, Code::AccountingResponse);
    assert_eq!(ack.identifier, 50);
    assert!(verify_response_authenticator(&ack, &start.authenticator, SECRET));

    let session = harness.store.session_by_id("S1").await.unwrap().unwrap();
    assert!(session.stop_time.is_none());

    let mut stop = Packet::new(Code::AccountingRequest, 51, request_authenticator());
    stop.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
    stop.add_attribute(Attribute::string(AttributeType::AcctSessionId, "S1").unwrap());
    stop.add_attribute(Attribute::integer(AttributeType::AcctStatusType, 2).unwrap());
    stop.add_attribute(Attribute::integer(AttributeType::AcctSessionTime, 120).unwrap());
    stop.add_attribute(Attribute::integer(AttributeType::AcctInputOctets, 1000).unwrap());
    stop.add_attribute(Attribute::integer(AttributeType::AcctInputGigawords, 1).unwrap());

    let ack = harness.exchange(&stop, harness.acct_addr).await;
    assert_eq!(ack.code, Code::AccountingResponse);

    let session = harness.store.session_by_id("S1").await.unwrap().unwrap();
    assert_eq!(session.input_octets, 4_294_968_296);
    assert_eq!(session.session_time, 120);
    assert!(session.stop_time.is_some());
    assert_eq!(harness.store.active_sessions().await.unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_nas_gets_silence_and_no_state() {
    let harness = Harness::up_with_nas(false).await;

    harness
        .expect_silence(&pap_request("alice", "wonderland", 60), harness.auth_addr)
        .await;

    let mut start = Packet::new(Code::AccountingRequest, 61, request_authenticator());
    start.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
    start.add_attribute(Attribute::string(AttributeType::AcctSessionId, "S9").unwrap());
    start.add_attribute(Attribute::integer(AttributeType::AcctStatusType, 1).unwrap());
    harness.expect_silence(&start, harness.acct_addr).await;

    // No session row, no accounting row
    assert!(harness.store.session_by_id("S9").await.unwrap().is_none());
    let (_, total) = harness.store.list_accounting(1, 10).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn malformed_datagram_dropped_silently() {
    let harness = Harness::up().await;
    harness
        .client
        .send_to(&[0x01, 0x02, 0x03], harness.auth_addr)
        .await
        .unwrap();
    let mut buf = [0u8; 64];
    assert!(
        timeout(Duration::from_millis(500), harness.client.recv_from(&mut buf))
            .await
            .is_err()
    );
}
