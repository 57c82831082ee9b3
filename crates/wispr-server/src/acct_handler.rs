//! Accounting-Request processing (RFC 2866): session lifecycle driven by
//! Acct-Status-Type, 64-bit counter reconstruction, and the append-only
//! accounting log.
//!
//! Every well-formed request is acknowledged, even when the user is
//! unknown or the store misbehaves, so the NAS stops retransmitting.
//! Requests may arrive out of order; the store tolerates Interim before
//! Start and duplicate Stops.

use crate::store::Store;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wispr_proto::auth::calculate_response_authenticator;
use wispr_proto::{total_octets, AcctStatusType, AcctTerminateCause};
use wispr_proto::{AttributeType, Code, Packet};

#[derive(Error, Debug)]
pub enum AcctError {
    #[error("packet error: {0}")]
    Packet(#[from] wispr_proto::PacketError),
}

/// Fields shared by every accounting update, pulled out of the request
struct AcctFields {
    session_id: String,
    username: String,
    framed_ip: Option<String>,
    mac_address: Option<String>,
    session_time: i64,
    input_octets: i64,
    output_octets: i64,
}

impl AcctFields {
    fn from_request(request: &Packet) -> Self {
        let input = total_octets(
            request.attribute_u32(AttributeType::AcctInputOctets).unwrap_or(0),
            request
                .attribute_u32(AttributeType::AcctInputGigawords)
                .unwrap_or(0),
        );
        let output = total_octets(
            request
                .attribute_u32(AttributeType::AcctOutputOctets)
                .unwrap_or(0),
            request
                .attribute_u32(AttributeType::AcctOutputGigawords)
                .unwrap_or(0),
        );

        AcctFields {
            session_id: request
                .attribute_string(AttributeType::AcctSessionId)
                .unwrap_or_default(),
            username: request
                .attribute_string(AttributeType::UserName)
                .unwrap_or_default(),
            framed_ip: request
                .find_attribute(AttributeType::FramedIpAddress)
                .and_then(|a| a.as_ipv4().ok())
                .map(|octets| std::net::Ipv4Addr::from(octets).to_string()),
            mac_address: request.attribute_string(AttributeType::CallingStationId),
            session_time: i64::from(
                request
                    .attribute_u32(AttributeType::AcctSessionTime)
                    .unwrap_or(0),
            ),
            input_octets: i64::try_from(input).unwrap_or(i64::MAX),
            output_octets: i64::try_from(output).unwrap_or(i64::MAX),
        }
    }
}

pub struct AcctHandler {
    store: Arc<Store>,
}

impl AcctHandler {
    pub fn new(store: Arc<Store>) -> Self {
        AcctHandler { store }
    }

    /// Process one Accounting-Request and build the acknowledgement
    pub async fn handle(
        &self,
        request: &Packet,
        secret: &[u8],
        source_ip: IpAddr,
    ) -> Result<Packet, AcctError> {
        let status = request
            .attribute_u32(AttributeType::AcctStatusType)
            .and_then(AcctStatusType::from_u32);
        let fields = AcctFields::from_request(request);
        let nas_ip = source_ip.to_string();
        let now = Utc::now();

        match status {
            Some(AcctStatusType::Start) => {
                info!(
                    session_id = %fields.session_id,
                    username = %fields.username,
                    client_ip = %source_ip,
                    "accounting start"
                );
                if let Err(e) = self
                    .store
                    .start_session(
                        &fields.session_id,
                        &fields.username,
                        &nas_ip,
                        fields.framed_ip.as_deref(),
                        fields.mac_address.as_deref(),
                        now,
                    )
                    .await
                {
                    error!(session_id = %fields.session_id, error = %e, "session start failed");
                }
            }
            Some(AcctStatusType::InterimUpdate) => {
                debug!(
                    session_id = %fields.session_id,
                    input_octets = fields.input_octets,
                    output_octets = fields.output_octets,
                    "accounting interim update"
                );
                if let Err(e) = self
                    .store
                    .interim_session(
                        &fields.session_id,
                        &fields.username,
                        &nas_ip,
                        fields.framed_ip.as_deref(),
                        fields.session_time,
                        fields.input_octets,
                        fields.output_octets,
                        now,
                    )
                    .await
                {
                    error!(session_id = %fields.session_id, error = %e, "interim update failed");
                }
            }
            Some(AcctStatusType::Stop) => {
                let cause = request
                    .attribute_u32(AttributeType::AcctTerminateCause)
                    .and_then(AcctTerminateCause::from_u32)
                    .unwrap_or(AcctTerminateCause::UserRequest);
                info!(
                    session_id = %fields.session_id,
                    username = %fields.username,
                    session_time = fields.session_time,
                    terminate_cause = cause.as_str(),
                    "accounting stop"
                );
                if let Err(e) = self
                    .store
                    .stop_session(
                        &fields.session_id,
                        &fields.username,
                        &nas_ip,
                        fields.session_time,
                        fields.input_octets,
                        fields.output_octets,
                        cause.as_str(),
                        now,
                    )
                    .await
                {
                    error!(session_id = %fields.session_id, error = %e, "session stop failed");
                }
            }
            Some(other) => {
                // Accounting-On/Off and friends: acknowledged, logged,
                // no session row to touch
                info!(status = other.as_u32(), client_ip = %source_ip, "accounting notice");
            }
            None => {
                warn!(
                    client_ip = %source_ip,
                    request_id = request.identifier,
                    "Accounting-Request without a valid Acct-Status-Type"
                );
            }
        }

        // The log gets one row per request no matter what happened above
        let status_code = request
            .attribute_u32(AttributeType::AcctStatusType)
            .unwrap_or(0);
        if let Err(e) = self
            .store
            .append_accounting(
                &fields.session_id,
                &fields.username,
                &nas_ip,
                status_code,
                fields.session_time,
                fields.input_octets,
                fields.output_octets,
                fields.framed_ip.as_deref(),
                now,
            )
            .await
        {
            error!(session_id = %fields.session_id, error = %e, "accounting append failed");
        }

        let mut response = Packet::new(Code::AccountingResponse, request.identifier, [0u8; 16]);
        response.authenticator =
            calculate_response_authenticator(&response, &request.authenticator, secret)?;
        Ok(response)
    }
}
