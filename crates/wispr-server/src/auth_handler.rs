//! Access-Request processing: pick the authentication method offered by
//! the NAS, verify against the user store, answer Accept or Reject.
//!
//! Method selection is first-match over the decoded attribute set:
//! MS-CHAPv2, MS-CHAP, CHAP, then PAP. Rejection reasons are logged but
//! never leaked to the wire; a reject carries only the echoed User-Name.

use crate::store::{Profile, Store, User};
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wispr_proto::attributes::{
    MS_CHAP2_RESPONSE, MS_CHAP2_SUCCESS, MS_CHAP_CHALLENGE, MS_CHAP_RESPONSE, MT_GROUP,
    MT_RATE_LIMIT,
};
use wispr_proto::auth::{calculate_response_authenticator, decrypt_user_password};
use wispr_proto::chap::{verify_chap_response, ChapResponse};
use wispr_proto::mschap::{
    generate_authenticator_response, generate_nt_response, verify_mschap_response,
    MsChap2Response, MsChapResponse,
};
use wispr_proto::{Attribute, AttributeType, Code, Packet, Vsa, MICROSOFT, MIKROTIK};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("packet error: {0}")]
    Packet(#[from] wispr_proto::PacketError),
    #[error("attribute error: {0}")]
    Attribute(#[from] wispr_proto::AttributeError),
}

/// Outcome of credential verification
enum Verdict {
    Accept {
        /// MS-CHAP2-Success payload for the Access-Accept, v2 only
        success_vsa: Option<Vec<u8>>,
    },
    Reject {
        reason: &'static str,
    },
}

pub struct AuthHandler {
    store: Arc<Store>,
}

impl AuthHandler {
    pub fn new(store: Arc<Store>) -> Self {
        AuthHandler { store }
    }

    /// Process one Access-Request. Always yields a response packet;
    /// malformed-packet drops happen earlier, in the transport.
    pub async fn handle(
        &self,
        request: &Packet,
        secret: &[u8],
        source_ip: IpAddr,
    ) -> Result<Packet, AuthError> {
        let username = request.attribute_string(AttributeType::UserName);

        let mut profile_name = None;
        let verdict = match &username {
            None => Verdict::Reject {
                reason: "missing User-Name",
            },
            Some(username) => match self.store.user_by_name(username).await {
                Err(e) => {
                    error!(username = %username, error = %e, "user lookup failed");
                    Verdict::Reject {
                        reason: "store error",
                    }
                }
                Ok(None) => Verdict::Reject {
                    reason: "unknown user",
                },
                Ok(Some(user)) if !user.is_active => Verdict::Reject {
                    reason: "user disabled",
                },
                Ok(Some(user)) if user.expires_at.is_some_and(|t| t < Utc::now()) => {
                    Verdict::Reject {
                        reason: "user expired",
                    }
                }
                Ok(Some(user)) => {
                    profile_name = Some(user.profile.clone());
                    self.verify(request, secret, username, &user)
                }
            },
        };

        let username = username.unwrap_or_default();
        match verdict {
            Verdict::Accept { success_vsa } => {
                info!(
                    username = %username,
                    client_ip = %source_ip,
                    request_id = request.identifier,
                    "authentication successful"
                );
                self.build_accept(request, secret, &username, profile_name, success_vsa)
                    .await
            }
            Verdict::Reject { reason } => {
                warn!(
                    username = %username,
                    client_ip = %source_ip,
                    request_id = request.identifier,
                    reason = reason,
                    "authentication rejected"
                );
                build_reject(request, secret, &username)
            }
        }
    }

    /// Method selection and per-method verification
    fn verify(&self, request: &Packet, secret: &[u8], username: &str, user: &User) -> Verdict {
        let nt_hash = match decode_nt_hash(user) {
            Some(hash) => hash,
            None => {
                error!(username = %username, "stored NT hash is malformed");
                return Verdict::Reject {
                    reason: "corrupt credential",
                };
            }
        };

        // First match wins; a method is only selected when every
        // attribute it needs is present
        if let Some(challenge) = request.find_vsa(MICROSOFT, MS_CHAP_CHALLENGE) {
            if let Some(response) = request.find_vsa(MICROSOFT, MS_CHAP2_RESPONSE) {
                debug!(username = %username, "using MS-CHAPv2");
                return verify_mschap2(&challenge.value, &response.value, username, &nt_hash);
            }
            if let Some(response) = request.find_vsa(MICROSOFT, MS_CHAP_RESPONSE) {
                debug!(username = %username, "using MS-CHAP");
                return verify_mschap1(&challenge.value, &response.value, &nt_hash);
            }
        }

        if let Some(chap_password) = request.find_attribute(AttributeType::ChapPassword) {
            debug!(username = %username, "using CHAP");
            return verify_chap(request, chap_password, user);
        }

        if let Some(hidden) = request.find_attribute(AttributeType::UserPassword) {
            debug!(username = %username, "using PAP");
            return verify_pap(&hidden.value, secret, &request.authenticator, user, &nt_hash);
        }

        Verdict::Reject {
            reason: "no supported method",
        }
    }

    async fn build_accept(
        &self,
        request: &Packet,
        secret: &[u8],
        username: &str,
        profile_name: Option<String>,
        success_vsa: Option<Vec<u8>>,
    ) -> Result<Packet, AuthError> {
        let mut response = Packet::new(Code::AccessAccept, request.identifier, [0u8; 16]);
        response.add_attribute(Attribute::string(AttributeType::UserName, username)?);

        // Profile lookup failures and dangling references both fall back
        // to a bare accept
        if let Some(name) = profile_name {
            match self.store.profile_by_name(&name).await {
                Ok(Some(profile)) => {
                    self.add_profile_attributes(&mut response, &name, &profile)?
                }
                Ok(None) => {}
                Err(e) => {
                    error!(username = %username, error = %e, "profile lookup failed");
                }
            }
        }

        if let Some(payload) = success_vsa {
            response.add_attribute(Vsa::new(MICROSOFT, MS_CHAP2_SUCCESS, payload).encode()?);
        }

        response.authenticator =
            calculate_response_authenticator(&response, &request.authenticator, secret)?;
        Ok(response)
    }

    fn add_profile_attributes(
        &self,
        response: &mut Packet,
        name: &str,
        profile: &Profile,
    ) -> Result<(), AuthError> {
        if name != "default" {
            response.add_attribute(Attribute::string(AttributeType::FilterId, name)?);
            response.add_attribute(Vsa::string(MIKROTIK, MT_GROUP, name).encode()?);
        }
        if let Some(timeout) = profile.session_timeout {
            response.add_attribute(Attribute::integer(
                AttributeType::SessionTimeout,
                timeout as u32,
            )?);
        }
        if let Some(idle) = profile.idle_timeout {
            response.add_attribute(Attribute::integer(AttributeType::IdleTimeout, idle as u32)?);
        }
        if let Some(rate) = &profile.rate_limit {
            response.add_attribute(Vsa::string(MIKROTIK, MT_RATE_LIMIT, rate).encode()?);
        }
        Ok(())
    }
}

fn build_reject(request: &Packet, secret: &[u8], username: &str) -> Result<Packet, AuthError> {
    let mut response = Packet::new(Code::AccessReject, request.identifier, [0u8; 16]);
    if !username.is_empty() {
        response.add_attribute(Attribute::string(AttributeType::UserName, username)?);
    }
    response.authenticator =
        calculate_response_authenticator(&response, &request.authenticator, secret)?;
    Ok(response)
}

fn decode_nt_hash(user: &User) -> Option<[u8; 16]> {
    let bytes = hex::decode(&user.nt_hash).ok()?;
    bytes.try_into().ok()
}

fn verify_pap(
    hidden: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
    user: &User,
    nt_hash: &[u8; 16],
) -> Verdict {
    let offered = match decrypt_user_password(hidden, secret, authenticator) {
        Ok(p) => p,
        Err(_) => {
            return Verdict::Reject {
                reason: "User-Password did not decrypt",
            }
        }
    };

    let matches = match &user.password {
        Some(cleartext) => offered == *cleartext,
        // Cleartext was opted out; the NT hash still verifies PAP
        None => wispr_proto::nt_password_hash(&offered) == *nt_hash,
    };

    if matches {
        Verdict::Accept { success_vsa: None }
    } else {
        Verdict::Reject {
            reason: "wrong password",
        }
    }
}

fn verify_chap(request: &Packet, chap_password: &Attribute, user: &User) -> Verdict {
    let response = match ChapResponse::from_bytes(&chap_password.value) {
        Ok(r) => r,
        Err(_) => {
            return Verdict::Reject {
                reason: "malformed CHAP-Password",
            }
        }
    };

    // RFC 2865 Section 5.3: the Request Authenticator stands in when no
    // CHAP-Challenge attribute was sent
    let challenge = request
        .find_attribute(AttributeType::ChapChallenge)
        .map(|a| a.value.clone())
        .unwrap_or_else(|| request.authenticator.to_vec());

    let Some(cleartext) = &user.password else {
        return Verdict::Reject {
            reason: "CHAP requires a stored cleartext password",
        };
    };

    if verify_chap_response(&response, cleartext, &challenge) {
        Verdict::Accept { success_vsa: None }
    } else {
        Verdict::Reject {
            reason: "CHAP response mismatch",
        }
    }
}

fn verify_mschap1(challenge: &[u8], response: &[u8], nt_hash: &[u8; 16]) -> Verdict {
    let response = match MsChapResponse::from_bytes(response) {
        Ok(r) => r,
        Err(_) => {
            return Verdict::Reject {
                reason: "malformed MS-CHAP-Response",
            }
        }
    };
    match verify_mschap_response(challenge, &response, nt_hash) {
        Ok(true) => Verdict::Accept { success_vsa: None },
        Ok(false) => Verdict::Reject {
            reason: "MS-CHAP response mismatch",
        },
        Err(_) => Verdict::Reject {
            reason: "malformed MS-CHAP-Challenge",
        },
    }
}

fn verify_mschap2(
    auth_challenge: &[u8],
    response: &[u8],
    username: &str,
    nt_hash: &[u8; 16],
) -> Verdict {
    let response = match MsChap2Response::from_bytes(response) {
        Ok(r) => r,
        Err(_) => {
            return Verdict::Reject {
                reason: "malformed MS-CHAP2-Response",
            }
        }
    };

    let auth_challenge_16: [u8; 16] = match auth_challenge.try_into() {
        Ok(c) => c,
        Err(_) => {
            return Verdict::Reject {
                reason: "malformed MS-CHAP-Challenge",
            }
        }
    };

    let expected = generate_nt_response(
        &auth_challenge_16,
        &response.peer_challenge,
        username,
        nt_hash,
    );
    if expected != response.nt_response {
        return Verdict::Reject {
            reason: "MS-CHAPv2 response mismatch",
        };
    }

    // The accept must prove the server back to the peer:
    // ident || "S=" || 40 uppercase hex digits
    let auth_response = generate_authenticator_response(
        nt_hash,
        &response.nt_response,
        &response.peer_challenge,
        &auth_challenge_16,
        username,
    );
    let mut payload = vec![response.ident];
    payload.extend_from_slice(auth_response.as_bytes());
    Verdict::Accept {
        success_vsa: Some(payload),
    }
}
