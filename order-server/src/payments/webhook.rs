//! Card webhook signature verification
//!
//! The card provider signs each delivery with
//! `HMAC-SHA256(secret, "{timestamp}.{payload}")` and sends
//! `t=<timestamp>,v1=<hex signature>` in the signature header. The payload
//! is reconstructed and verified before anything in it is trusted; an
//! invalid signature never mutates order state.

use ring::hmac;
use serde_json::Value;

use crate::payments::provider::PaymentError;

/// Verify a card webhook delivery.
pub fn verify_card_signature(
    secret: &str,
    signature_header: &str,
    payload: &[u8],
) -> Result<(), PaymentError> {
    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(PaymentError::InvalidSignature),
    };

    let signature_bytes = hex::decode(signature).map_err(|_| PaymentError::InvalidSignature)?;

    let mut message = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'.');
    message.extend_from_slice(payload);

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, &message, &signature_bytes).map_err(|_| PaymentError::InvalidSignature)
}

/// A parsed card webhook event
#[derive(Debug, Clone)]
pub struct CardEvent {
    pub event_type: String,
    pub session_id: Option<String>,
    /// Order id carried in the session's opaque metadata
    pub order_id: Option<String>,
}

/// Extract the fields the gateway cares about from a verified payload.
pub fn parse_card_event(payload: &[u8]) -> Result<CardEvent, PaymentError> {
    let event: Value = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::Provider(format!("malformed webhook payload: {e}")))?;

    let event_type = event["type"]
        .as_str()
        .ok_or_else(|| PaymentError::Provider("webhook event missing type".into()))?
        .to_string();
    let object = &event["data"]["object"];

    Ok(CardEvent {
        event_type,
        session_id: object["id"].as_str().map(str::to_string),
        order_id: object["metadata"]["orderId"].as_str().map(str::to_string),
    })
}
