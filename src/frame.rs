/// Frame
///
/// The `{topic, type, payload, timestamp}` JSON frames exchanged with the
/// bridge over the WebSocket. Publish frames historically embed the
/// encryption envelope as a stringified JSON payload; inbound parsing
/// also tolerates relays that inline the envelope object directly.
///
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::EncryptionEnvelope;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    #[serde(rename = "pub")]
    Pub,
    #[serde(rename = "sub")]
    Sub,
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayFrame {
    pub topic: String,
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Raw relay acknowledgement handed to `on_receive_ack`.
#[derive(Clone, Debug, PartialEq)]
pub struct AckMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: Option<u64>,
}

impl RelayFrame {
    pub fn subscribe(topic: &str) -> RelayFrame {
        RelayFrame {
            topic: topic.to_string(),
            frame_type: FrameType::Sub,
            payload: Value::String(String::new()),
            timestamp: None,
        }
    }

    pub fn publish(topic: &str, envelope: &EncryptionEnvelope) -> Result<RelayFrame> {
        Ok(RelayFrame {
            topic: topic.to_string(),
            frame_type: FrameType::Pub,
            payload: Value::String(serde_json::to_string(envelope)?),
            timestamp: None,
        })
    }

    /// Extract the envelope, whatever shape the relay used. `None` for
    /// frames without one (subscribe frames, some acks).
    pub fn envelope(&self) -> Result<Option<EncryptionEnvelope>> {
        match &self.payload {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(serde_json::from_str(s)?)),
            Value::Object(_) => Ok(Some(serde_json::from_value(self.payload.clone())?)),
            _ => Err(Error::BadJsonRpcRequest),
        }
    }

    pub fn payload_string(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn into_ack_message(self) -> AckMessage {
        let payload = self.payload_string();
        AckMessage {
            topic: self.topic,
            payload,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_wire_shape() {
        let frame = RelayFrame::subscribe("abc-123");
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"topic":"abc-123","type":"sub","payload":"","timestamp":null}"#
        );
    }

    #[test]
    fn test_publish_frame_embeds_envelope_as_string() {
        let envelope = EncryptionEnvelope {
            data: "aabb".to_string(),
            hmac: "cc".to_string(),
            iv: "dd".to_string(),
        };
        let frame = RelayFrame::publish("peer-9", &envelope).unwrap();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "pub");
        assert!(json["payload"].is_string());

        let back: RelayFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back.envelope().unwrap(), Some(envelope));
    }

    #[test]
    fn test_inbound_object_payload_tolerated() {
        let raw = r#"{"topic":"t","type":"pub","payload":{"data":"aa","hmac":"bb","iv":"cc"},"timestamp":1700000000}"#;
        let frame: RelayFrame = serde_json::from_str(raw).unwrap();
        let envelope = frame.envelope().unwrap().unwrap();
        assert_eq!(envelope.data, "aa");
        assert_eq!(frame.timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_empty_payload_means_no_envelope() {
        let raw = r#"{"topic":"t","type":"sub","payload":"","timestamp":null}"#;
        let frame: RelayFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.envelope().unwrap(), None);
    }

    #[test]
    fn test_missing_optional_fields_tolerated() {
        let raw = r#"{"topic":"t","type":"ack"}"#;
        let frame: RelayFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.frame_type, FrameType::Ack);
        assert_eq!(frame.envelope().unwrap(), None);
        assert_eq!(frame.timestamp, None);
    }

    #[test]
    fn test_ack_message_carries_raw_payload() {
        let raw = r#"{"topic":"t","type":"ack","payload":"ok","timestamp":12}"#;
        let frame: RelayFrame = serde_json::from_str(raw).unwrap();
        let ack = frame.into_ack_message();
        assert_eq!(
            ack,
            AckMessage {
                topic: "t".to_string(),
                payload: "ok".to_string(),
                timestamp: Some(12),
            }
        );
    }
}
