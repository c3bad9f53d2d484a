//! Wire codec (C4): the tagged-JSON-array framing for client and server
//! verbs.
//!
//! Decoding a `REQ` retains each filter as raw JSON rather than parsing it
//! eagerly — `Filter::from_value` runs per-filter in `relay.rs`, so one bad
//! filter degrades to a `NOTICE` instead of `MalformedFrame`.

use serde_json::Value;

use crate::error::RelayError;
use crate::event::Event;

#[derive(Debug, Clone)]
pub enum ClientMessage {
    Event(Box<Event>),
    Req {
        subscription_id: String,
        filters: Vec<Value>,
    },
    Close {
        subscription_id: String,
    },
}

impl ClientMessage {
    /// Decodes one inbound frame. Fails with `MalformedFrame` if the
    /// input is not a JSON array, the array is empty, the verb is
    /// unknown, or the arity disagrees with the verb.
    pub fn decode(text: &str) -> Result<ClientMessage, RelayError> {
        let value: Value = serde_json::from_str(text).map_err(|e| RelayError::MalformedFrame {
            reason: e.to_string(),
        })?;

        let array = value.as_array().ok_or_else(|| RelayError::MalformedFrame {
            reason: "frame is not a JSON array".to_string(),
        })?;

        let verb = array
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::MalformedFrame {
                reason: "frame is empty or verb is not a string".to_string(),
            })?;

        match verb {
            "EVENT" => {
                if array.len() != 2 {
                    return Err(RelayError::MalformedFrame {
                        reason: "EVENT frame must have exactly 2 elements".to_string(),
                    });
                }
                let event: Event = serde_json::from_value(array[1].clone()).map_err(|e| {
                    RelayError::MalformedFrame {
                        reason: format!("invalid event object: {e}"),
                    }
                })?;
                Ok(ClientMessage::Event(Box::new(event)))
            }
            "REQ" => {
                if array.len() < 3 {
                    return Err(RelayError::MalformedFrame {
                        reason: "REQ frame must have at least 3 elements".to_string(),
                    });
                }
                let subscription_id = array[1]
                    .as_str()
                    .ok_or_else(|| RelayError::MalformedFrame {
                        reason: "REQ subscription id must be a string".to_string(),
                    })?
                    .to_string();
                let filters = array[2..].to_vec();
                Ok(ClientMessage::Req {
                    subscription_id,
                    filters,
                })
            }
            "CLOSE" => {
                if array.len() != 2 {
                    return Err(RelayError::MalformedFrame {
                        reason: "CLOSE frame must have exactly 2 elements".to_string(),
                    });
                }
                let subscription_id = array[1]
                    .as_str()
                    .ok_or_else(|| RelayError::MalformedFrame {
                        reason: "CLOSE subscription id must be a string".to_string(),
                    })?
                    .to_string();
                Ok(ClientMessage::Close { subscription_id })
            }
            other => Err(RelayError::MalformedFrame {
                reason: format!("unknown verb \"{other}\""),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServerMessage {
    Event {
        subscription_id: String,
        event: Event,
    },
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Eose {
        subscription_id: String,
    },
    Notice {
        message: String,
    },
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        let value = match self {
            ServerMessage::Event {
                subscription_id,
                event,
            } => serde_json::json!(["EVENT", subscription_id, event]),
            ServerMessage::Ok {
                event_id,
                accepted,
                message,
            } => serde_json::json!(["OK", event_id, accepted, message]),
            ServerMessage::Eose { subscription_id } => serde_json::json!(["EOSE", subscription_id]),
            ServerMessage::Notice { message } => serde_json::json!(["NOTICE", message]),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_event_frame() {
        let text = r#"["EVENT", {"id":"i","pubkey":"p","sig":"s","created_at":1,"kind":1,"tags":[],"content":"hi"}]"#;
        match ClientMessage::decode(text).unwrap() {
            ClientMessage::Event(e) => assert_eq!(e.content, "hi"),
            _ => panic!("expected EVENT"),
        }
    }

    #[test]
    fn decodes_req_with_multiple_filters() {
        let text = r#"["REQ", "s1", {"kinds":[1]}, {"kinds":[7]}]"#;
        match ClientMessage::decode(text).unwrap() {
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                assert_eq!(subscription_id, "s1");
                assert_eq!(filters.len(), 2);
            }
            _ => panic!("expected REQ"),
        }
    }

    #[test]
    fn decodes_close() {
        let text = r#"["CLOSE", "s1"]"#;
        match ClientMessage::decode(text).unwrap() {
            ClientMessage::Close { subscription_id } => assert_eq!(subscription_id, "s1"),
            _ => panic!("expected CLOSE"),
        }
    }

    #[test]
    fn rejects_non_array() {
        assert!(ClientMessage::decode(r#"{"not":"an array"}"#).is_err());
    }

    #[test]
    fn rejects_empty_array() {
        assert!(ClientMessage::decode("[]").is_err());
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(ClientMessage::decode(r#"["EOSE", "s1"]"#).is_err());
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(ClientMessage::decode(r#"["EVENT", {}, {}]"#).is_err());
        assert!(ClientMessage::decode(r#"["CLOSE"]"#).is_err());
        assert!(ClientMessage::decode(r#"["REQ", "s1"]"#).is_err());
    }

    #[test]
    fn encodes_ok_frame() {
        let msg = ServerMessage::Ok {
            event_id: "abc".to_string(),
            accepted: true,
            message: String::new(),
        };
        assert_eq!(msg.encode(), r#"["OK","abc",true,""]"#);
    }

    #[test]
    fn encodes_eose_frame() {
        let msg = ServerMessage::Eose {
            subscription_id: "s1".to_string(),
        };
        assert_eq!(msg.encode(), r#"["EOSE","s1"]"#);
    }
}
