//! # Cross-Chain Message Codec
//!
//! Payloads handed to the transport are RLP lists whose first item is the
//! method tag and whose remaining items are the method's arguments, in
//! declaration order:
//!
//! ```text
//! xCrossTransfer        [tag, from, to, value, data]
//! xCrossTransferRevert  [tag, to, value]
//! xTransfer             [tag, to, value, data]
//! xHubTransfer          [tag, to, value, data]
//! ```
//!
//! Addresses travel as UTF-8 strings and data as raw byte strings. Values
//! are byte strings holding the minimal signed (two's-complement) big-endian
//! form of the amount: zero is `0x00`, and a value whose top bit is set gets
//! a leading `0x00` so peers reading it as a signed integer see it positive. The tag is matched case-insensitively on
//! decode. Decoding is all-or-nothing: a wrong arity or a broken field
//! rejects the whole payload, and an unknown tag is
//! [`ProtocolError::UnknownMethod`].

use rlp::{Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::config::{
    METHOD_CROSS_TRANSFER, METHOD_CROSS_TRANSFER_REVERT, METHOD_HUB_TRANSFER, METHOD_TRANSFER,
};
use crate::error::ProtocolError;

/// A typed cross-chain payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Message {
    /// Move `value` from `from` to `to` across chains.
    CrossTransfer {
        from: String,
        to: String,
        value: Amount,
        #[serde(with = "hex_bytes", default)]
        data: Vec<u8>,
    },
    /// Undo a failed `CrossTransfer` by crediting `value` back to `to`.
    CrossTransferRevert { to: String, value: Amount },
    /// Forward the sender's hub-held balance to `to`.
    Transfer {
        to: String,
        value: Amount,
        #[serde(with = "hex_bytes", default)]
        data: Vec<u8>,
    },
    /// Ledger transfer from the message sender to `to`.
    HubTransfer {
        to: String,
        value: Amount,
        #[serde(with = "hex_bytes", default)]
        data: Vec<u8>,
    },
}

impl Message {
    /// The wire tag for this message kind.
    pub fn method(&self) -> &'static str {
        match self {
            Message::CrossTransfer { .. } => METHOD_CROSS_TRANSFER,
            Message::CrossTransferRevert { .. } => METHOD_CROSS_TRANSFER_REVERT,
            Message::Transfer { .. } => METHOD_TRANSFER,
            Message::HubTransfer { .. } => METHOD_HUB_TRANSFER,
        }
    }

    /// The amount carried by the message.
    pub fn value(&self) -> Amount {
        match self {
            Message::CrossTransfer { value, .. }
            | Message::CrossTransferRevert { value, .. }
            | Message::Transfer { value, .. }
            | Message::HubTransfer { value, .. } => *value,
        }
    }

    /// Encodes the message as an RLP list.
    pub fn encode(&self) -> Vec<u8> {
        let method = self.method().to_string();
        let stream = match self {
            Message::CrossTransfer {
                from,
                to,
                value,
                data,
            } => {
                let mut s = RlpStream::new_list(5);
                s.append(&method)
                    .append(from)
                    .append(to)
                    .append(&amount_bytes(value))
                    .append(data);
                s
            }
            Message::CrossTransferRevert { to, value } => {
                let mut s = RlpStream::new_list(3);
                s.append(&method).append(to).append(&amount_bytes(value));
                s
            }
            Message::Transfer { to, value, data } | Message::HubTransfer { to, value, data } => {
                let mut s = RlpStream::new_list(4);
                s.append(&method)
                    .append(to)
                    .append(&amount_bytes(value))
                    .append(data);
                s
            }
        };
        stream.out().to_vec()
    }

    /// Decodes a payload produced by [`Message::encode`] (or by any peer
    /// speaking the same list layout).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownMethod`] for an unrecognized tag,
    /// [`ProtocolError::Decode`] for anything structurally wrong.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() {
            return Err(ProtocolError::Decode("payload is not an RLP list".into()));
        }
        let items = rlp.item_count()?;
        if items == 0 {
            return Err(ProtocolError::Decode("payload has no method tag".into()));
        }

        let method: String = rlp.val_at(0)?;
        let tag = method.to_lowercase();

        let message = if tag == METHOD_CROSS_TRANSFER.to_lowercase() {
            expect_arity(&method, items, 5)?;
            Message::CrossTransfer {
                from: rlp.val_at(1)?,
                to: rlp.val_at(2)?,
                value: amount_at(&rlp, 3)?,
                data: rlp.val_at(4)?,
            }
        } else if tag == METHOD_CROSS_TRANSFER_REVERT.to_lowercase() {
            expect_arity(&method, items, 3)?;
            Message::CrossTransferRevert {
                to: rlp.val_at(1)?,
                value: amount_at(&rlp, 2)?,
            }
        } else if tag == METHOD_TRANSFER.to_lowercase() {
            expect_arity(&method, items, 4)?;
            Message::Transfer {
                to: rlp.val_at(1)?,
                value: amount_at(&rlp, 2)?,
                data: rlp.val_at(3)?,
            }
        } else if tag == METHOD_HUB_TRANSFER.to_lowercase() {
            expect_arity(&method, items, 4)?;
            Message::HubTransfer {
                to: rlp.val_at(1)?,
                value: amount_at(&rlp, 2)?,
                data: rlp.val_at(3)?,
            }
        } else {
            tracing::debug!(%method, "unknown method tag");
            return Err(ProtocolError::UnknownMethod(method));
        };

        tracing::trace!(method = message.method(), len = bytes.len(), "message decoded");
        Ok(message)
    }
}

/// Minimal signed big-endian bytes of `value`.
fn amount_bytes(value: &Amount) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let start = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    let digits = &buf[start..];
    match digits.first() {
        None => vec![0],
        Some(first) if first & 0x80 != 0 => {
            let mut out = Vec::with_capacity(digits.len() + 1);
            out.push(0);
            out.extend_from_slice(digits);
            out
        }
        Some(_) => digits.to_vec(),
    }
}

/// Reads the amount at `index`. Negative values and values wider than
/// 256 bits are [`ProtocolError::InvalidAmount`].
fn amount_at(rlp: &Rlp<'_>, index: usize) -> Result<Amount, ProtocolError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    let invalid = || ProtocolError::InvalidAmount(format!("0x{}", hex::encode(&bytes)));

    let digits = match bytes.split_first() {
        None => return Ok(Amount::zero()),
        Some((first, _)) if first & 0x80 != 0 => return Err(invalid()),
        Some((&0, rest)) if !rest.is_empty() => rest,
        Some(_) => &bytes[..],
    };
    if digits.len() > 32 {
        return Err(invalid());
    }
    Ok(Amount::from_big_endian(digits))
}

fn expect_arity(method: &str, got: usize, expected: usize) -> Result<(), ProtocolError> {
    if got != expected {
        return Err(ProtocolError::Decode(format!(
            "{method} expects {expected} items, got {got}"
        )));
    }
    Ok(())
}

/// Serde adapter that writes byte payloads as hex strings.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(v: u64) -> Amount {
        Amount::from(v)
    }

    fn samples() -> Vec<Message> {
        vec![
            Message::CrossTransfer {
                from: "1.ICON/hxabc".into(),
                to: "1.ETH/0x32".into(),
                value: amount(1 << 18),
                data: b"memo".to_vec(),
            },
            Message::CrossTransferRevert {
                to: "1.ETH/0x32".into(),
                value: amount(1 << 18),
            },
            Message::Transfer {
                to: "1.ETH/0x32".into(),
                value: Amount::max_value(),
                data: Vec::new(),
            },
            Message::HubTransfer {
                to: "1.ICON/cxreceiver".into(),
                value: Amount::zero(),
                data: vec![0, 1, 2],
            },
        ]
    }

    #[test]
    fn every_variant_survives_encode_decode() {
        for msg in samples() {
            let decoded = Message::decode(&msg.encode()).unwrap();
            assert_eq!(decoded, msg);
            // Re-encoding the decoded value is byte-identical.
            assert_eq!(decoded.encode(), msg.encode());
        }
    }

    #[test]
    fn empty_destination_is_preserved() {
        let msg = Message::CrossTransfer {
            from: "1.ETH/0x32".into(),
            to: String::new(),
            value: amount(5),
            data: Vec::new(),
        };
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn tag_matching_ignores_case() {
        let mut s = RlpStream::new_list(4);
        s.append(&"XHUBTRANSFER".to_string())
            .append(&"1.ICON/hxabc".to_string())
            .append(&amount_bytes(&amount(9)))
            .append(&Vec::<u8>::new());
        let decoded = Message::decode(&s.out()).unwrap();
        assert_eq!(decoded.method(), METHOD_HUB_TRANSFER);
        assert_eq!(decoded.value(), amount(9));
    }

    #[test]
    fn unknown_method_rejected() {
        let mut s = RlpStream::new_list(2);
        s.append(&"xMint".to_string()).append(&amount(1));
        assert_eq!(
            Message::decode(&s.out()),
            Err(ProtocolError::UnknownMethod("xMint".into()))
        );
    }

    #[test]
    fn wrong_arity_rejected() {
        let mut s = RlpStream::new_list(3);
        s.append(&METHOD_CROSS_TRANSFER.to_string())
            .append(&"a/b".to_string())
            .append(&"c/d".to_string());
        assert!(matches!(
            Message::decode(&s.out()),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(Message::decode(&[]), Err(ProtocolError::Decode(_))));
        assert!(matches!(
            Message::decode(&[0x83, b'a', b'b', b'c']),
            Err(ProtocolError::Decode(_))
        ));
    }

    fn revert_payload(value: &[u8]) -> Vec<u8> {
        let mut s = RlpStream::new_list(3);
        s.append(&METHOD_CROSS_TRANSFER_REVERT.to_string())
            .append(&"1.ETH/0x32".to_string())
            .append(&value.to_vec());
        s.out().to_vec()
    }

    #[test]
    fn amounts_use_signed_minimal_bytes() {
        let cases: [(u64, &[u8]); 5] = [
            (0, &[0x00]),
            (127, &[0x7f]),
            (128, &[0x82, 0x00, 0x80]),
            (200, &[0x82, 0x00, 0xc8]),
            (1 << 23, &[0x84, 0x00, 0x80, 0x00, 0x00]),
        ];
        for (value, tail) in cases {
            let msg = Message::CrossTransferRevert {
                to: "1.ETH/0x32".into(),
                value: amount(value),
            };
            let encoded = msg.encode();
            assert!(encoded.ends_with(tail), "{value}: {}", hex::encode(&encoded));
            assert_eq!(Message::decode(&encoded).unwrap(), msg);
        }
    }

    #[test]
    fn decodes_signed_amounts_from_peers() {
        let decoded = Message::decode(&revert_payload(&[0x00, 0x80, 0x00, 0x00])).unwrap();
        assert_eq!(decoded.value(), amount(1 << 23));

        let zero = Message::decode(&revert_payload(&[0x00])).unwrap();
        assert!(zero.value().is_zero());

        let small = Message::decode(&revert_payload(&[0x7f])).unwrap();
        assert_eq!(small.value(), amount(127));
    }

    #[test]
    fn negative_amount_rejected() {
        assert_eq!(
            Message::decode(&revert_payload(&[0xc8])),
            Err(ProtocolError::InvalidAmount("0xc8".into()))
        );
        assert!(matches!(
            Message::decode(&revert_payload(&[0xff, 0xff])),
            Err(ProtocolError::InvalidAmount(_))
        ));
    }

    #[test]
    fn oversized_amount_rejected() {
        let mut wide = vec![0x01];
        wide.extend_from_slice(&[0u8; 32]);
        assert!(matches!(
            Message::decode(&revert_payload(&wide)),
            Err(ProtocolError::InvalidAmount(_))
        ));
    }

    #[test]
    fn json_form_uses_hex_data() {
        let msg = Message::HubTransfer {
            to: "1.ICON/hxabc".into(),
            value: amount(16),
            data: b"hi".to_vec(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["method"], "hub_transfer");
        assert_eq!(json["data"], "6869");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
