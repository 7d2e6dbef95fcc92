//! ABI-style value encoding for spell arguments and mirrored event parameters.
//!
//! careful: the byte layout is what downstream auditors compare against, so it
//! must stay word-for-word compatible with the contract ABI (32-byte words,
//! left-padded numbers and addresses, head/tail layout for dynamic values).

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::types::Address;

const WORD: usize = 32;

/// A single typed argument value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_) | Token::Bytes(_) | Token::Array(_))
    }

    /// ABI type name, as used in event signatures.
    pub fn type_name(&self) -> String {
        match self {
            Token::Address(_) => "address".to_string(),
            Token::Uint(_) => "uint256".to_string(),
            Token::Bool(_) => "bool".to_string(),
            Token::String(_) => "string".to_string(),
            Token::Bytes(_) => "bytes".to_string(),
            Token::Array(items) => match items.first() {
                Some(first) => format!("{}[]", first.type_name()),
                None => "uint256[]".to_string(),
            },
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Token::Uint(v) => Some(*v),
            _ => None,
        }
    }

    fn write_static<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(a) => word[12..].copy_from_slice(&a.0),
            Token::Uint(v) => word[16..].copy_from_slice(&v.to_be_bytes()),
            Token::Bool(b) => word[31] = u8::from(*b),
            _ => unreachable!("dynamic token written as static"),
        }
        writer.write_all(&word)
    }

    fn write_tail<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Token::String(s) => write_padded_bytes(writer, s.as_bytes()),
            Token::Bytes(b) => write_padded_bytes(writer, b),
            Token::Array(items) => {
                Token::Uint(items.len() as u128).write_static(writer)?;
                encode_into(writer, items)
            }
            _ => self.write_static(writer),
        }
    }
}

fn write_padded_bytes<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    Token::Uint(data.len() as u128).write_static(writer)?;
    writer.write_all(data)?;
    let rem = data.len() % WORD;
    if rem != 0 {
        writer.write_all(&[0u8; WORD][..WORD - rem])?;
    }
    Ok(())
}

fn encode_into<W: Write>(writer: &mut W, tokens: &[Token]) -> io::Result<()> {
    let head_len = tokens.len() * WORD;
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            Token::Uint((head_len + tail.len()) as u128).write_static(writer)?;
            token.write_tail(&mut tail)?;
        } else {
            token.write_static(writer)?;
        }
    }
    writer.write_all(&tail)
}

/// Encode a parameter tuple, e.g. `abi.encode(address, address)`.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let mut buf = Vec::new();
    // writes into a Vec never fail
    let _ = encode_into(&mut buf, tokens);
    buf
}

/// `Name(type1,type2)` for a set of parameter values.
pub fn event_signature(name: &str, tokens: &[Token]) -> String {
    let types: Vec<String> = tokens.iter().map(Token::type_name).collect();
    format!("{}({})", name, types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_two_addresses() {
        let a = Address([0x11; 20]);
        let b = Address([0x22; 20]);
        let out = encode(&[Token::Address(a), Token::Address(b)]);
        assert_eq!(out.len(), 64);
        assert_eq!(&out[..12], &[0u8; 12]);
        assert_eq!(&out[12..32], &a.0);
        assert_eq!(&out[44..64], &b.0);
    }

    #[test]
    fn test_encode_dynamic_string() {
        let out = encode(&[Token::Uint(7), Token::String("auth".into())]);
        // head: uint, offset(64); tail: len(4), data padded
        assert_eq!(out.len(), 4 * WORD);
        assert_eq!(out[31], 7);
        assert_eq!(out[63], 64);
        assert_eq!(out[95], 4);
        assert_eq!(&out[96..100], b"auth");
        assert!(out[100..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_event_signature() {
        let sig = event_signature(
            "LogAddAuth",
            &[Token::Address(Address::ZERO), Token::Address(Address::ZERO)],
        );
        assert_eq!(sig, "LogAddAuth(address,address)");
    }

    #[test]
    fn test_token_json_shape() {
        let t = Token::Uint(5);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"type":"uint","value":5}"#);
    }
}
