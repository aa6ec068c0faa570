//! Transaction Hash Codec
//!
//! Hashes are computed exactly like the network computes them, so that a
//! submitted payload can be recognized in shard blocks before the gateway
//! answers. The signed fields are serialized as a protobuf message and the
//! result is hashed with blake2b-256.
//!
//! Zero integers and empty byte fields are left out of the encoding. The
//! value is a sign-magnitude big integer: a sign byte followed by the
//! big-endian magnitude, with zero encoded as two zero bytes.

use crate::{BatchTransaction, error::EncodingError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blake2::{Blake2b, Digest, digest::consts::U32};
use ethers::types::U256;
use prost::Message;

type Blake2b256 = Blake2b<U32>;

const ADDRESS_HRP: &str = "erd";
const ADDRESS_LEN: usize = 32;

/// Wire layout of a signed transaction
#[derive(Clone, PartialEq, Message)]
struct SignedTransaction {
    #[prost(uint64, tag = "1")]
    nonce: u64,
    #[prost(bytes = "vec", tag = "2")]
    value: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    receiver: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    receiver_username: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    sender: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    sender_username: Vec<u8>,
    #[prost(uint64, tag = "7")]
    gas_price: u64,
    #[prost(uint64, tag = "8")]
    gas_limit: u64,
    #[prost(bytes = "vec", tag = "9")]
    data: Vec<u8>,
    #[prost(bytes = "vec", tag = "10")]
    chain_id: Vec<u8>,
    #[prost(uint32, tag = "11")]
    version: u32,
    #[prost(bytes = "vec", tag = "12")]
    signature: Vec<u8>,
    #[prost(uint32, tag = "13")]
    options: u32,
    #[prost(bytes = "vec", tag = "14")]
    guardian: Vec<u8>,
    #[prost(bytes = "vec", tag = "15")]
    guardian_signature: Vec<u8>,
}

/// Hex encoded blake2b-256 of the protobuf encoding of `tx`
pub fn transaction_hash(tx: &BatchTransaction) -> Result<String, EncodingError> {
    let encoded = encode_transaction(tx)?;
    Ok(hex::encode(Blake2b256::digest(&encoded)))
}

fn encode_transaction(tx: &BatchTransaction) -> Result<Vec<u8>, EncodingError> {
    let message = SignedTransaction {
        nonce: tx.nonce,
        value: encode_value(&tx.value)?,
        receiver: decode_address(&tx.receiver)?,
        receiver_username: Vec::new(),
        sender: decode_address(&tx.sender)?,
        sender_username: Vec::new(),
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        data: match &tx.data {
            Some(data) => STANDARD.decode(data).map_err(|_| EncodingError::Field {
                field: "data",
                encoding: "base64",
            })?,
            None => Vec::new(),
        },
        chain_id: tx.chain_id.as_bytes().to_vec(),
        version: tx.version,
        signature: decode_hex("signature", &tx.signature)?,
        options: tx.options.unwrap_or_default(),
        guardian: match &tx.guardian {
            Some(guardian) => decode_address(guardian)?,
            None => Vec::new(),
        },
        guardian_signature: match &tx.guardian_signature {
            Some(signature) => decode_hex("guardian signature", signature)?,
            None => Vec::new(),
        },
    };

    Ok(message.encode_to_vec())
}

/// Public key bytes behind a bech32 `erd1...` address
pub fn decode_address(address: &str) -> Result<Vec<u8>, EncodingError> {
    match bech32::decode(address) {
        Ok((hrp, bytes)) if hrp.as_str() == ADDRESS_HRP && bytes.len() == ADDRESS_LEN => Ok(bytes),
        _ => Err(EncodingError::Address(address.to_string())),
    }
}

/// Sign-magnitude encoding of a non-negative decimal value
fn encode_value(value: &str) -> Result<Vec<u8>, EncodingError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::Value(value.to_string()));
    }
    let amount = U256::from_dec_str(value).map_err(|_| EncodingError::Value(value.to_string()))?;
    if amount.is_zero() {
        return Ok(vec![0, 0]);
    }

    let mut magnitude = [0u8; 32];
    amount.to_big_endian(&mut magnitude);
    let start = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());

    let mut encoded = Vec::with_capacity(1 + magnitude.len() - start);
    encoded.push(0);
    encoded.extend_from_slice(&magnitude[start..]);
    Ok(encoded)
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, EncodingError> {
    hex::decode(value).map_err(|_| EncodingError::Field {
        field,
        encoding: "hex",
    })
}
