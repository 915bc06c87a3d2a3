// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain-agnostic address encoding.
//!
//! The burn message carries recipients and callers as 32 byte words. EVM
//! addresses are left-padded with zeros, Solana public keys fit as-is.

use crate::error::{BridgeError, BridgeResult};
use ethers::types::{Address as EthAddress, H256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct UniversalAddress([u8; 32]);

impl UniversalAddress {
    pub const ZERO: UniversalAddress = UniversalAddress([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_evm(address: EthAddress) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(address.as_bytes());
        Self(bytes)
    }

    /// The EVM view of this word; fails when the upper 12 bytes are not zero.
    pub fn to_evm(&self) -> BridgeResult<EthAddress> {
        if self.0[..12].iter().any(|b| *b != 0) {
            return Err(BridgeError::InvalidRequest(format!(
                "{} is not a left-padded EVM address",
                self
            )));
        }
        Ok(EthAddress::from_slice(&self.0[12..]))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn to_h256(&self) -> H256 {
        H256::from(self.0)
    }

    /// Parses `0x` hex (20 or 32 bytes), bare 40/64-char hex, or base58 (32 bytes).
    pub fn parse(s: &str) -> BridgeResult<Self> {
        let s = s.trim();
        let hex_body = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
        let is_bare_hex = (s.len() == 40 || s.len() == 64) && s.chars().all(|c| c.is_ascii_hexdigit());
        if hex_body.is_some() || is_bare_hex {
            let bytes = hex::decode(hex_body.unwrap_or(s))
                .map_err(|e| BridgeError::InvalidRequest(format!("bad hex address {s}: {e}")))?;
            return Self::from_slice(&bytes);
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| BridgeError::InvalidRequest(format!("bad base58 address {s}: {e}")))?;
        if bytes.len() != 32 {
            return Err(BridgeError::InvalidRequest(format!(
                "base58 address {s} decodes to {} bytes, expected 32",
                bytes.len()
            )));
        }
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> BridgeResult<Self> {
        match bytes.len() {
            20 => Ok(Self::from_evm(EthAddress::from_slice(bytes))),
            32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }
            n => Err(BridgeError::InvalidRequest(format!(
                "address must be 20 or 32 bytes, got {n}"
            ))),
        }
    }
}

impl fmt::Display for UniversalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for UniversalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniversalAddress({})", self)
    }
}

impl FromStr for UniversalAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<EthAddress> for UniversalAddress {
    fn from(address: EthAddress) -> Self {
        Self::from_evm(address)
    }
}

impl Serialize for UniversalAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UniversalAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Decodes `0x`-prefixed or bare hex into bytes.
pub fn decode_hex(s: &str) -> BridgeResult<Vec<u8>> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| BridgeError::SerializationError(format!("invalid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_address_left_padded() {
        let addr =
            UniversalAddress::parse("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238").unwrap();
        assert_eq!(&addr.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(
            addr.to_evm().unwrap(),
            EthAddress::from_str("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238").unwrap()
        );
        // bare hex without prefix
        let bare = UniversalAddress::parse("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238").unwrap();
        assert_eq!(addr, bare);
    }

    #[test]
    fn test_solana_address_as_is() {
        let mint = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";
        let addr = UniversalAddress::parse(mint).unwrap();
        assert_eq!(addr.to_base58(), mint);
        assert!(addr.to_evm().is_err());
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(UniversalAddress::parse("0x1234").is_err());
        assert!(UniversalAddress::parse("not-an-address").is_err());
        // 31 bytes of base58
        let short = bs58::encode([7u8; 31]).into_string();
        assert!(UniversalAddress::parse(&short).is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = UniversalAddress::new([0xab; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        let back: UniversalAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_hex("0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("0xzz").is_err());
    }
}
