// Channel identifier module
// This file converts between the "<block>x<tx>x<output>" standard form
// and the packed 64-bit numeric form understood by the ledger node
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest block height that fits the upper 3 bytes.
pub const MAX_BLOCK: u64 = 0x00ff_ffff;
/// Largest transaction index that fits the middle 3 bytes.
pub const MAX_TX_INDEX: u64 = 0x00ff_ffff;
/// Largest output index that fits the lower 2 bytes.
pub const MAX_OUTPUT_INDEX: u64 = 0xffff;

const SEPARATOR: char = 'x';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelIdError {
    #[error("expected <block>x<tx>x<output> channel id, got {0:?}")]
    Format(String),
    #[error("block height overflows channel id")]
    BlockOverflow,
    #[error("transaction index overflows channel id")]
    TxIndexOverflow,
    #[error("output index overflows channel id")]
    OutputIndexOverflow,
}

/// Short channel id locating a channel's funding output on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    pub fn from_parts(block: u64, tx_index: u64, output: u64) -> Result<Self, ChannelIdError> {
        if block > MAX_BLOCK {
            return Err(ChannelIdError::BlockOverflow);
        }
        if tx_index > MAX_TX_INDEX {
            return Err(ChannelIdError::TxIndexOverflow);
        }
        if output > MAX_OUTPUT_INDEX {
            return Err(ChannelIdError::OutputIndexOverflow);
        }
        Ok(Self((block << 40) | (tx_index << 16) | output))
    }

    pub fn from_number(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }

    pub fn block(&self) -> u32 {
        (self.0 >> 40) as u32
    }

    pub fn tx_index(&self) -> u32 {
        ((self.0 >> 16) & MAX_TX_INDEX) as u32
    }

    pub fn output(&self) -> u16 {
        (self.0 & MAX_OUTPUT_INDEX) as u16
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.block(),
            self.tx_index(),
            self.output()
        )
    }
}

impl FromStr for ChannelId {
    type Err = ChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [block, tx, output] = parts.as_slice() else {
            return Err(ChannelIdError::Format(s.to_string()));
        };
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| ChannelIdError::Format(s.to_string()))
        };
        Self::from_parts(parse(block)?, parse(tx)?, parse(output)?)
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
