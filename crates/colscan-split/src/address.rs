//! Host addresses and byte ranges with locality hints.

use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// `host` or `host:port`; IPv6 literals are bracketed when a port follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostAddress {
    host: String,
    port: Option<u16>,
}

impl HostAddress {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn estimated_size_in_bytes(&self) -> usize {
        size_of::<Self>() + self.host.len()
    }
}

impl FromStr for HostAddress {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SplitError::InvalidAddress(s.to_string());
        let parse_port = |p: &str| p.parse::<u16>().map_err(|_| invalid());

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => None,
                _ => Some(parse_port(tail.strip_prefix(':').ok_or_else(invalid)?)?),
            };
            if host.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(host, port));
        }
        // More than one colon without brackets is a bare IPv6 literal.
        match s.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                if host.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::new(host, Some(parse_port(port)?)))
            }
            _ if s.is_empty() => Err(invalid()),
            _ => Ok(Self::new(s, None)),
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bracket = self.host.contains(':') && self.port.is_some();
        match (bracket, self.port) {
            (true, Some(port)) => write!(f, "[{}]:{}", self.host, port),
            (_, Some(port)) => write!(f, "{}:{}", self.host, port),
            (_, None) => write!(f, "{}", self.host),
        }
    }
}

/// `[start, end)` of a file, with the hosts that store it locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub addresses: Vec<HostAddress>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64, addresses: Vec<HostAddress>) -> Self {
        Self {
            start,
            end,
            addresses,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn estimated_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + self
                .addresses
                .iter()
                .map(HostAddress::estimated_size_in_bytes)
                .sum::<usize>()
    }
}
