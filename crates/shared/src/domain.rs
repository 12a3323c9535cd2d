use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHexError {
    #[error("empty hex string")]
    Empty,
    #[error("hex string too long: expected at most {max} digits, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("invalid hex: {0}")]
    Invalid(String),
}

/// Hex strings in human-readable formats; `$binary` picks the binary layout.
macro_rules! hex_bytes_newtype {
    ($name:ident, $len:expr, $binary:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_padded_hex::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.collect_str(self)
                } else {
                    $binary::serialize(&self.0, serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let raw = String::deserialize(deserializer)?;
                    raw.parse().map_err(serde::de::Error::custom)
                } else {
                    let bytes: [u8; $len] = $binary::deserialize(deserializer)?;
                    Ok(Self(bytes))
                }
            }
        }
    };
}

hex_bytes_newtype!(AccountAddress, 32, fixed_bytes);
hex_bytes_newtype!(TransactionHash, 32, fixed_bytes);
hex_bytes_newtype!(Ed25519PublicKey, 32, length_prefixed_bytes);
hex_bytes_newtype!(Ed25519Signature, 64, length_prefixed_bytes);

/// Raw 32 bytes with no length prefix, the chain's layout for addresses and hashes.
mod fixed_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        <[u8; 32]>::deserialize(deserializer)
    }
}

/// Length-prefixed byte vector of exactly `N` bytes, the chain's layout for keys and signatures.
mod length_prefixed_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
            D::Error::custom(format!(
                "invalid length: expected {N} bytes, got {}",
                bytes.len()
            ))
        })
    }
}

impl AccountAddress {
    pub const ONE: Self = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Self(bytes)
    };

    /// Short form used by the chain for special addresses (`0x1`), long form otherwise.
    pub fn to_short_string(&self) -> String {
        let encoded = hex::encode(self.0);
        let trimmed = encoded.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }
}

/// Accepts `0x`-prefixed or bare hex; short input is left-padded with zeros.
fn parse_padded_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() {
        return Err(ParseHexError::Empty);
    }
    if digits.len() > N * 2 {
        return Err(ParseHexError::TooLong {
            max: N * 2,
            actual: digits.len(),
        });
    }

    let padded = format!("{digits:0>width$}", width = N * 2);
    let mut out = [0u8; N];
    hex::decode_to_slice(padded, &mut out).map_err(|err| ParseHexError::Invalid(err.to_string()))?;
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Devnet,
    Testnet,
    Mainnet,
    Local,
    Custom,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Local => "local",
            Network::Custom => "custom",
        }
    }

    pub fn default_fullnode_url(&self) -> Option<&'static str> {
        match self {
            Network::Devnet => Some("https://devnet.cedra.dev/v1"),
            Network::Local => Some("http://127.0.0.1:8080/v1"),
            _ => None,
        }
    }

    pub fn default_faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Devnet => Some("https://faucet-api.cedra.dev"),
            Network::Local => Some("http://127.0.0.1:8081"),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown network '{0}'")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            "local" | "localnet" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}
