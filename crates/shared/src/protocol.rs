use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    codec::{self, CodecError},
    domain::{AccountAddress, Ed25519PublicKey, Ed25519Signature, ParseHexError, TransactionHash},
};

/// Nesting limit for type tags parsed from text. A struct level costs the binary decoder two
/// containers, so this keeps parsed tags decodable inside a transaction.
pub const MAX_TYPE_TAG_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTypeError {
    #[error("malformed module path '{0}': expected <address>::<module>::<name>")]
    MalformedPath(String),
    #[error("invalid address in '{path}': {source}")]
    Address {
        path: String,
        source: ParseHexError,
    },
    #[error("unbalanced generic brackets in '{0}'")]
    UnbalancedGenerics(String),
    #[error("type nesting exceeds {MAX_TYPE_TAG_DEPTH} levels")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address.to_short_string(), self.name)
    }
}

/// Module-qualified entry or view function, `<address>::<module>::<function>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub module: ModuleId,
    pub name: String,
}

impl FunctionId {
    pub fn new(module: ModuleId, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

impl FromStr for FunctionId {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, module, name) = split_module_path(s)?;
        Ok(Self::new(ModuleId::new(address, module), name))
    }
}

fn split_module_path(path: &str) -> Result<(AccountAddress, &str, &str), ParseTypeError> {
    let mut parts = path.trim().split("::");
    let (Some(address), Some(module), Some(name), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseTypeError::MalformedPath(path.to_string()));
    };
    if module.is_empty() || name.is_empty() {
        return Err(ParseTypeError::MalformedPath(path.to_string()));
    }
    let address = address
        .parse::<AccountAddress>()
        .map_err(|source| ParseTypeError::Address {
            path: path.to_string(),
            source,
        })?;
    Ok((address, module, name))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTag {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
    pub type_args: Vec<TypeTag>,
}

/// Move type tag. Variants are declared in the chain's tag order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::U8 => f.write_str("u8"),
            TypeTag::U16 => f.write_str("u16"),
            TypeTag::U32 => f.write_str("u32"),
            TypeTag::U64 => f.write_str("u64"),
            TypeTag::U128 => f.write_str("u128"),
            TypeTag::U256 => f.write_str("u256"),
            TypeTag::Address => f.write_str("address"),
            TypeTag::Signer => f.write_str("signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{inner}>"),
            TypeTag::Struct(tag) => {
                write!(
                    f,
                    "{}::{}::{}",
                    tag.address.to_short_string(),
                    tag.module,
                    tag.name
                )?;
                if !tag.type_args.is_empty() {
                    let args = tag
                        .type_args
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "<{args}>")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for TypeTag {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type_tag(s, 0)
    }
}

fn parse_type_tag(s: &str, depth: usize) -> Result<TypeTag, ParseTypeError> {
    if depth >= MAX_TYPE_TAG_DEPTH {
        return Err(ParseTypeError::TooDeep);
    }
    let s = s.trim();
    let primitive = match s {
        "bool" => Some(TypeTag::Bool),
        "u8" => Some(TypeTag::U8),
        "u16" => Some(TypeTag::U16),
        "u32" => Some(TypeTag::U32),
        "u64" => Some(TypeTag::U64),
        "u128" => Some(TypeTag::U128),
        "u256" => Some(TypeTag::U256),
        "address" => Some(TypeTag::Address),
        "signer" => Some(TypeTag::Signer),
        _ => None,
    };
    if let Some(tag) = primitive {
        return Ok(tag);
    }

    if let Some(inner) = s.strip_prefix("vector<") {
        let inner = inner
            .strip_suffix('>')
            .ok_or_else(|| ParseTypeError::UnbalancedGenerics(s.to_string()))?;
        return Ok(TypeTag::Vector(Box::new(parse_type_tag(inner, depth + 1)?)));
    }

    let (path, type_args) = match s.find('<') {
        Some(open) => {
            let inner = s[open + 1..]
                .strip_suffix('>')
                .ok_or_else(|| ParseTypeError::UnbalancedGenerics(s.to_string()))?;
            (&s[..open], split_type_args(inner, depth + 1)?)
        }
        None => (s, Vec::new()),
    };
    let (address, module, name) = split_module_path(path)?;
    Ok(TypeTag::Struct(Box::new(StructTag {
        address,
        module: module.to_string(),
        name: name.to_string(),
        type_args,
    })))
}

fn split_type_args(inner: &str, depth: usize) -> Result<Vec<TypeTag>, ParseTypeError> {
    let mut args = Vec::new();
    let mut brackets = 0usize;
    let mut start = 0usize;
    for (index, ch) in inner.char_indices() {
        match ch {
            '<' => brackets += 1,
            '>' => {
                brackets = brackets
                    .checked_sub(1)
                    .ok_or_else(|| ParseTypeError::UnbalancedGenerics(inner.to_string()))?;
            }
            ',' if brackets == 0 => {
                args.push(parse_type_tag(&inner[start..index], depth)?);
                start = index + 1;
            }
            _ => {}
        }
    }
    if brackets != 0 {
        return Err(ParseTypeError::UnbalancedGenerics(inner.to_string()));
    }
    if !inner[start..].trim().is_empty() {
        args.push(parse_type_tag(&inner[start..], depth)?);
    }
    Ok(args)
}

/// A typed Move argument. Entry functions take them pre-encoded; view calls take JSON.
///
/// The binary form is the bare value, so the serde representation is untagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FunctionArgument {
    Bool(bool),
    U8(u8),
    U64(u64),
    U128(u128),
    Address(AccountAddress),
    String(String),
    Vector(Vec<FunctionArgument>),
}

impl FunctionArgument {
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FunctionArgument::Vector(
            values
                .into_iter()
                .map(|value| FunctionArgument::String(value.into()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            FunctionArgument::Bool(value) => json!(value),
            FunctionArgument::U8(value) => json!(value),
            FunctionArgument::U64(value) => json!(value.to_string()),
            FunctionArgument::U128(value) => json!(value.to_string()),
            FunctionArgument::Address(address) => json!(address.to_hex()),
            FunctionArgument::String(value) => json!(value),
            FunctionArgument::Vector(items) => {
                Value::Array(items.iter().map(FunctionArgument::to_json).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    pub args: Vec<Vec<u8>>,
}

/// Stands in for wire variants this client neither produces nor accepts. It has no values, so
/// decoding one of those variants fails.
enum Unsupported {}

impl Serialize for Unsupported {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        match *self {}
    }
}

impl<'de> Deserialize<'de> for Unsupported {
    fn deserialize<D: Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Err(D::Error::custom("variant not supported by this client"))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "TransactionPayload")]
enum TransactionPayloadWire {
    Script(Unsupported),
    ModuleBundle(Unsupported),
    EntryFunction(EntryFunction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TransactionPayloadWire", into = "TransactionPayloadWire")]
pub enum TransactionPayload {
    EntryFunction(EntryFunction),
}

impl From<TransactionPayloadWire> for TransactionPayload {
    fn from(wire: TransactionPayloadWire) -> Self {
        match wire {
            TransactionPayloadWire::Script(never) | TransactionPayloadWire::ModuleBundle(never) => {
                match never {}
            }
            TransactionPayloadWire::EntryFunction(function) => {
                TransactionPayload::EntryFunction(function)
            }
        }
    }
}

impl From<TransactionPayload> for TransactionPayloadWire {
    fn from(payload: TransactionPayload) -> Self {
        match payload {
            TransactionPayload::EntryFunction(function) => {
                TransactionPayloadWire::EntryFunction(function)
            }
        }
    }
}

/// Sender, function and arguments of a transaction before the node fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransactionRequest {
    pub sender: AccountAddress,
    pub function: FunctionId,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<FunctionArgument>,
}

impl UnsignedTransactionRequest {
    pub fn new(
        sender: AccountAddress,
        function: FunctionId,
        arguments: Vec<FunctionArgument>,
    ) -> Self {
        Self {
            sender,
            function,
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn entry_function(&self) -> Result<EntryFunction, CodecError> {
        Ok(EntryFunction {
            module: self.function.module.clone(),
            function: self.function.name.clone(),
            ty_args: self.type_arguments.clone(),
            args: self
                .arguments
                .iter()
                .map(codec::to_bytes)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

/// Proof that the sender approved a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountAuthenticator {
    Ed25519 {
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "TransactionAuthenticator")]
enum TransactionAuthenticatorWire {
    Ed25519 {
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    },
    MultiEd25519(Unsupported),
    MultiAgent(Unsupported),
    FeePayer(Unsupported),
    SingleSender(AccountAuthenticator),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "TransactionAuthenticatorWire",
    into = "TransactionAuthenticatorWire"
)]
pub enum TransactionAuthenticator {
    Ed25519 {
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    },
    SingleSender(AccountAuthenticator),
}

impl From<TransactionAuthenticatorWire> for TransactionAuthenticator {
    fn from(wire: TransactionAuthenticatorWire) -> Self {
        match wire {
            TransactionAuthenticatorWire::Ed25519 {
                public_key,
                signature,
            } => TransactionAuthenticator::Ed25519 {
                public_key,
                signature,
            },
            TransactionAuthenticatorWire::SingleSender(account) => {
                TransactionAuthenticator::SingleSender(account)
            }
            TransactionAuthenticatorWire::MultiEd25519(never)
            | TransactionAuthenticatorWire::MultiAgent(never)
            | TransactionAuthenticatorWire::FeePayer(never) => match never {},
        }
    }
}

impl From<TransactionAuthenticator> for TransactionAuthenticatorWire {
    fn from(authenticator: TransactionAuthenticator) -> Self {
        match authenticator {
            TransactionAuthenticator::Ed25519 {
                public_key,
                signature,
            } => TransactionAuthenticatorWire::Ed25519 {
                public_key,
                signature,
            },
            TransactionAuthenticator::SingleSender(account) => {
                TransactionAuthenticatorWire::SingleSender(account)
            }
        }
    }
}

impl From<AccountAuthenticator> for TransactionAuthenticator {
    fn from(value: AccountAuthenticator) -> Self {
        match value {
            AccountAuthenticator::Ed25519 {
                public_key,
                signature,
            } => TransactionAuthenticator::Ed25519 {
                public_key,
                signature,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub raw_txn: RawTransaction,
    pub authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    pub fn new(raw_txn: RawTransaction, sender_authenticator: AccountAuthenticator) -> Self {
        Self {
            raw_txn,
            authenticator: sender_authenticator.into(),
        }
    }
}

/// Signature over a UTF-8 text message, as returned by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: String,
    pub public_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub function: FunctionId,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<FunctionArgument>,
}

impl ViewRequest {
    pub fn new(function: FunctionId, arguments: Vec<FunctionArgument>) -> Self {
        Self {
            function,
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn with_type_arguments(mut self, type_arguments: Vec<TypeTag>) -> Self {
        self.type_arguments = type_arguments;
        self
    }

    pub fn to_json_body(&self) -> Value {
        json!({
            "function": self.function.to_string(),
            "type_arguments": self
                .type_arguments
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            "arguments": self
                .arguments
                .iter()
                .map(FunctionArgument::to_json)
                .collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalityStatus {
    Committed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: TransactionHash,
    pub status: FinalityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub vm_status: String,
}

impl TransactionResult {
    pub fn is_committed(&self) -> bool {
        self.status == FinalityStatus::Committed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedToken {
    pub token_data_id: String,
    pub token_name: String,
    pub token_uri: String,
    pub collection_id: String,
    pub amount: u64,
}
