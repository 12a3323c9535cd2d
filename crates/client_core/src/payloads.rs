use shared::{
    domain::AccountAddress,
    protocol::{FunctionArgument, FunctionId, ModuleId, UnsignedTransactionRequest, ViewRequest},
};

pub const OCTAS_PER_COIN: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub uri: String,
}

/// The deployed NFT collection module, `<address>::<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionModule {
    pub address: AccountAddress,
    pub name: String,
}

impl CollectionModule {
    pub fn new(address: AccountAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }

    fn function(&self, name: &str) -> FunctionId {
        FunctionId::new(ModuleId::new(self.address, self.name.clone()), name)
    }

    pub fn mint_nft(
        &self,
        sender: AccountAddress,
        to: AccountAddress,
        metadata: &NftMetadata,
    ) -> UnsignedTransactionRequest {
        UnsignedTransactionRequest::new(
            sender,
            self.function("mint_nft"),
            vec![
                FunctionArgument::Address(to),
                FunctionArgument::String(metadata.name.clone()),
                FunctionArgument::String(metadata.description.clone()),
                FunctionArgument::String(metadata.uri.clone()),
            ],
        )
    }

    /// One transaction minting every item; names, descriptions and uris travel as parallel
    /// vectors.
    pub fn mint_batch_nft(
        &self,
        sender: AccountAddress,
        to: AccountAddress,
        items: &[NftMetadata],
    ) -> UnsignedTransactionRequest {
        UnsignedTransactionRequest::new(
            sender,
            self.function("mint_batch_nft"),
            vec![
                FunctionArgument::Address(to),
                FunctionArgument::strings(items.iter().map(|item| item.name.as_str())),
                FunctionArgument::strings(items.iter().map(|item| item.description.as_str())),
                FunctionArgument::strings(items.iter().map(|item| item.uri.as_str())),
            ],
        )
    }

    pub fn transfer_nft(
        &self,
        sender: AccountAddress,
        object_address: AccountAddress,
        to: AccountAddress,
    ) -> UnsignedTransactionRequest {
        UnsignedTransactionRequest::new(
            sender,
            self.function("transfer_nft"),
            vec![
                FunctionArgument::Address(object_address),
                FunctionArgument::Address(to),
            ],
        )
    }

    pub fn collection_exists(&self, creator: AccountAddress) -> ViewRequest {
        ViewRequest::new(
            self.function("collection_exists"),
            vec![FunctionArgument::Address(creator)],
        )
    }
}

/// `0x1::cedra_account::transfer(to, amount)`, which also creates `to` if needed.
pub fn coin_transfer(
    sender: AccountAddress,
    to: AccountAddress,
    amount: u64,
) -> UnsignedTransactionRequest {
    UnsignedTransactionRequest::new(
        sender,
        FunctionId::new(ModuleId::new(AccountAddress::ONE, "cedra_account"), "transfer"),
        vec![FunctionArgument::Address(to), FunctionArgument::U64(amount)],
    )
}

/// Two demo tokens whose names carry `stamp_millis` so repeated mints stay unique.
pub fn demo_batch(stamp_millis: i64) -> Vec<NftMetadata> {
    vec![
        NftMetadata {
            name: format!("My NFT #1 [{stamp_millis}]"),
            description: "First NFT from my dApp".to_string(),
            uri: "https://metadata.cedra.dev/v2/genesis-1.json".to_string(),
        },
        NftMetadata {
            name: format!("My NFT #2 [{stamp_millis}]"),
            description: "Second NFT from my dApp".to_string(),
            uri: "https://metadata.cedra.dev/v2/genesis-2.json".to_string(),
        },
    ]
}

#[cfg(test)]
#[path = "tests/payloads_tests.rs"]
mod tests;
