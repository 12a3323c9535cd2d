pub mod account;
pub mod dispatcher;
pub mod error;
pub mod local_wallet;
pub mod payloads;
pub mod session;

pub use account::LocalAccount;
pub use dispatcher::{
    ActionDispatcher, ActionKind, ActionOutcome, ActionReport, DispatcherConfig, ExtensionSlot,
};
pub use error::{DispatchError, Precondition, Step};
pub use local_wallet::LocalWallet;
pub use payloads::{CollectionModule, NftMetadata};
pub use session::{SessionSnapshot, SessionState, Ticket};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
