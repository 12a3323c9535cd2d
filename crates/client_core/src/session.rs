use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chain_client::ChainClient;
use shared::domain::{AccountAddress, Network};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::account::LocalAccount;

/// Ordering token taken before a session-mutating external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Comparable view of the session at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connected_address: Option<AccountAddress>,
    pub network: Option<Network>,
    pub counterpart: Option<AccountAddress>,
    pub last_applied: u64,
}

struct SessionInner {
    connected_address: Option<AccountAddress>,
    last_applied: u64,
    client: Option<Arc<dyn ChainClient>>,
    demo_counterpart: Option<Arc<LocalAccount>>,
}

/// Per-run wallet session. Writes go through one async mutex; connection changes only land when
/// their ticket is newer than the last one applied.
pub struct SessionState {
    inner: Mutex<SessionInner>,
    next_ticket: AtomicU64,
}

impl SessionState {
    /// Binds `client` and generates a fresh demo counterpart keypair.
    pub fn initialize(client: Arc<dyn ChainClient>) -> Self {
        let counterpart = LocalAccount::generate();
        debug!(
            network = %client.network(),
            counterpart = %counterpart.address(),
            "session: initialized"
        );
        Self::with_parts(Some(client), Some(Arc::new(counterpart)))
    }

    pub fn with_parts(
        client: Option<Arc<dyn ChainClient>>,
        demo_counterpart: Option<Arc<LocalAccount>>,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                connected_address: None,
                last_applied: 0,
                client,
                demo_counterpart,
            }),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn issue_ticket(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns false when a newer completion already landed.
    pub async fn set_connected(&self, ticket: Ticket, address: AccountAddress) -> bool {
        let mut inner = self.inner.lock().await;
        if ticket.0 <= inner.last_applied {
            warn!(
                ticket = ticket.0,
                applied = inner.last_applied,
                %address,
                "session: discarding stale connect completion"
            );
            return false;
        }
        inner.last_applied = ticket.0;
        inner.connected_address = Some(address);
        true
    }

    pub async fn clear(&self, ticket: Ticket) -> bool {
        let mut inner = self.inner.lock().await;
        if ticket.0 <= inner.last_applied {
            warn!(
                ticket = ticket.0,
                applied = inner.last_applied,
                "session: discarding stale disconnect completion"
            );
            return false;
        }
        inner.last_applied = ticket.0;
        inner.connected_address = None;
        true
    }

    pub async fn connected_address(&self) -> Option<AccountAddress> {
        self.inner.lock().await.connected_address
    }

    pub async fn client(&self) -> Option<Arc<dyn ChainClient>> {
        self.inner.lock().await.client.clone()
    }

    pub async fn demo_counterpart(&self) -> Option<Arc<LocalAccount>> {
        self.inner.lock().await.demo_counterpart.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            connected_address: inner.connected_address,
            network: inner.client.as_ref().map(|client| client.network()),
            counterpart: inner
                .demo_counterpart
                .as_ref()
                .map(|account| account.address()),
            last_applied: inner.last_applied,
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
