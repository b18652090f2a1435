use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::DashSet;

use super::RequestHandler;
use super::Transport;
use crate::dht::MemberRef;
use crate::error::Error;
use crate::error::Result;
use crate::message::Request;
use crate::message::Response;

/// An in-process transport for local testing and simulation.
/// Members register their handler under their address, every message is encoded with
/// bincode on the way in and out so that only wire data crosses between members.
///
/// Cloning shares the registry, so each ring gets its own hub.
#[derive(Clone, Default)]
pub struct LocalTransport {
    handlers: Arc<DashMap<String, Weak<dyn RequestHandler>>>,
    offline: Arc<DashSet<String>>,
}

impl LocalTransport {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` to receive requests sent to `address`.
    /// Only a weak reference is kept, a dropped handler becomes unreachable.
    pub fn register(&self, address: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        let address = address.into();
        tracing::debug!("local transport register {}", address);
        self.handlers.insert(address, Arc::downgrade(&handler));
    }

    /// Remove the handler behind `address`.
    pub fn unregister(&self, address: &str) {
        self.handlers.remove(address);
        self.offline.remove(address);
    }

    /// Mark `address` offline: requests to it fail while its handler stays registered.
    pub fn set_offline(&self, address: &str, offline: bool) {
        tracing::debug!("local transport mark {} offline: {}", address, offline);
        if offline {
            self.offline.insert(address.to_string());
        } else {
            self.offline.remove(address);
        }
    }

    /// Addresses currently registered.
    pub fn addresses(&self) -> Vec<String> {
        self.handlers.iter().map(|x| x.key().clone()).collect()
    }

    fn handler(&self, address: &str) -> Result<Arc<dyn RequestHandler>> {
        if self.offline.contains(address) {
            return Err(Error::PeerOffline(address.to_string()));
        }
        // Clone the weak ref out so that no shard lock is held across an await.
        let weak = self
            .handlers
            .get(address)
            .map(|x| x.value().clone())
            .ok_or_else(|| Error::PeerUnreachable(address.to_string()))?;
        weak.upgrade()
            .ok_or_else(|| Error::PeerUnreachable(address.to_string()))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn request(&self, target: &MemberRef, request: Request) -> Result<Response> {
        let handler = self.handler(&target.address)?;
        let name = request.name();
        let data = bincode::serialize(&request).map_err(Error::BincodeSerialize)?;
        let request: Request = bincode::deserialize(&data).map_err(Error::BincodeDeserialize)?;

        let response = match handler.handle(request).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!("{} on {} failed: {}", name, target, e);
                Response::from(&e)
            }
        };

        let data = bincode::serialize(&response).map_err(Error::BincodeSerialize)?;
        bincode::deserialize(&data).map_err(Error::BincodeDeserialize)
    }
}
