//! Transport between ring members.
//!
//! The ring algorithms only need "send this [Request] to the member at this address and
//! wait for the [Response]". [Transport] is that seam, [RequestHandler] is the receiving
//! side implemented by [ChordNode](crate::node::ChordNode).
#![warn(missing_docs)]
use async_trait::async_trait;

use crate::dht::MemberRef;
use crate::error::Result;
use crate::message::Request;
use crate::message::Response;

mod local;

pub use local::LocalTransport;

/// Sending side of the peer protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `target` and wait for its answer.
    /// A failure of the handler itself comes back as [Response::Failure], while an `Err`
    /// means the request never reached the handler.
    async fn request(&self, target: &MemberRef, request: Request) -> Result<Response>;
}

/// Receiving side of the peer protocol.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one request.
    async fn handle(&self, request: Request) -> Result<Response>;
}
