//! Seam between a device transaction and whatever carries its response.

use futures::future::{self, BoxFuture};

use modbus_frame::Frame;

use crate::device::DeviceId;
use crate::error::DispatchError;

/// Resolves to the status code the far side reported.
pub type DispatchFuture<'a> = BoxFuture<'a, Result<u16, DispatchError>>;

/// Delivers a transaction's response to a device.
///
/// `None` means the device must see no response at all.
pub trait DeviceLink: Send + Sync {
    fn deliver<'a>(&'a self, device: &'a DeviceId, response: Option<&'a Frame>)
        -> DispatchFuture<'a>;
}

/// In-process link for callers that carry the response themselves, such as
/// the HTTP transaction endpoint whose reply is the delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopbackLink;

impl LoopbackLink {
    pub const DELIVERED: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
}

impl DeviceLink for LoopbackLink {
    fn deliver<'a>(
        &'a self,
        _device: &'a DeviceId,
        response: Option<&'a Frame>,
    ) -> DispatchFuture<'a> {
        let status = match response {
            Some(_) => Self::DELIVERED,
            None => Self::NO_CONTENT,
        };
        Box::pin(future::ready(Ok(status)))
    }
}
