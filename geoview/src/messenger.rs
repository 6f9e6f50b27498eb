use maybe_sync::{MaybeSend, MaybeSync};

/// Notifies the render surface that the viewer state changed outside of its own event loop, e.g.
/// when a load running on the async runtime completes.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Asks the surface to redraw as soon as possible.
    fn request_redraw(&self);
}

/// Messenger that does nothing. Used when nobody needs to be notified, e.g. in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
