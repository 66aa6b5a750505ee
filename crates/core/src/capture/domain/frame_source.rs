use crate::shared::frame::Frame;

use super::capture_error::CaptureError;

/// Per-frame callback. Runs on the source's worker thread, one frame at a
/// time, in delivery order.
pub type FrameHandler = Box<dyn FnMut(Frame) + Send>;

/// Push-based supplier of live frames.
///
/// Implementations own a worker thread for the lifetime of a run. They must
/// also stop on drop so the underlying device is always released.
pub trait FrameSource: Send {
    /// Opens the source and starts pushing frames into `handler`.
    ///
    /// Returns only once the device is open, so acquisition errors surface
    /// here rather than on the worker.
    fn on_frame(&mut self, handler: FrameHandler) -> Result<(), CaptureError>;

    /// Stops delivery and joins the worker. Calling it twice is harmless.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
