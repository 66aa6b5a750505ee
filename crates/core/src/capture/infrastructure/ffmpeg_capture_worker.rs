use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ffmpeg_next::format::context::Input;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::FrameHandler;
use crate::shared::frame::Frame;

/// Opens the input on the worker thread.
///
/// libav contexts are not `Send`, so they are created and dropped on the
/// thread that decodes them.
pub(super) type InputOpener = Box<dyn FnOnce() -> Result<Input, CaptureError> + Send>;

/// Worker thread that decodes an ffmpeg input and pushes RGB frames into a
/// handler until stopped or the input ends.
pub(super) struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// Spawns the worker and blocks until the input is open and decodable.
    pub(super) fn spawn(
        opener: InputOpener,
        realtime: bool,
        mut handler: FrameHandler,
    ) -> Result<Self, CaptureError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_worker = stop.clone();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);

        let handle = std::thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let session = match opener().and_then(DecodeSession::prepare) {
                    Ok(session) => {
                        let _ = ready_tx.send(Ok(()));
                        session
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = session.run(&stop_worker, realtime, &mut handler) {
                    log::error!("{e}");
                }
                log::debug!("Capture worker exiting");
            })
            .map_err(|e| CaptureError::Stream(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Stream(
                    "capture thread exited before opening the input".into(),
                ))
            }
        }
    }

    pub(super) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub(super) fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DecodeSession {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: f64,
    width: u32,
    height: u32,
}

impl DecodeSession {
    fn prepare(ictx: Input) -> Result<Self, CaptureError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(CaptureError::NoVideoStream)?;
        let stream_index = stream.index();
        let tb = stream.time_base();
        let time_base = if tb.denominator() != 0 {
            tb.numerator() as f64 / tb.denominator() as f64
        } else {
            0.0
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(stream_error)?;
        let decoder = codec_ctx.decoder().video().map_err(stream_error)?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(stream_error)?;

        log::info!("Capture opened: {width}x{height}");

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            width,
            height,
        })
    }

    fn run(
        mut self,
        stop: &AtomicBool,
        realtime: bool,
        handler: &mut FrameHandler,
    ) -> Result<(), CaptureError> {
        let mut out = FrameOutput {
            scaler: &mut self.scaler,
            width: self.width,
            height: self.height,
            time_base: self.time_base,
            next_index: 0,
            started: Instant::now(),
            realtime,
        };

        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let mut packet = ffmpeg_next::Packet::empty();
            match read_step(packet.read(&mut self.ictx)) {
                ReadStep::Packet => {}
                ReadStep::Retry => {
                    std::thread::sleep(RETRY_DELAY);
                    continue;
                }
                ReadStep::End => break,
                ReadStep::Fail(e) => return Err(e),
            }
            if packet.stream() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }
            out.drain(&mut self.decoder, stop, handler)?;
        }

        let _ = self.decoder.send_eof();
        out.drain(&mut self.decoder, stop, handler)?;
        log::info!("Capture input ended after {} frames", out.next_index);
        Ok(())
    }
}

/// Back-off while a live device has no packet ready.
const RETRY_DELAY: Duration = Duration::from_millis(5);

#[derive(Debug)]
enum ReadStep {
    Packet,
    Retry,
    End,
    Fail(CaptureError),
}

/// EAGAIN is retried, EOF ends the stream, anything else (an unplugged
/// camera, a truncated file) ends it with an error.
fn read_step(result: Result<(), ffmpeg_next::Error>) -> ReadStep {
    match result {
        Ok(()) => ReadStep::Packet,
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
            ReadStep::Retry
        }
        Err(ffmpeg_next::Error::Eof) => ReadStep::End,
        Err(e) => ReadStep::Fail(CaptureError::Stream(format!("read failed: {e}"))),
    }
}

struct FrameOutput<'a> {
    scaler: &'a mut ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    time_base: f64,
    next_index: usize,
    started: Instant,
    realtime: bool,
}

impl FrameOutput<'_> {
    fn drain(
        &mut self,
        decoder: &mut ffmpeg_next::decoder::Video,
        stop: &AtomicBool,
        handler: &mut FrameHandler,
    ) -> Result<(), CaptureError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            self.scaler.run(&decoded, &mut rgb).map_err(stream_error)?;

            let timestamp = decoded
                .timestamp()
                .map(|pts| Duration::from_secs_f64((pts as f64 * self.time_base).max(0.0)))
                .unwrap_or_default();
            if self.realtime {
                pace(self.started, timestamp);
            }

            let pixels = packed_rgb(&rgb, self.width, self.height);
            let frame =
                Frame::new(pixels, self.width, self.height, self.next_index).with_timestamp(timestamp);
            self.next_index += 1;
            handler(frame);
        }
        Ok(())
    }
}

/// Sleeps until `timestamp` has elapsed since `started`.
fn pace(started: Instant, timestamp: Duration) {
    let elapsed = started.elapsed();
    if timestamp > elapsed {
        std::thread::sleep(timestamp - elapsed);
    }
}

/// Strips libav row padding (stride may exceed `width * 3`).
fn packed_rgb(rgb: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

fn stream_error(e: ffmpeg_next::Error) -> CaptureError {
    CaptureError::Stream(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_pace_returns_immediately_for_past_timestamps() {
        let started = Instant::now() - Duration::from_secs(1);
        let before = Instant::now();
        pace(started, Duration::from_millis(10));
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_pace_waits_for_future_timestamps() {
        let started = Instant::now();
        pace(started, Duration::from_millis(30));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_read_step_retries_when_device_is_busy() {
        let step = read_step(Err(ffmpeg_next::Error::Other {
            errno: ffmpeg_next::error::EAGAIN,
        }));
        assert!(matches!(step, ReadStep::Retry));
    }

    #[test]
    fn test_read_step_ends_on_eof() {
        assert!(matches!(read_step(Err(ffmpeg_next::Error::Eof)), ReadStep::End));
        assert!(matches!(read_step(Ok(())), ReadStep::Packet));
    }

    #[rstest]
    #[case(ffmpeg_next::Error::Other { errno: ffmpeg_next::error::ENODEV })]
    #[case(ffmpeg_next::Error::Other { errno: ffmpeg_next::error::EIO })]
    #[case(ffmpeg_next::Error::InvalidData)]
    fn test_read_step_fails_on_lost_device(#[case] error: ffmpeg_next::Error) {
        assert!(matches!(
            read_step(Err(error)),
            ReadStep::Fail(CaptureError::Stream(_))
        ));
    }

    #[test]
    fn test_failed_open_is_reported_synchronously() {
        let opener: InputOpener = Box::new(|| Err(CaptureError::DeviceUnavailable("none".into())));
        let result = CaptureWorker::spawn(opener, false, Box::new(|_| {}));
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
    }
}
