//! Device input node (C6, `input_channel` NodeSpec, §4.2.2).
//!
//! `cpal::Stream` is not `Send` on every backend, so the stream itself is
//! never stored on the node: `acquire` spawns a dedicated audio thread that
//! owns the stream for the node's whole lifetime, and the capture callback -
//! which must stay short and non-blocking - only appends samples to a
//! lock-protected accumulator the node polls from `emit`.

use std::sync::mpsc::{Receiver as MpscReceiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};

use synchro_core::{AudioFormat, Contextual, Emitter, Frame, LifecycleResult, MonoStrategy, StreamConfig};

use crate::devices::input_device_by_index;

/// Captures from a host input device, downmixing to mono in the callback,
/// and emits whatever has accumulated since the last `emit`.
pub struct DeviceInputNode {
    name: String,
    device_index: i64,
    /// 1-based channel to select when the device has more than one and no
    /// averaging is requested (`input_channel`'s `channel` field, §6).
    channel: usize,
    accumulator: Arc<Mutex<Vec<u8>>>,
    sample_rate: Arc<Mutex<Option<u32>>>,
    shutdown: Option<Sender<()>>,
    audio_thread: Option<JoinHandle<()>>,
}

impl DeviceInputNode {
    /// Builds a device input node capturing from `device_index` (negative
    /// means the host default), selecting 1-based `channel` when downmixing.
    #[must_use]
    pub fn new(name: impl Into<String>, device_index: i64, channel: usize) -> Self {
        Self {
            name: name.into(),
            device_index,
            channel: channel.max(1),
            accumulator: Arc::new(Mutex::new(Vec::new())),
            sample_rate: Arc::new(Mutex::new(None)),
            shutdown: None,
            audio_thread: None,
        }
    }
}

impl Contextual for DeviceInputNode {
    fn acquire(&mut self) -> LifecycleResult {
        let device = input_device_by_index(self.device_index)?;
        let supported = device
            .default_input_config()
            .map_err(|e| format!("device input: no default config: {e}"))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let channel_idx = (self.channel - 1).min(channels.saturating_sub(1));

        *self.sample_rate.lock().unwrap() = Some(sample_rate);

        let acc = Arc::clone(&self.accumulator);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        self.shutdown = Some(shutdown_tx);

        let name = self.name.clone();
        let stream_config: cpal::StreamConfig = supported.into();
        let handle = std::thread::spawn(move || {
            run_capture_thread(device, stream_config, channels, channel_idx, acc, ready_tx, shutdown_rx, name);
        });
        self.audio_thread = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(node = %self.name, rate = sample_rate, "device input: streaming");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("device input: {e}").into()),
            Err(_) => Err("device input: capture thread exited before ready".into()),
        }
    }

    fn release(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Emitter for DeviceInputNode {
    fn emit(&mut self) -> Option<Frame> {
        let bytes = {
            let mut buf = self.accumulator.lock().unwrap();
            if buf.is_empty() {
                return None;
            }
            std::mem::take(&mut *buf)
        };
        let rate = self.sample_rate.lock().unwrap().unwrap_or(48000);
        let config = StreamConfig::mono(AudioFormat::Float32, rate);
        let frame = Frame::new(config, bytes).ok()?;
        Some(frame.sanitize_to_mono_float32(MonoStrategy::Mean))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_capture_thread(
    device: cpal::Device,
    config: cpal::StreamConfig,
    channels: usize,
    channel_idx: usize,
    acc: Arc<Mutex<Vec<u8>>>,
    ready_tx: Sender<std::result::Result<(), String>>,
    shutdown_rx: MpscReceiver<()>,
    name: String,
) {
    let err_name = name.clone();
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut buf = acc.lock().unwrap();
            if channels > 1 {
                for chunk in data.chunks_exact(channels) {
                    buf.extend_from_slice(&chunk[channel_idx].to_le_bytes());
                }
            } else {
                buf.extend(data.iter().flat_map(|s| s.to_le_bytes()));
            }
        },
        move |err| tracing::warn!(node = %err_name, error = %err, "device input: stream error"),
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(e.to_string()));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    let _ = shutdown_rx.recv();
    tracing::debug!(node = %name, "device input: capture thread shutting down");
}
