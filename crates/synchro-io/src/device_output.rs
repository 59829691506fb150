//! Device output node (C7, `output_channel` NodeSpec).
//!
//! Mirrors [`crate::device_input::DeviceInputNode`]'s thread-confinement of
//! the `cpal::Stream`: `acquire` spawns a playback thread that owns the
//! stream and pulls samples from a shared queue that `receive` feeds.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};

use synchro_core::format::pcm_to_float32;
use synchro_core::{Contextual, Frame, LifecycleResult, Receiver};

use crate::devices::output_device_by_index;

/// Plays received audio out through a host output device, writing mono
/// content to a single configured channel and silence elsewhere.
pub struct DeviceOutputNode {
    name: String,
    device_index: i64,
    /// 1-based output channel to write to (`output_channel`'s `channel`
    /// field, §6); other channels in the device's stream are left silent.
    channel: usize,
    queue: Arc<Mutex<VecDeque<f32>>>,
    shutdown: Option<Sender<()>>,
    audio_thread: Option<JoinHandle<()>>,
}

impl DeviceOutputNode {
    /// Builds a device output node playing to `device_index` (negative
    /// means the host default) on 1-based `channel`.
    #[must_use]
    pub fn new(name: impl Into<String>, device_index: i64, channel: usize) -> Self {
        Self {
            name: name.into(),
            device_index,
            channel: channel.max(1),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            shutdown: None,
            audio_thread: None,
        }
    }
}

impl Contextual for DeviceOutputNode {
    fn acquire(&mut self) -> LifecycleResult {
        let device = output_device_by_index(self.device_index)?;
        let supported = device
            .default_output_config()
            .map_err(|e| format!("device output: no default config: {e}"))?;
        let channels = supported.channels() as usize;
        let channel_idx = (self.channel - 1).min(channels.saturating_sub(1));

        let queue = Arc::clone(&self.queue);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        self.shutdown = Some(shutdown_tx);

        let name = self.name.clone();
        let stream_config: cpal::StreamConfig = supported.into();
        let handle = std::thread::spawn(move || {
            run_playback_thread(device, stream_config, channels, channel_idx, queue, ready_tx, shutdown_rx, name);
        });
        self.audio_thread = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(node = %self.name, "device output: playing");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("device output: {e}").into()),
            Err(_) => Err("device output: playback thread exited before ready".into()),
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

impl Receiver for DeviceOutputNode {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        let samples = pcm_to_float32(frame.config().audio_format, frame.payload());
        let channels = frame.config().channels as usize;
        let mono: Vec<f32> = if channels > 1 {
            samples
                .chunks_exact(channels)
                .map(|c| c.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };
        self.queue.lock().unwrap().extend(mono);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_playback_thread(
    device: cpal::Device,
    config: cpal::StreamConfig,
    channels: usize,
    channel_idx: usize,
    queue: Arc<Mutex<VecDeque<f32>>>,
    ready_tx: Sender<std::result::Result<(), String>>,
    shutdown_rx: std::sync::mpsc::Receiver<()>,
    name: String,
) {
    let err_name = name.clone();
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut q = queue.lock().unwrap();
            if channels > 1 {
                for frame in data.chunks_exact_mut(channels) {
                    let sample = q.pop_front().unwrap_or(0.0);
                    for (i, out) in frame.iter_mut().enumerate() {
                        *out = if i == channel_idx { sample } else { 0.0 };
                    }
                }
            } else {
                for out in data.iter_mut() {
                    *out = q.pop_front().unwrap_or(0.0);
                }
            }
        },
        move |err| tracing::warn!(node = %err_name, error = %err, "device output: stream error"),
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
    tracing::debug!(node = %name, "device output: playback thread shutting down");
}
