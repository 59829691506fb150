//! Level meter sink node (§6 `measurer` NodeSpec).
//!
//! A receiver-only node: no downstream consumer, so it implements no
//! [`Emitter`]. Renders a fixed-width ASCII bar of the rolling RMS level over
//! `window_seconds` of audio, refreshed at most `refresh_hz` times per
//! second, to stdout, stderr, or an append-mode file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use synchro_core::format::pcm_to_float32;
use synchro_core::{Contextual, Frame, LifecycleResult, Receiver};

/// Where rendered meter lines are written.
#[derive(Debug, Clone)]
pub enum MeterSink {
    Stdout,
    Stderr,
    File(PathBuf),
}

/// Renders a periodic ASCII level bar over a rolling window of received audio.
pub struct LevelMeter {
    name: String,
    refresh_hz: f64,
    window_samples_target: Option<usize>,
    window_seconds: f64,
    bar_height: usize,
    clip_threshold_float: f32,
    sink: MeterSink,
    file: Option<File>,
    window: Vec<f32>,
    rate: Option<u32>,
    last_refresh: Option<Instant>,
}

impl LevelMeter {
    /// Builds a level meter. `bar_height` is the bar's width in characters.
    #[must_use]
    pub fn new(name: impl Into<String>, refresh_hz: f64, window_seconds: f64, bar_height: usize, clip_threshold_float: f32, sink: MeterSink) -> Self {
        Self {
            name: name.into(),
            refresh_hz: refresh_hz.max(0.1),
            window_samples_target: None,
            window_seconds,
            bar_height: bar_height.max(1),
            clip_threshold_float,
            sink,
            file: None,
            window: Vec::new(),
            rate: None,
            last_refresh: None,
        }
    }

    fn render(&self, rms: f32, peak: f32) -> String {
        let filled = ((rms.clamp(0.0, 1.0) * self.bar_height as f32).round() as usize).min(self.bar_height);
        let bar: String = (0..self.bar_height).map(|i| if i < filled { '#' } else { '-' }).collect();
        let clipped = peak >= self.clip_threshold_float;
        format!(
            "{name} [{bar}] rms={rms:.4} peak={peak:.4}{clip}",
            name = self.name,
            clip = if clipped { " CLIP" } else { "" },
        )
    }

    fn emit_line(&mut self, line: &str) {
        match &self.sink {
            MeterSink::Stdout => println!("{line}"),
            MeterSink::Stderr => eprintln!("{line}"),
            MeterSink::File(_) => {
                if let Some(file) = self.file.as_mut() {
                    if let Err(e) = writeln!(file, "{line}") {
                        tracing::warn!(node = %self.name, error = %e, "measurer: failed to write meter line");
                    }
                }
            }
        }
    }
}

impl Contextual for LevelMeter {
    fn acquire(&mut self) -> LifecycleResult {
        if let MeterSink::File(path) = &self.sink {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("measurer: failed to open sink file {}: {e}", path.display()))?;
            self.file = Some(file);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.file = None;
    }
}

impl Receiver for LevelMeter {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        let cfg = frame.config();
        if self.rate != Some(cfg.sample_rate_hz) {
            self.rate = Some(cfg.sample_rate_hz);
            self.window_samples_target = Some((self.window_seconds * f64::from(cfg.sample_rate_hz)) as usize);
            self.window.clear();
        }

        let samples = pcm_to_float32(cfg.audio_format, frame.payload());
        self.window.extend_from_slice(&samples);
        if let Some(target) = self.window_samples_target {
            if self.window.len() > target.max(1) {
                let drop = self.window.len() - target.max(1);
                self.window.drain(..drop);
            }
        }

        let now = Instant::now();
        let due = self.last_refresh.is_none_or(|t| now.duration_since(t).as_secs_f64() >= 1.0 / self.refresh_hz);
        if !due || self.window.is_empty() {
            return;
        }
        self.last_refresh = Some(now);

        let sum_sq: f64 = self.window.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let rms = ((sum_sq / self.window.len() as f64).sqrt()) as f32;
        let peak = self.window.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        let line = self.render(rms, peak);
        self.emit_line(&line);
    }
}
