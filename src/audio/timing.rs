// Transport timing counters, shared between the device callback and the producer

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::timecode::rate::MICROS_PER_SECOND;

/// Atomic counters written by the callback and read by the producer thread.
/// All loads and stores are relaxed: each counter is independent.
#[derive(Clone)]
pub struct TransportTiming {
    /// Samples handed to the device
    played: Arc<AtomicU64>,
    /// Frames filled with silence because the queue was empty
    underruns: Arc<AtomicU64>,
    /// Callback-to-playback latency last reported by the device
    device_latency: Arc<AtomicU64>,
    sample_rate: u32,
}

impl TransportTiming {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            played: Arc::new(AtomicU64::new(0)),
            underruns: Arc::new(AtomicU64::new(0)),
            device_latency: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }

    pub fn record_played(&self, frames: usize) {
        self.played.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn record_underrun(&self, frames: usize) {
        self.underruns.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn device_latency_samples(&self) -> u64 {
        self.device_latency.load(Ordering::Relaxed)
    }

    pub fn set_device_latency_micros(&self, micros: u64) {
        self.device_latency
            .store(self.micros_to_samples(micros), Ordering::Relaxed);
    }

    pub fn micros_to_samples(&self, micros: u64) -> u64 {
        micros * self.sample_rate as u64 / MICROS_PER_SECOND as u64
    }
}
