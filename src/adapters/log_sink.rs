//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the logger
//! (UART on the device). Measurements and packets use the fixed
//! diagnostic line formats from [`crate::diagnostics`].

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::diagnostics::{format_measurement_line, format_packet_line};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::RadioSetupFailed(e) => {
                warn!("RADIO | setup failed: {}", e);
            }
            AppEvent::CalibrationLoaded { attempts } => {
                info!("CALIB | loaded, attempts={}", attempts);
            }
            AppEvent::CalibrationUnavailable { attempts } => {
                warn!("CALIB | unavailable after {} attempts", attempts);
            }
            AppEvent::Measurement(sample) => {
                info!("{}", format_measurement_line(sample));
            }
            AppEvent::HumidityChecksumMismatch => {
                warn!("SHT4X | checksum mismatch");
            }
            AppEvent::MeasureFailed(e) => {
                warn!("MEASURE | failed: {}", e);
            }
            AppEvent::PacketQueued(bytes) => {
                info!("{}", format_packet_line(bytes));
            }
            AppEvent::TransmitFailed(e) => {
                warn!("RADIO | transmit failed: {}", e);
            }
        }
    }
}
