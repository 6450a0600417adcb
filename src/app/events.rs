//! Outbound application events.
//!
//! The node cycle emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them; the log adapter renders the diagnostic
//! text lines.

use heapless::Vec;

use crate::error::Error;
use crate::fsm::NodeState;
use crate::protocol::{MAX_PACKET_LEN, MeasurementSample};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(NodeState),

    /// The FSM transitioned between states.
    StateChanged { from: NodeState, to: NodeState },

    /// Radio bring-up failed; the node keeps going without it.
    RadioSetupFailed(Error),

    /// Calibration coefficients loaded on the given attempt (1-based).
    CalibrationLoaded { attempts: u16 },

    /// Every calibration attempt failed; compensation runs on zeroed
    /// coefficients.
    CalibrationUnavailable { attempts: u16 },

    /// A fresh sample was stored for reporting.
    Measurement(MeasurementSample),

    /// The humidity reading's CRC bytes did not match. The sample is kept.
    HumidityChecksumMismatch,

    /// The measurement cycle was abandoned.
    MeasureFailed(Error),

    /// A packet was handed to the radio.
    PacketQueued(Vec<u8, MAX_PACKET_LEN>),

    /// Writing or sending a packet failed.
    TransmitFailed(Error),
}
