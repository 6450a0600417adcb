//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements | Connects to                   |
//! |------------|------------|-------------------------------|
//! | `log_sink` | EventSink  | Serial log output             |
//! | `nvs`      | ConfigPort | NVS / in-memory store         |
//! | `power`    | PowerPort  | ESP-IDF sleep timer / no-op   |

pub mod log_sink;
pub mod nvs;
pub mod power;
