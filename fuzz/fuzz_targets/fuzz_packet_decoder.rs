//! Fuzz target: `protocol::decode`
//!
//! Drives arbitrary byte sequences into the packet decoder and the
//! diagnostic formatter. Neither may panic, and every accepted packet
//! must describe exactly the bytes it was decoded from.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use subghz_node::diagnostics::format_packet_line;
use subghz_node::protocol::{MAX_PACKET_LEN, decode};

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = decode(data) {
        let header = packet.header();
        assert_eq!(usize::from(header.length), data.len());
        assert!(data.len() <= MAX_PACKET_LEN);
    }

    let _ = format_packet_line(data);
});
