//! Validation helpers shared across adapters.

/// `true` if every byte of `s` is printable ASCII (`0x20..=0x7E`).
///
/// WiFi SSIDs and MQTT identifiers must pass this before they reach the
/// ESP-IDF drivers, which treat the bytes as C strings.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
