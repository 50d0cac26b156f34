//! Fuzz target: `decode_command`
//!
//! Feeds arbitrary command-topic payloads through the decoder and the
//! channel router.  Neither may panic, and an accepted `set_code` must
//! carry a valid PIN.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartsafe::app::commands::RemoteCommand;
use smartsafe::app::pin;
use smartsafe::channels::Channels;
use smartsafe::link::{codec, route_command};

fuzz_target!(|data: &[u8]| {
    if let Ok(RemoteCommand::SetCode(code)) = codec::decode_command(data) {
        assert!(pin::validate(&code), "decoder accepted invalid code {:?}", code);
    }

    let channels = Channels::new();
    let queued = route_command(data, &channels.command);
    assert_eq!(queued, channels.command.try_receive().is_ok());
});
