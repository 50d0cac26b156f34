//! WiFi supervision task.

use log::warn;

use crate::adapters::wifi::WifiStation;
use crate::error::Result;

/// Associate once, then keep the station connected.
pub fn run_wifi(mut station: WifiStation) -> Result<()> {
    if let Err(e) = station.connect() {
        warn!("WiFi: initial connect failed ({}), retrying in background", e);
    }
    loop {
        let wait = station.poll();
        std::thread::sleep(wait);
    }
}
