//! WiFi station-mode adapter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF driver via `esp_idf_svc::wifi`.
//! - **all other targets**: a simulated link for host-side tests.
//!
//! ## Reconnection policy
//!
//! When the AP drops, [`WifiStation::poll`] retries with an exponential
//! backoff (2 s → 4 s → 8 s … capped at 60 s).  The MQTT client notices
//! the outage on its own and reports it as a link event.

use core::fmt;
use core::time::Duration;

use heapless::String;
use log::{info, warn};

use super::utils::is_printable_ascii;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    /// The driver rejected the configuration or failed to start.
    DriverInit,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::DriverInit => write!(f, "WiFi driver init failed"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Validated station credentials.  An empty password selects an open
/// network.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: String<32>,
    password: String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: String::new(),
            password: String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ───────────────────────────────────────────────────────────────
// Backoff
// ───────────────────────────────────────────────────────────────

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

/// Doubling retry delay, capped at [`MAX_BACKOFF_SECS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    secs: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            secs: INITIAL_BACKOFF_SECS,
        }
    }
}

impl Backoff {
    /// Current delay; the following call returns twice as much.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.secs;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
        Duration::from_secs(u64::from(current))
    }

    pub fn reset(&mut self) {
        self.secs = INITIAL_BACKOFF_SECS;
    }
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

/// Interval between link checks while associated.
pub const LINK_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

pub struct WifiStation {
    state: WifiState,
    backoff: Backoff,
    ssid: String<32>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimLink {
    ap_up: bool,
    failures_left: u32,
}

impl WifiStation {
    /// Configure and start the STA driver.  Does not associate yet.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> Result<Self, ConnectivityError> {
        let driver = |e: EspError| {
            warn!("WiFi: driver error ({})", e);
            ConnectivityError::DriverInit
        };
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(driver)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(driver)?;

        let auth_method = if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        }))
        .map_err(driver)?;
        wifi.start().map_err(driver)?;
        info!("WiFi: station started for '{}'", creds.ssid);

        Ok(Self {
            state: WifiState::Disconnected,
            backoff: Backoff::default(),
            ssid: creds.ssid.clone(),
            wifi,
        })
    }

    /// Simulated station: the AP is reachable until told otherwise.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(creds: &WifiCredentials) -> Self {
        Self {
            state: WifiState::Disconnected,
            backoff: Backoff::default(),
            ssid: creds.ssid.clone(),
            sim: SimLink {
                ap_up: true,
                failures_left: 0,
            },
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Associate and wait for an IP address.
    pub fn connect(&mut self) -> Result<(), ConnectivityError> {
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff.reset();
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                warn!("WiFi: {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    /// Check the link and retry if it is down.  Returns how long to wait
    /// before the next call.
    pub fn poll(&mut self) -> Duration {
        match self.state {
            WifiState::Connected => {
                if self.platform_is_connected() {
                    return LINK_CHECK_INTERVAL;
                }
                warn!("WiFi: connection lost, entering reconnect");
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.backoff.reset();
                self.backoff.next_delay()
            }
            WifiState::Disconnected => {
                let _ = self.connect();
                self.retry_delay()
            }
            WifiState::Reconnecting { attempt } => {
                info!("WiFi: reconnect attempt {}", attempt + 1);
                if self.platform_connect().is_ok() {
                    self.state = WifiState::Connected;
                    self.backoff.reset();
                    info!("WiFi: reconnected");
                    return LINK_CHECK_INTERVAL;
                }
                self.state = WifiState::Reconnecting { attempt: attempt + 1 };
                self.backoff.next_delay()
            }
        }
    }

    fn retry_delay(&mut self) -> Duration {
        if self.state == WifiState::Connected {
            LINK_CHECK_INTERVAL
        } else {
            self.backoff.next_delay()
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let _ = self.wifi.disconnect();
        self.wifi
            .connect()
            .and_then(|()| self.wifi.wait_netif_up())
            .map_err(|e| {
                warn!("WiFi: connect failed ({})", e);
                ConnectivityError::ConnectionFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if !self.sim.ap_up {
            return Err(ConnectivityError::ConnectionFailed);
        }
        if self.sim.failures_left > 0 {
            self.sim.failures_left -= 1;
            return Err(ConnectivityError::ConnectionFailed);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.ap_up
    }

    /// Simulation: take the AP up or down.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_ap_up(&mut self, up: bool) {
        self.sim.ap_up = up;
    }

    /// Simulation: fail the next `n` association attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn fail_next_connects(&mut self, n: u32) {
        self.sim.failures_left = n;
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn creds() -> WifiCredentials {
        WifiCredentials::new("SafeNet", "password1").unwrap()
    }

    #[test]
    fn rejects_empty_or_unprintable_ssid() {
        assert_eq!(
            WifiCredentials::new("", "password123"),
            Err(ConnectivityError::InvalidSsid)
        );
        assert_eq!(
            WifiCredentials::new("bad\nnet", "password123"),
            Err(ConnectivityError::InvalidSsid)
        );
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(
            WifiCredentials::new("MyNet", "short"),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn accepts_open_network() {
        assert!(WifiCredentials::new("OpenCafe", "").unwrap().is_open());
    }

    #[test]
    fn debug_redacts_password() {
        let text = format!("{:?}", creds());
        assert!(text.contains("SafeNet"));
        assert!(!text.contains("password1"));
    }

    #[test]
    fn backoff_doubles_to_cap() {
        let mut b = Backoff::default();
        let secs: Vec<u64> = (0..7).map(|_| b.next_delay().as_secs()).collect();
        assert_eq!(secs, [2, 4, 8, 16, 32, 60, 60]);
        b.reset();
        assert_eq!(b.next_delay().as_secs(), 2);
    }

    #[test]
    fn connect_then_steady_poll() {
        let mut sta = WifiStation::new(&creds());
        sta.connect().unwrap();
        assert_eq!(sta.state(), WifiState::Connected);
        assert_eq!(sta.poll(), LINK_CHECK_INTERVAL);
    }

    #[test]
    fn lost_ap_backs_off_then_recovers() {
        let mut sta = WifiStation::new(&creds());
        sta.connect().unwrap();

        sta.set_ap_up(false);
        assert_eq!(sta.poll(), Duration::from_secs(2));
        assert_eq!(sta.state(), WifiState::Reconnecting { attempt: 0 });
        assert_eq!(sta.poll(), Duration::from_secs(4));
        assert_eq!(sta.state(), WifiState::Reconnecting { attempt: 1 });

        sta.set_ap_up(true);
        assert_eq!(sta.poll(), LINK_CHECK_INTERVAL);
        assert_eq!(sta.state(), WifiState::Connected);
    }

    #[test]
    fn failed_first_connect_retries_from_poll() {
        let mut sta = WifiStation::new(&creds());
        sta.fail_next_connects(1);
        assert_eq!(sta.connect(), Err(ConnectivityError::ConnectionFailed));
        assert_eq!(sta.poll(), LINK_CHECK_INTERVAL);
        assert_eq!(sta.state(), WifiState::Connected);
    }
}
