//! PIN verifier.
//!
//! Holds the authoritative PIN behind a mutex, compares candidates in
//! constant time and persists changes through a [`StoragePort`] before
//! the in-memory copy is touched.

use std::sync::Mutex;

use heapless::String;
use log::{info, warn};

use super::ports::{StorageError, StoragePort};
use crate::error::PinError;

/// Digits in a valid PIN.
pub const PIN_LENGTH: usize = 4;
/// Longest PIN string carried on the wire.
pub const MAX_PIN_LENGTH: usize = 7;

pub type PinCode = String<MAX_PIN_LENGTH>;

/// NVS location of the persisted PIN.
pub const PIN_NAMESPACE: &str = "safe";
pub const PIN_KEY: &str = "pin";

/// Exactly [`PIN_LENGTH`] ASCII digits.
pub fn validate(candidate: &str) -> bool {
    candidate.len() == PIN_LENGTH && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Byte comparison whose running time depends only on the longer operand.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    xor_accumulate(a, b).0 == 0
}

/// Returns the accumulated difference and the number of positions visited.
fn xor_accumulate(a: &[u8], b: &[u8]) -> (u8, usize) {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());
    let mut inspected = 0;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
        inspected += 1;
    }
    (core::hint::black_box(diff), inspected)
}

struct PinSlot<S> {
    current: PinCode,
    storage: S,
}

/// Authoritative PIN plus its backing store.
pub struct PinVerifier<S: StoragePort> {
    slot: Mutex<PinSlot<S>>,
}

impl<S: StoragePort> PinVerifier<S> {
    /// Load the stored PIN, falling back to `default_pin` when none (or an
    /// invalid one) is stored.
    pub fn load(storage: S, default_pin: &str) -> Result<Self, PinError> {
        if !validate(default_pin) {
            return Err(PinError::InvalidFormat);
        }

        let mut buf = [0u8; MAX_PIN_LENGTH];
        let stored = match storage.read(PIN_NAMESPACE, PIN_KEY, &mut buf) {
            Ok(n) => match core::str::from_utf8(&buf[..n]) {
                Ok(s) if validate(s) => Some(to_code(s)?),
                _ => {
                    warn!("PinVerifier: stored PIN malformed, using default");
                    None
                }
            },
            Err(StorageError::NotFound) => {
                info!("PinVerifier: no stored PIN, using default");
                None
            }
            Err(e) => {
                warn!("PinVerifier: PIN read failed ({}), using default", e);
                None
            }
        };

        let current = match stored {
            Some(pin) => {
                info!("PinVerifier: PIN loaded from storage");
                pin
            }
            None => to_code(default_pin)?,
        };

        Ok(Self {
            slot: Mutex::new(PinSlot { current, storage }),
        })
    }

    /// Constant-time comparison against the current PIN.
    pub fn verify(&self, candidate: &str) -> Result<bool, PinError> {
        let current = {
            let slot = self.slot.lock().map_err(|_| PinError::LockPoisoned)?;
            slot.current.clone()
        };
        Ok(constant_time_eq(current.as_bytes(), candidate.as_bytes()))
    }

    /// Validate, persist, then replace the in-memory PIN.  On a storage
    /// failure the old PIN stays active.
    pub fn set(&self, new_pin: &str) -> Result<(), PinError> {
        if !validate(new_pin) {
            warn!("PinVerifier: rejected new PIN (length {})", new_pin.len());
            return Err(PinError::InvalidFormat);
        }
        let code = to_code(new_pin)?;

        let mut slot = self.slot.lock().map_err(|_| PinError::LockPoisoned)?;
        slot.storage
            .write(PIN_NAMESPACE, PIN_KEY, code.as_bytes())
            .map_err(|e| {
                warn!("PinVerifier: persisting PIN failed ({}), keeping old PIN", e);
                PinError::Storage(e)
            })?;
        slot.current = code;
        info!("PinVerifier: PIN updated");
        Ok(())
    }
}

fn to_code(s: &str) -> Result<PinCode, PinError> {
    let mut code = PinCode::new();
    code.push_str(s).map_err(|_| PinError::InvalidFormat)?;
    Ok(code)
}
