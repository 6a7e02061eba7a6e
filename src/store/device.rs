//! Device identity bootstrap.

use rand::distr::Alphanumeric;
use rand::Rng;

use super::KeyValueStore;

/// Store key remembering this device's id
pub const DEVICE_ID_KEY: &str = "afAblation_deviceId";

const DEVICE_ID_RANDOM_LEN: usize = 26;

/// Generate a fresh `device_<random>` id
pub fn generate_device_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(DEVICE_ID_RANDOM_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("device_{}", suffix)
}

/// Return the device id remembered in `store`, creating one on first use.
///
/// When the store cannot be read or written the id is still returned but
/// only lives for this session.
pub fn device_id(store: &dyn KeyValueStore) -> String {
    match store.get(DEVICE_ID_KEY) {
        Ok(Some(id)) if !id.trim().is_empty() => return id.trim().to_string(),
        Ok(_) => {}
        Err(e) => {
            let id = generate_device_id();
            tracing::error!(error = %e, device_id = %id, "Device id unreadable, using session-only id");
            return id;
        }
    }

    let id = generate_device_id();
    if let Err(e) = store.set(DEVICE_ID_KEY, &id) {
        tracing::error!(error = %e, device_id = %id, "Failed to remember device id, using session-only id");
    } else {
        tracing::info!(device_id = %id, "Generated new device id");
    }
    id
}
