//! Device profiles for serial monitoring
//!
//! Built-in profiles for the boards this tool is usually pointed at. A
//! profile supplies the default baud rate and the name shown when the
//! monitor connects.

pub mod profile;

pub use profile::DeviceProfile;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// ESP32 dev kits (CP210x / CH340 bridges or native USB)
pub static ESP32_PROFILE: Lazy<DeviceProfile> = Lazy::new(|| {
    DeviceProfile::new("esp32", "ESP32")
        .with_description("Espressif ESP32 series (ESP32, ESP32-S2, ESP32-S3, ESP32-C3)")
        .with_usb_vendor_ids(&[
            0x303a, // Espressif
            0x10c4, // Silicon Labs CP210x
            0x1a86, // WCH CH340
        ])
});

pub static STM32_PROFILE: Lazy<DeviceProfile> = Lazy::new(|| {
    DeviceProfile::new("stm32", "STM32")
        .with_description("STM32 ARM Cortex-M microcontrollers")
        .with_usb_vendor_ids(&[
            0x0483, // STMicroelectronics (ST-LINK VCP)
            0x0403, // FTDI
            0x10c4, // Silicon Labs
        ])
});

pub static RPI4_PROFILE: Lazy<DeviceProfile> = Lazy::new(|| {
    DeviceProfile::new("rpi4", "Raspberry Pi 4")
        .with_description("Raspberry Pi 4 Model B (mini UART on GPIO14/15)")
        .with_usb_vendor_ids(&[
            0x0403, // FTDI
            0x10c4, // Silicon Labs CP210x
            0x1a86, // WCH CH340
            0x067b, // Prolific PL2303
        ])
});

pub static GENERIC_PROFILE: Lazy<DeviceProfile> = Lazy::new(|| {
    DeviceProfile::new("generic", "serial device")
        .with_description("Generic serial device with common settings")
});

/// Registry of built-in device profiles, including aliases
pub static DEVICE_PROFILES: Lazy<HashMap<&'static str, &'static DeviceProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("esp32", &*ESP32_PROFILE);
    m.insert("esp32-wroom", &*ESP32_PROFILE);
    m.insert("stm32", &*STM32_PROFILE);
    m.insert("stm32f4", &*STM32_PROFILE);
    m.insert("rpi4", &*RPI4_PROFILE);
    m.insert("raspberry-pi-4", &*RPI4_PROFILE);
    m.insert("generic", &*GENERIC_PROFILE);
    m.insert("default", &*GENERIC_PROFILE);
    m
});

/// Get a device profile by name (case-insensitive)
pub fn get_profile(name: &str) -> Option<&'static DeviceProfile> {
    DEVICE_PROFILES.get(name.to_lowercase().as_str()).copied()
}

/// Canonical profile names (no aliases), sorted
pub fn profile_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = vec!["esp32", "stm32", "rpi4", "generic"];
    names.sort();
    names
}

/// Profiles whose typical adapters use this USB vendor ID
pub fn profiles_for_usb_vendor(vid: u16) -> Vec<&'static DeviceProfile> {
    profile_names()
        .into_iter()
        .filter_map(get_profile)
        .filter(|p| p.matches_usb_vendor(vid))
        .collect()
}
