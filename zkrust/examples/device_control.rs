//! Device control example
//!
//! Shows a message, locks the keypad briefly and pulses the door relay.

use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use zkrust::{Device, DeviceConfig};

#[tokio::main]
async fn main() -> zkrust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let config = DeviceConfig::default().with_command_timeout(Duration::from_secs(5));
    let mut device = Device::with_config(addr.parse()?, config);
    device.connect().await?;

    println!("Device connected!");
    println!("Clock: {}", device.get_time().await?);

    // Disable device (show "Working...")
    println!("Disabling device...");
    device.disable_device().await?;
    device.display_message("Maintenance", 1).await?;
    sleep(Duration::from_secs(3)).await;

    // Enable device (resume normal operation)
    println!("Enabling device...");
    device.clear_lcd().await?;
    device.enable_device().await?;

    println!("Opening door 1...");
    device.open_door(1).await?;
    println!("Door: {}", device.get_door_status(1).await?);

    device.sync_time().await?;
    device.test_voice().await?;

    println!("Done!");

    device.disconnect().await?;

    Ok(())
}
