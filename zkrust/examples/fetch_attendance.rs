//! Download users and the attendance log

use tracing_subscriber::EnvFilter;
use zkrust::Device;

#[tokio::main]
async fn main() -> zkrust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let mut device = Device::new(addr.parse()?);
    device.connect().await?;

    let info = device.get_device_info().await?;
    println!("✓ Device: {}", info);

    // Keep the keypad idle while the tables stream
    device.disable_device().await?;

    let users = device.get_users().await?;
    println!("✓ {} users", users.len());
    for user in &users {
        println!("  {}", user);
    }

    let records = device.get_recent_attendance(20).await?;
    println!("✓ Last {} punches", records.len());
    for record in &records {
        println!("  {}", record);
    }

    device.enable_device().await?;
    device.disconnect().await?;
    println!("✓ Disconnected");

    Ok(())
}
