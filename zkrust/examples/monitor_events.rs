//! Print punches and door events as they happen
//!
//! Runs until Ctrl-C.

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use zkrust::{Device, EventFlags, EventKind, EventMonitor};

#[tokio::main]
async fn main() -> zkrust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let config = zkrust::DeviceConfig::default()
        .with_command_timeout(Duration::from_secs(5))
        .with_event_mask(EventFlags::ATTLOG | EventFlags::UNLOCK | EventFlags::ALARM);
    let mut device = Device::with_config(addr.parse()?, config);
    device.connect().await?;

    let monitor = EventMonitor::new();
    monitor.on(EventKind::Attendance, |event| {
        let at = event
            .timestamp
            .map_or_else(|| "unknown time".to_string(), |at| at.to_string());
        println!("Punch: uid={} at {} (state {})", event.uid, at, event.state);
        Ok(())
    });
    monitor.on_any(|event| {
        println!("Event: {} [{}]", event, event.raw_hex());
        Ok(())
    });

    let handle = monitor.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    monitor.run(&mut device, Duration::ZERO).await?;
    device.disconnect().await?;

    Ok(())
}
