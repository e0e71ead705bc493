//! Example: Drive a monitor with simulated readings and print its events.
//!
//! Run with: cargo run -p proximity-core --example simulate

use proximity_core::{
    new_event_callback, InMemoryPowerService, InMemorySensorService, MonitorConfig,
    ProximityMonitor,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter("proximity_core=debug")
        .init();

    println!("=== Proximity Monitor Simulation ===\n");

    let sensors = Arc::new(InMemorySensorService::with_sensor("simulated"));
    let power = Arc::new(InMemoryPowerService::new());
    let monitor = ProximityMonitor::new(MonitorConfig::idle_timeout(1_000), sensors.clone(), power);

    monitor.set_listener(new_event_callback(|event| {
        println!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            serde_json::to_string(&event).unwrap_or_default()
        );
    }));

    let reply = match monitor.query() {
        Ok(reply) => reply,
        Err(e) => {
            println!("query failed: {}", e);
            return;
        }
    };
    println!("initial value: {}", reply.proximity.value());

    // Hand over a reading shortly after start, then wait for the start check
    let feeder = Arc::clone(&sensors);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        feeder.emit(0.0);
    });
    if let Some(check) = reply.start_check {
        match check.wait().await {
            Ok(()) => println!("sensor confirmed"),
            Err(e) => println!("sensor failed: {}", e),
        }
    }
    println!("value after confirmation: {}", monitor.get_proximity().value());

    // Stop reading for longer than the idle timeout; the next event stops the session
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    sensors.emit(3.0);
    println!("state after idle period: {}", monitor.state());

    println!("\nDone.");
}
