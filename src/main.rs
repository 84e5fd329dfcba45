//! RCLink firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = run() {
        // A half-initialized manager must not keep running; restart and
        // try again from persisted state.
        log::error!("fatal startup fault: {}", err);
        esp_idf_hal::reset::restart();
    }
}

#[cfg(feature = "esp32")]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use std::time::Duration;

    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;

    use rclink_esp32::adapter::EspNetAdapter;
    use rclink_esp32::events::EventDispatcher;
    use rclink_esp32::manager::ConnectivityManager;
    use rclink_esp32::store::NvsStore;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    let dispatcher = Arc::new(EventDispatcher::new());
    let store = NvsStore::new()?;
    let adapter = EspNetAdapter::new(peripherals.modem, sysloop, Arc::clone(&dispatcher))?;

    let manager = ConnectivityManager::new(Box::new(store), Box::new(adapter), &dispatcher)?;
    log::info!(
        "connectivity manager up in {} mode, ssid {}",
        manager.mode(),
        manager.ssid()
    );

    loop {
        if manager.reboot_pending() {
            log::warn!("rebooting into access-point fallback");
            manager.shutdown();
            esp_idf_hal::reset::restart();
        }
        std::thread::sleep(Duration::from_millis(250));
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use std::sync::Arc;

    use rclink_esp32::adapter::HostAdapter;
    use rclink_esp32::events::EventDispatcher;
    use rclink_esp32::manager::ConnectivityManager;
    use rclink_esp32::store::MemoryStore;

    env_logger::init();

    // No radio on the host; bring the manager up against the stand-in
    // adapter to show the configured state, then exit.
    let dispatcher = Arc::new(EventDispatcher::new());
    let manager = match ConnectivityManager::new(
        Box::new(MemoryStore::new()),
        Box::new(HostAdapter::new()),
        &dispatcher,
    ) {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("failed to start connectivity manager: {}", err);
            std::process::exit(1);
        }
    };

    println!(
        "connectivity manager up in {} mode, ssid {}",
        manager.mode(),
        manager.ssid()
    );
    println!("This binary drives real hardware only with the 'esp32' feature.");
    println!("Use 'cargo test' for the host test suite.");
}
