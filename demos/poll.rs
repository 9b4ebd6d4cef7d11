//! Find up to four controllers and print every report they send.
//!
//! `RUST_LOG=motelink=debug cargo run --example poll [config.toml]`

#[cfg(all(windows, feature = "hid"))]
fn main() {
    use motelink::backends::windows::WindowsHid;
    use motelink::{Roster, TransportConfig};
    use std::time::Duration;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TransportConfig::load(path).expect("load config"),
        None => TransportConfig::default(),
    };

    let backend = WindowsHid::new().expect("bind hid.dll");
    let mut roster = Roster::new(backend, config);

    let found = roster.find_devices(roster.capacity());
    println!("Tracking {found} controller(s)");
    println!("{}", roster.status_json().expect("encode status"));

    loop {
        for dev in roster.devices_mut() {
            if let Some(report) = dev.read() {
                println!("slot {}: {:02x?}", dev.index() + 1, report);
            }
        }

        if roster.connected_count() < roster.occupied_count() {
            let back = roster.reconnect_all();
            if back > 0 {
                println!("{back} controller(s) reconnected");
            }
        }

        // Idle scan for controllers switched on later.
        if roster.connected_count() == 0 {
            roster.find_devices(roster.capacity());
            std::thread::sleep(Duration::from_millis(500));
        }
    }
}

#[cfg(not(all(windows, feature = "hid")))]
fn main() {
    eprintln!("poll needs the Windows HID backend (feature `hid` on Windows)");
}
