//! Pair (or with `--unpair`, remove) every controller in range.

#[cfg(all(windows, feature = "hid"))]
fn main() {
    use motelink::backends::windows::WindowsBluetooth;
    use motelink::{PairingManager, TransportConfig};

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let unpair = std::env::args().any(|a| a == "--unpair");
    let pairing = PairingManager::new(WindowsBluetooth::new(), &TransportConfig::default());

    match pairing.pair_up(unpair) {
        Ok(n) if unpair => println!("Removed {n} controller(s)"),
        Ok(n) => println!("Paired {n} controller(s)"),
        Err(e) => eprintln!("pair-up failed: {e}"),
    }
}

#[cfg(not(all(windows, feature = "hid")))]
fn main() {
    eprintln!("pair needs the Windows Bluetooth API");
}
