//! NetKeyer entry point.
//!
//! Host: `keyer [local | client <host:port> | server <port>] [--store <path>]`.
//! Keying is shown in the log; console lines are read from stdin.
//!
//! ESP32: role from the memory selector at boot (1 client, 2 server),
//! Wi-Fi credentials and peer baked in at build time.

#[cfg(not(target_os = "espidf"))]
fn main() {
    host::run();
}

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    if let Err(e) = esp::run() {
        println!("keyer stopped: {:?}", e);
    }
}

/// Forward console lines from a helper thread to the loop.
fn spawn_console_reader() -> std::sync::mpsc::Receiver<String> {
    use std::io::BufRead;

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::TryRecvError;
    use std::sync::Arc;

    use rust_net_cw_keyer::config::nvs::FileStore;
    use rust_net_cw_keyer::hal::host::HostBoard;
    use rust_net_cw_keyer::hal::udp::UdpLink;
    use rust_net_cw_keyer::log_drain::{self, StdoutWriter};
    use rust_net_cw_keyer::log_globals::LOG_STREAM;
    use rust_net_cw_keyer::{Node, Role};

    const DEFAULT_STORE: &str = "keyer-settings.bin";
    const USAGE: &str = "usage: keyer [local | client <host:port> | server <port>] [--store <path>]";

    struct Args {
        role: Role,
        target: Option<String>,
        store: String,
    }

    fn parse_args() -> Result<Args, String> {
        let mut args = std::env::args().skip(1);
        let mut role = Role::Disconnected;
        let mut target = None;
        let mut store = DEFAULT_STORE.to_string();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--store" => store = args.next().ok_or("--store needs a path")?,
                "-h" | "--help" => return Err(USAGE.to_string()),
                other => {
                    role = Role::parse(other).ok_or_else(|| format!("unknown role '{}'\n{}", other, USAGE))?;
                    if role != Role::Disconnected {
                        target = Some(args.next().ok_or_else(|| USAGE.to_string())?);
                    }
                }
            }
        }
        Ok(Args { role, target, store })
    }

    fn open_link(role: Role, target: Option<&str>) -> std::io::Result<UdpLink> {
        match (role, target) {
            (Role::Client, Some(addr)) => UdpLink::client(addr),
            (Role::Server, Some(port)) => {
                let port = port
                    .parse()
                    .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad port"))?;
                UdpLink::server(port)
            }
            _ => Ok(UdpLink::none()),
        }
    }

    pub fn run() {
        let args = match parse_args() {
            Ok(args) => args,
            Err(msg) => {
                eprintln!("{}", msg);
                std::process::exit(2);
            }
        };

        let store = match FileStore::open(&args.store) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("cannot open {}: {}", args.store, e);
                std::process::exit(1);
            }
        };

        let (link, link_ready) = match open_link(args.role, args.target.as_deref()) {
            Ok(link) => (link, true),
            Err(e) => {
                eprintln!("network: {}", e);
                (UdpLink::none(), false)
            }
        };
        if let Some(addr) = link.local_addr() {
            println!("listening on {}", addr);
        }

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
            eprintln!("ctrl-c handler: {}", e);
        }

        let mut out = StdoutWriter;
        let mut node = Node::boot(HostBoard::new(link), store, args.role, link_ready);
        log_drain::drain(&LOG_STREAM, &mut out);

        let lines = super::spawn_console_reader();
        let mut pending: Option<String> = None;

        while running.load(Ordering::SeqCst) {
            node.tick();

            if pending.is_none() {
                pending = match lines.try_recv() {
                    Ok(line) => Some(line),
                    Err(TryRecvError::Empty) => None,
                    // stdin closed: keep relaying
                    Err(TryRecvError::Disconnected) => None,
                };
            }
            if let Some(line) = pending.take() {
                if !node.console(&line, &mut out) {
                    pending = Some(line);
                }
            }

            log_drain::drain(&LOG_STREAM, &mut out);
        }

        log_drain::drain(&LOG_STREAM, &mut out);
    }
}

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::mpsc::TryRecvError;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::prelude::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;

    use rust_net_cw_keyer::config::nvs::NvsStore;
    use rust_net_cw_keyer::hal::esp::{EspBoard, EspParts};
    use rust_net_cw_keyer::hal::udp::UdpLink;
    use rust_net_cw_keyer::hal::Contacts;
    use rust_net_cw_keyer::log_drain::{self, StdoutWriter};
    use rust_net_cw_keyer::log_globals::LOG_STREAM;
    use rust_net_cw_keyer::{Node, Role};

    const DEFAULT_PORT: u16 = 7373;

    fn port() -> u16 {
        option_env!("KEYER_PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT)
    }

    #[cfg(not(feature = "esp32p4"))]
    fn connect_wifi(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Option<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>>, EspError> {
        use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

        let (Some(ssid_env), Some(pass)) = (option_env!("KEYER_WIFI_SSID"), option_env!("KEYER_WIFI_PASS")) else {
            println!("no Wi-Fi credentials built in");
            return Ok(None);
        };
        let (Ok(ssid), Ok(password)) = (
            heapless::String::<32>::try_from(ssid_env),
            heapless::String::<64>::try_from(pass),
        ) else {
            println!("Wi-Fi credentials too long");
            return Ok(None);
        };

        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
        let auth_method = if pass.is_empty() { AuthMethod::None } else { AuthMethod::WPA2Personal };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        wifi.connect()?;
        wifi.wait_netif_up()?;
        println!("Wi-Fi up: {:?}", wifi.wifi().sta_netif().get_ip_info()?.ip);
        Ok(Some(wifi))
    }

    fn open_link(role: Role) -> std::io::Result<UdpLink> {
        match role {
            Role::Client => {
                let peer = option_env!("KEYER_PEER").unwrap_or("192.168.4.1");
                UdpLink::client((peer, port()))
            }
            Role::Server => UdpLink::server(port()),
            Role::Disconnected => Ok(UdpLink::none()),
        }
    }

    pub fn run() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let parts = EspParts {
            timer: peripherals.ledc.timer0,
            channel: peripherals.ledc.channel0,
            adc: peripherals.adc1,
            #[cfg(not(feature = "esp32p4"))]
            selector: peripherals.pins.gpio1,
            #[cfg(feature = "esp32p4")]
            selector: peripherals.pins.gpio16,
        };
        let mut board = EspBoard::new(parts, UdpLink::none())?;
        let store = NvsStore::open(nvs.clone())?;

        let role = Role::from_selector(board.selector());

        // Kept alive for the lifetime of the loop
        #[cfg(not(feature = "esp32p4"))]
        let wifi = match role {
            Role::Disconnected => None,
            _ => connect_wifi(peripherals.modem, sysloop, nvs)?,
        };
        #[cfg(not(feature = "esp32p4"))]
        let network_up = wifi.is_some();
        #[cfg(feature = "esp32p4")]
        let network_up = {
            let _ = (sysloop, nvs);
            false
        };

        let link_ready = match (role, network_up) {
            (Role::Disconnected, _) => true,
            (_, false) => false,
            (_, true) => match open_link(role) {
                Ok(link) => {
                    board.set_link(link);
                    true
                }
                Err(e) => {
                    println!("udp: {}", e);
                    false
                }
            },
        };

        let mut out = StdoutWriter;
        let mut node = Node::boot(board, store, role, link_ready);
        log_drain::drain(&LOG_STREAM, &mut out);

        let lines = super::spawn_console_reader();
        let mut pending: Option<String> = None;

        loop {
            node.tick();

            if pending.is_none() {
                pending = match lines.try_recv() {
                    Ok(line) => Some(line),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
                };
            }
            if let Some(line) = pending.take() {
                if !node.console(&line, &mut out) {
                    pending = Some(line);
                }
            }

            log_drain::drain(&LOG_STREAM, &mut out);
        }
    }
}
