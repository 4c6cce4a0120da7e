use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use rotor_ctrl::{
    load_calibration, save_calibration, ClientConfig, ControlForces, ControlGate, Direction,
    FlightController, KeyValueStore, YawDirection,
};
use rotor_link::ws::WsTransport;
use rotor_link::{control_url, ControlLink, LinkState, DEFAULT_CONTROL_PORT};
use rotor_proto::CalibrationValues;
use rotor_scan::socket::UdpBeaconSocket;
use rotor_scan::Scanner;

#[derive(Debug, Parser)]
#[command(name = "rotor", version, about = "rotorlink - ground-side quadcopter remote control")]
struct Cli {
    /// Optional TOML config; defaults apply per section when omitted.
    #[arg(long)]
    config: Option<String>,

    /// Calibration persistence file.
    #[arg(long, default_value = "calibration.json")]
    store: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for the vehicle's broadcast beacon and print its address.
    Scan,
    /// Connect and fly from an interactive line console.
    Fly {
        /// Skip discovery and dial this address directly.
        #[arg(long)]
        ip: Option<String>,
    },
    Calib {
        #[command(subcommand)]
        cmd: CalibCmd,
    },
}

#[derive(Debug, Subcommand)]
enum CalibCmd {
    /// Print the stored calibration (defaults when nothing is stored).
    Show,
    /// Reset the stored calibration to defaults.
    Reset,
}

fn load_config(path: Option<&str>) -> Result<ClientConfig> {
    match path {
        Some(p) => {
            let s = std::fs::read_to_string(p).context("read config")?;
            ClientConfig::from_toml_str(&s).context("parse config toml")
        }
        None => Ok(ClientConfig::default()),
    }
}

/// One-file JSON key/value store backing calibration persistence.
struct JsonFileStore {
    path: PathBuf,
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw).ok()?;
        map.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) {
        let mut map: serde_json::Map<String, serde_json::Value> = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        let json = serde_json::Value::Object(map).to_string();
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("store: write {} failed: {}", self.path.display(), e);
        }
    }
}

// Single-threaded runtime: control surfaces and the link actor interleave
// cooperatively, so a stop and a pending timer can never run concurrently.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    let store = JsonFileStore { path: cli.store.clone() };

    match cli.cmd {
        Command::Scan => scan(&cfg).await?,
        Command::Fly { ip } => fly(&cfg, &store, ip).await?,
        Command::Calib { cmd } => calib(&store, cmd)?,
    }
    Ok(())
}

async fn scan(cfg: &ClientConfig) -> Result<()> {
    let socket = UdpBeaconSocket::bind(cfg.scan.port).await?;
    let mut scanner = Scanner::start(socket);
    let beacon = scanner
        .wait_detected()
        .await
        .context("beacon listener stopped before any vehicle was seen")?;
    println!("{} {}", beacon.ip, beacon.mac);
    Ok(())
}

fn calib(store: &JsonFileStore, cmd: CalibCmd) -> Result<()> {
    match cmd {
        CalibCmd::Show => {
            let calib = load_calibration(store);
            println!("{}", serde_json::to_string_pretty(&calib)?);
        }
        CalibCmd::Reset => {
            save_calibration(store, &CalibrationValues::default());
            info!("calibration reset to defaults");
        }
    }
    Ok(())
}

async fn fly(cfg: &ClientConfig, store: &JsonFileStore, ip: Option<String>) -> Result<()> {
    let ip = match ip {
        Some(ip) => ip,
        None => {
            info!("fly: scanning for vehicle on udp/{}", cfg.scan.port);
            let socket = UdpBeaconSocket::bind(cfg.scan.port).await?;
            let mut scanner = Scanner::start(socket);
            scanner
                .wait_detected()
                .await
                .context("beacon listener stopped before any vehicle was seen")?
                .ip
        }
    };

    let url = control_url(&ip, DEFAULT_CONTROL_PORT);
    let link = ControlLink::spawn(WsTransport, cfg.link.clone(), url);
    let handle = link.handle();

    let calibration = load_calibration(store);
    let forces = ControlForces::from(&calibration);
    handle.set_calibration(calibration);

    let mut states = handle.state_watch();
    loop {
        match *states.borrow() {
            LinkState::Connected => break,
            LinkState::Failed => anyhow::bail!("could not reach the vehicle at {}", ip),
            _ => {}
        }
        states.changed().await.context("control link stopped")?;
    }
    info!("fly: connected, console ready (type 'help')");

    let gate = ControlGate::new(handle.clone());
    let mut fc = FlightController::new(gate, forces, &cfg.control);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "help" => print_help(),
            "takeoff" => fc.take_off(),
            "land" => fc.land(),
            "stop" => fc.emergency_stop(),
            "up" => fc.step_throttle_up(),
            "down" => fc.step_throttle_down(),
            "forward" => fc.press_direction(Direction::Forward),
            "back" => fc.press_direction(Direction::Backward),
            "left" => fc.press_direction(Direction::Left),
            "right" => fc.press_direction(Direction::Right),
            "yawl" => fc.press_yaw(YawDirection::Left),
            "yawr" => fc.press_yaw(YawDirection::Right),
            "center" => {
                fc.release_pitch();
                fc.release_roll();
                fc.release_yaw();
            }
            "status" => {
                println!("link: {:?}", handle.state());
                println!("movement: {:?}", fc.movement());
                if let Some(msg) = handle.last_message() {
                    println!("vehicle: {}", msg);
                }
            }
            "reconnect" => handle.reconnect(),
            "quit" => break,
            other => println!("unknown command {:?} (type 'help')", other),
        }
    }

    fc.shutdown();
    handle.close();
    Ok(())
}

fn print_help() {
    println!("takeoff land stop        flight actions (stop = emergency)");
    println!("up down                  throttle step");
    println!("forward back left right  hold a direction");
    println!("yawl yawr center         yaw / release all axes");
    println!("status reconnect quit");
}
