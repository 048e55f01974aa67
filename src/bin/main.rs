//! CLI binary for the Groundlink ground station
//!
//! Wires the library to a real serial port: lists candidate ports, runs
//! the bring-up handshake, streams telemetry to stdout (and optionally a
//! session log), and can summarize a previously logged flight.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use groundlink::link::transport::{list_candidate_ports, open_port};
use groundlink::{
    FixQuality, LinkConfig, LinkPhase, SchemaVersion, SessionLogger, TelemetryController,
    TelemetryEvent, TelemetryFrame, TelemetrySink,
};

/// Sink that renders telemetry to the terminal, standing in for the
/// map/plot/3D presentation layer.
struct StdoutSink;

impl TelemetrySink for StdoutSink {
    fn on_phase(&mut self, phase: LinkPhase) {
        eprintln!("[link] {:?}", phase);
    }

    fn on_raw_line(&mut self, line: &str) {
        println!("# {line}");
    }

    fn on_frame(&mut self, frame: &TelemetryFrame, events: &[TelemetryEvent]) {
        let cell = |name: &str| match frame.get(name) {
            Some(v) => format!("{v:.2}"),
            None => "~".to_string(),
        };
        print!(
            "{}\t{}\t{}\t{}\t{}",
            frame.seq,
            cell("t"),
            cell("lat"),
            cell("lon"),
            cell("alt")
        );
        for event in events {
            match event {
                TelemetryEvent::Velocity(v) => print!("\tvel={v:.2}"),
                TelemetryEvent::MaxAltitude(m) => print!("\tmax={m:.2}"),
                TelemetryEvent::DistanceToBase(Some(d)) => print!("\tbase={d:.1}m"),
                TelemetryEvent::ParachuteDeployed { channel, height_m } => {
                    print!("\tP{}@{height_m:.0}m", channel + 1)
                }
                TelemetryEvent::FixQuality(q) => {
                    let label = match q {
                        FixQuality::Good => "good",
                        FixQuality::Fair => "fair",
                        FixQuality::Marginal => "marginal",
                        FixQuality::Poor => "poor",
                    };
                    print!("\tfix={label}")
                }
                _ => {}
            }
        }
        println!();
    }

    fn on_base_location(&mut self, lat: f64, lon: f64) {
        eprintln!("[link] base location {lat:.6}, {lon:.6}");
    }

    fn on_fault(&mut self, cause: &str) {
        eprintln!("[link] FAULT: {cause}");
    }
}

fn main() -> Result<()> {
    let matches = Command::new("Groundlink")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serial telemetry ground station for the URD flight computer.")
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .help("List candidate serial ports (Bluetooth ports filtered out) and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .help("Serial port of the receiver (e.g. /dev/ttyUSB0 or COM7)")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .help("Link baud rate")
                .value_name("BAUD")
                .default_value("115200"),
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .help("Wire layout streamed by the flight computer: quat16 or euler18")
                .value_name("SCHEMA"),
        )
        .arg(
            Arg::new("firmware")
                .long("firmware")
                .help("Flight computer firmware revision; selects the wire layout when --schema is not given")
                .value_name("REV"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .help("Append accepted frames to a tab-separated session log")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("base")
                .long("base")
                .help("Base location for the distance readout, as LAT,LON")
                .value_name("LAT,LON"),
        )
        .arg(
            Arg::new("no-ok-timeout")
                .long("no-ok-timeout")
                .help("Wait for the OK acknowledgment forever (legacy behavior)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Analyze a previously recorded session log and exit")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let default_filter = if matches.get_flag("debug") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(log_path) = matches.get_one::<String>("summary") {
        return print_summary(Path::new(log_path));
    }

    if matches.get_flag("list-ports") {
        let ports = list_candidate_ports()?;
        if ports.is_empty() {
            eprintln!("No candidate serial ports found.");
        }
        for port in ports {
            println!("{port}");
        }
        return Ok(());
    }

    let port_name = matches
        .get_one::<String>("port")
        .ok_or_else(|| anyhow!("--port is required (use --list-ports to enumerate)"))?;
    let baud: u32 = matches
        .get_one::<String>("baud")
        .unwrap()
        .parse()
        .map_err(|_| anyhow!("--baud must be an integer"))?;

    let schema = match matches.get_one::<String>("schema").map(String::as_str) {
        Some("quat16") => SchemaVersion::Quat16,
        Some("euler18") => SchemaVersion::Euler18,
        Some(other) => return Err(anyhow!("unknown schema '{other}'")),
        None => match matches.get_one::<String>("firmware") {
            Some(rev) => groundlink::conversion::schema_for_firmware(rev),
            None => SchemaVersion::Euler18,
        },
    };

    let mut config = LinkConfig {
        baud,
        schema,
        ..LinkConfig::default()
    };
    if matches.get_flag("no-ok-timeout") {
        config.ok_timeout = None;
    }

    let transport = open_port(port_name, config.baud, config.read_timeout)?;
    let mut controller = TelemetryController::new(config.clone());
    controller.add_sink(Box::new(StdoutSink));

    if let Some(base) = matches.get_one::<String>("base") {
        let (lat, lon) = parse_base(base)?;
        controller.set_base(lat, lon);
    }

    if let Some(log_path) = matches.get_one::<String>("log") {
        let schema = groundlink::FrameSchema::new(config.schema);
        controller.set_logger(SessionLogger::create(Path::new(log_path), &schema)?);
        eprintln!("Logging session to {log_path}");
    }

    controller.connect(transport)?;
    eprintln!("Connecting on {port_name} at {baud} baud...");

    loop {
        if let Err(e) = controller.poll() {
            return Err(anyhow!("link lost: {e}"));
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn parse_base(value: &str) -> Result<(f64, f64)> {
    let mut parts = value.splitn(2, ',');
    let lat = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| anyhow!("--base expects LAT,LON"))?;
    let lon = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| anyhow!("--base expects LAT,LON"))?;
    Ok((lat, lon))
}

fn print_summary(path: &Path) -> Result<()> {
    let summary = groundlink::analysis::analyze_session_log(path)?;
    println!("Flight summary for {path:?}");
    println!(
        "  {:<16} {:.1} m at t={:.1} s",
        "Apogee:", summary.apogee_m, summary.apogee_time_s
    );
    println!("  {:<16} {:.1} m/s", "Max climb:", summary.max_climb_velocity_ms);
    print_optional("Liftoff:", summary.liftoff_time_s);
    print_optional("Landing:", summary.landing_time_s);
    print_optional("Flight time:", summary.flight_time_s);
    print_optional("Drogue deploy:", summary.drogue_deploy_time_s);
    print_optional("Main deploy:", summary.main_deploy_time_s);
    print_optional("Drogue descent:", summary.drogue_descent_s);
    print_optional("Main descent:", summary.main_descent_s);
    Ok(())
}

fn print_optional(label: &str, value: Option<f64>) {
    match value {
        Some(v) => println!("  {label:<16} {v:.1} s"),
        None => println!("  {label:<16} unknown"),
    }
}
