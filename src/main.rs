//! ISBN Scan CLI
//!
//! Scans a camera stream (or a synthetic one) for an ISBN barcode, or
//! decodes a single still image.

use clap::{Parser, Subcommand};
use isbn_scan::{
    capture::CameraBackend,
    config::ScanConfig,
    decode::{ean13, DecodeError, SymbolDecoder},
    CancelToken, Frame, FrameConditioner, Isbn, MetricsRegistry, MockCamera, ScanOutcome,
    ScanSession,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "isbn-scan")]
#[command(about = "Read ISBN barcodes from a camera or an image")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the camera until an ISBN is confirmed (Ctrl+C to stop)
    Scan {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use a synthetic camera showing this EAN-13 instead of hardware
        #[arg(long, value_name = "EAN13")]
        mock: Option<String>,

        /// Give up after this many decode attempts
        #[arg(long)]
        max_attempts: Option<u64>,

        /// Print the detection as JSON
        #[arg(long)]
        json: bool,

        /// Serve Prometheus metrics on this port (0 disables)
        #[arg(long)]
        metrics_port: Option<u16>,
    },

    /// List video input devices
    Devices,

    /// Decode a barcode from a still image
    Decode {
        /// Image file (PNG or JPEG)
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            mock,
            max_attempts,
            json,
            metrics_port,
        } => {
            let mut config = match config {
                Some(path) => match ScanConfig::from_file(&path) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("Invalid configuration: {e}");
                        return ExitCode::FAILURE;
                    }
                },
                None => ScanConfig::default(),
            };
            if max_attempts.is_some() {
                config.session.max_attempts = max_attempts;
            }
            if let Some(port) = metrics_port {
                config.output.metrics_port = port;
            }
            config.output.json |= json;
            scan(config, mock)
        }
        Commands::Devices => list_devices(),
        Commands::Decode { image, json } => decode_image(&image, json),
    }
}

fn scan(config: ScanConfig, mock: Option<String>) -> ExitCode {
    info!("ISBN Scan v{}", isbn_scan::VERSION);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    match mock {
        Some(raw) => {
            let Some(code) = mock_code(&raw) else {
                eprintln!("--mock needs a valid EAN-13 with its check digit, got {raw:?}");
                return ExitCode::FAILURE;
            };
            info!("Using mock camera showing {}", code);
            let camera = MockCamera::new()
                .with_resolution(config.camera.ideal_width, config.camera.ideal_height)
                .with_barcode(code);
            runtime.block_on(run_session(camera, config, cancel))
        }
        None => scan_hardware(&runtime, config, cancel),
    }
}

/// Normalizes a `--mock` argument; `None` unless it is a drawable EAN-13.
fn mock_code(raw: &str) -> Option<String> {
    let code = isbn_scan::decode::normalize(raw);
    ean13::is_valid_code(&code).then_some(code)
}

#[cfg(feature = "camera")]
fn scan_hardware(runtime: &tokio::runtime::Runtime, config: ScanConfig, cancel: CancelToken) -> ExitCode {
    runtime.block_on(run_session(
        isbn_scan::capture::NokhwaCamera::new(),
        config,
        cancel,
    ))
}

#[cfg(not(feature = "camera"))]
fn scan_hardware(_runtime: &tokio::runtime::Runtime, _config: ScanConfig, _cancel: CancelToken) -> ExitCode {
    eprintln!("Built without camera support; rebuild with --features camera or pass --mock");
    ExitCode::FAILURE
}

async fn run_session<B: CameraBackend + 'static>(
    backend: B,
    config: ScanConfig,
    cancel: CancelToken,
) -> ExitCode {
    let json = config.output.json;
    let mut session = ScanSession::new(backend, config.clone());

    if config.output.metrics_port != 0 {
        match MetricsRegistry::new() {
            Ok(registry) => {
                let registry = Arc::new(registry);
                serve_metrics(config.output.metrics_port, Arc::clone(&registry));
                session = session.with_metrics(registry);
            }
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    let outcome = session
        .run(
            cancel,
            |isbn| info!(%isbn, "Barcode confirmed"),
            || debug!("Scanner closed"),
        )
        .await;

    match outcome {
        Ok(ScanOutcome::Detected(detection)) => {
            if json {
                match serde_json::to_string(&detection) {
                    Ok(line) => println!("{line}"),
                    Err(e) => {
                        eprintln!("Failed to encode result: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", detection.isbn);
            }
            ExitCode::SUCCESS
        }
        Ok(ScanOutcome::Cancelled) => {
            info!("Scan cancelled");
            ExitCode::from(130)
        }
        Ok(ScanOutcome::Exhausted { attempts }) => {
            eprintln!("No ISBN confirmed after {attempts} attempts");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{}", e.status_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "metrics")]
fn serve_metrics(port: u16, registry: Arc<MetricsRegistry>) {
    use isbn_scan::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(port: u16, _registry: Arc<MetricsRegistry>) {
    warn!(port, "Built without the metrics server; counters are collected but not served");
}

#[cfg(feature = "camera")]
fn list_devices() -> ExitCode {
    let mut backend = isbn_scan::capture::NokhwaCamera::new();
    match backend.enumerate_video_inputs() {
        Ok(devices) if devices.is_empty() => {
            println!("No video inputs found");
            ExitCode::SUCCESS
        }
        Ok(devices) => {
            for device in devices {
                println!("{}\t{}", device.id, device.label);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.status_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "camera"))]
fn list_devices() -> ExitCode {
    eprintln!("Built without camera support; rebuild with --features camera");
    ExitCode::FAILURE
}

fn decode_image(path: &Path, json: bool) -> ExitCode {
    let image = match image::open(path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let (width, height) = image.dimensions();
    let frame = Frame::new(image.into_raw(), width, height, 0);

    let decoders = [
        SymbolDecoder::native(FrameConditioner::default()),
        SymbolDecoder::software(),
    ];
    for mut decoder in decoders {
        match decoder.decode(&frame) {
            Ok(candidate) if candidate.is_valid() => {
                debug!(decoder = ?decoder.kind(), "Decoded still image");
                let Ok(isbn) = Isbn::parse(candidate.value()) else {
                    continue;
                };
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "isbn": isbn,
                            "isbn13": isbn.to_isbn13(),
                            "checksum_ok": isbn.checksum_ok(),
                        })
                    );
                } else {
                    println!("{isbn}");
                }
                return ExitCode::SUCCESS;
            }
            Ok(candidate) => debug!(value = candidate.value(), "Ignoring partial payload"),
            Err(DecodeError::NotFound) => debug!(decoder = ?decoder.kind(), "No barcode found"),
            Err(e) => warn!("Decode failed: {}", e),
        }
    }

    eprintln!("No ISBN barcode found in {}", path.display());
    ExitCode::from(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_code_accepts_hyphenated_ean() {
        assert_eq!(mock_code("978-0-13-110362-7").as_deref(), Some("9780131103627"));
    }

    #[test]
    fn test_mock_code_rejects_undrawable_codes() {
        assert_eq!(mock_code("9780131103628"), None);
        assert_eq!(mock_code("080442957X"), None);
        assert_eq!(mock_code("12345"), None);
    }
}
