use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use packetsentry::analysis::score_flows;
use packetsentry::capture::CaptureManager;
use packetsentry::ml;
use packetsentry::models::config::{AppConfig, DecryptConfig};
use packetsentry::output::{crypto, csv, report};
use packetsentry::utils::logging;

const FEATURES_FILE: &str = "features.csv";
const CLASSIFICATIONS_FILE: &str = "classifications.csv";
const REPORT_FILE: &str = "report.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Flow-level traffic classifier for live or recorded captures")]
struct Args {
    /// Capture from a network device instead of a file
    #[arg(long)]
    live: bool,

    /// Network device for live capture
    #[arg(short, long, default_value = "en0")]
    device: String,

    /// pcap/pcapng file to read
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Snapshot length for live capture
    #[arg(long, default_value_t = 1024)]
    snaplen: i32,

    /// Enable promiscuous mode
    #[arg(short = 'P', long)]
    promiscuous: bool,

    /// Read timeout for live capture, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: i32,

    /// BPF filter expression
    #[arg(long)]
    filter: Option<String>,

    /// Stop after this many packets
    #[arg(long)]
    max_packets: Option<usize>,

    /// List capture devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Directory holding weights.txt, intercept.txt, mean.txt and std.txt
    #[arg(long, default_value = "ml/parameters")]
    model_dir: PathBuf,

    /// Directory for the result files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Also write a JSON report
    #[arg(long)]
    json: bool,

    /// Encrypt the result files with this passphrase
    #[arg(long)]
    encrypt_key: Option<String>,

    /// Decrypt a result file instead of capturing
    #[arg(long)]
    decrypt: bool,

    /// Passphrase for --decrypt
    #[arg(long)]
    decrypt_key: Option<String>,

    /// Encrypted input file for --decrypt
    #[arg(long = "in")]
    input: Option<PathBuf>,

    /// Plaintext output file for --decrypt
    #[arg(long = "out")]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let decrypt = args.decrypt.then(|| DecryptConfig {
            key: args.decrypt_key,
            input: args.input,
            output: args.output,
        });
        Self {
            live: args.live,
            device: args.device,
            file: args.file,
            snaplen: args.snaplen,
            promiscuous: args.promiscuous,
            timeout_ms: args.timeout_ms,
            filter: args.filter,
            max_packets: args.max_packets,
            model_dir: args.model_dir,
            output_dir: args.output_dir,
            json: args.json,
            encrypt_key: args.encrypt_key,
            decrypt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logger(logging::get_log_level(&args.log_level));
    info!("Starting packetsentry v{}", env!("CARGO_PKG_VERSION"));

    if args.list_devices {
        let devices = CaptureManager::list_devices().context("Failed to list capture devices")?;
        println!("Available devices:");
        for device in devices {
            println!("  - {}", device.formatted_display());
        }
        return Ok(());
    }

    let config = AppConfig::from(args);
    config.validate()?;

    if let Some(decrypt) = &config.decrypt {
        return run_decrypt(decrypt);
    }

    let manager = CaptureManager::new(config.clone());
    if config.live {
        let stop = manager.stop_handle();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping capture");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(e) => warn!("Failed to listen for interrupt: {}", e),
            }
        });
        info!("Capturing on {}, press Ctrl-C to stop", config.device);
    }

    let table = manager.run().await.context("Capture failed")?;
    let flows = table.finalize();
    info!("Aggregated {} flows", flows.len());

    let model = ml::load_optional(&config.model_dir)
        .with_context(|| format!("Failed to load model from {}", config.model_dir.display()))?;
    let records = score_flows(flows, model.as_ref());

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let mut written = Vec::new();

    let features_path = config.output_dir.join(FEATURES_FILE);
    csv::write_file(&features_path, &records, csv::write_features)?;
    written.push(features_path);

    if model.is_some() {
        let classifications_path = config.output_dir.join(CLASSIFICATIONS_FILE);
        csv::write_file(&classifications_path, &records, csv::write_classifications)?;
        written.push(classifications_path);
    }

    if config.json {
        let report_path = config.output_dir.join(REPORT_FILE);
        let file = File::create(&report_path)
            .with_context(|| format!("Failed to create {}", report_path.display()))?;
        report::write_json(BufWriter::new(file), &records)?;
        info!("Wrote JSON report to {}", report_path.display());
        written.push(report_path);
    }

    if let Some(key) = &config.encrypt_key {
        for path in &written {
            crypto::encrypt_file(path, key).with_context(|| format!("Failed to encrypt {}", path.display()))?;
        }
    }

    report::print_summary(&records)?;
    Ok(())
}

fn run_decrypt(decrypt: &DecryptConfig) -> Result<()> {
    let (Some(key), Some(input), Some(output)) = (&decrypt.key, &decrypt.input, &decrypt.output) else {
        bail!("decrypt mode requires --decrypt-key, --in, and --out");
    };
    crypto::decrypt_file(input, output, key).with_context(|| format!("Failed to decrypt {}", input.display()))?;
    println!("Decrypted {} -> {}", input.display(), output.display());
    Ok(())
}
