//! ts_ingest - receive an MPEG-TS stream over UDP and write it to a file or stdout.
//!
//! This daemon:
//! 1. Loads configuration (file + TS_INGEST_* environment, then command-line overrides)
//! 2. Opens a `VideoIngest` on the configured port
//! 3. Drains buffered units into the output sink, polling when the ring is empty
//! 4. Logs stream-integrity counters periodically
//! 5. Stops on Ctrl-C or when the receiver dies

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ts_ingest::{IngestConfig, VideoIngest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Buffer an MPEG-TS over UDP/RTP stream and report its integrity")]
struct Args {
    /// JSON or TOML configuration file.
    #[arg(long, env = "TS_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port to listen on. Overrides the configuration.
    #[arg(long)]
    port: Option<u16>,

    /// Ring buffer size in bytes, rounded down to whole units.
    #[arg(long)]
    buffer_bytes: Option<usize>,

    /// IPv4 multicast group to join.
    #[arg(long)]
    multicast_group: Option<Ipv4Addr>,

    /// Where to write the stream. "-" writes to stdout.
    #[arg(long, short, default_value = "-")]
    output: String,

    /// Largest span pulled from the ring per read.
    #[arg(long, default_value_t = 64 * 1316)]
    read_size: usize,

    /// Sleep between polls when no data is buffered.
    #[arg(long, default_value_t = 10)]
    poll_interval_ms: u64,

    /// Seconds between counter log lines. 0 disables periodic logging.
    #[arg(long, default_value_t = 5)]
    stats_interval_secs: u64,

    /// Print the final counters as JSON on stdout when writing the stream to a file.
    #[arg(long)]
    stats_json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let ingest = VideoIngest::open_with(config.options()?)?;

    let mut sink = open_sink(&args.output)?;
    let writes_stdout = args.output == "-";

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })
    .context("install Ctrl-C handler")?;

    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let stats_interval = Duration::from_secs(args.stats_interval_secs);
    let mut last_stats_log = Instant::now();
    let mut buf = vec![0u8; args.read_size.max(ingest.layout().unit_size())];
    let mut written = 0u64;

    log::info!("ts_ingest running. writing to {}", args.output);

    while !shutdown.load(Ordering::SeqCst) {
        if !stats_interval.is_zero() && last_stats_log.elapsed() >= stats_interval {
            ingest.log_stats();
            last_stats_log = Instant::now();
        }

        let len = ingest.recv_into(&mut buf);
        if len > 0 {
            sink.write_all(&buf[..len]).context("write stream output")?;
            written += len as u64;
            continue;
        }

        if !ingest.is_running() {
            log::error!("receiver stopped; shutting down");
            break;
        }

        sink.flush().context("flush stream output")?;
        std::thread::sleep(poll_interval);
    }

    sink.flush().context("flush stream output")?;
    let stats = ingest.stats();
    log::info!("wrote {} bytes; final counters: {}", written, stats);
    if args.stats_json {
        if writes_stdout {
            log::warn!("--stats-json ignored while the stream is written to stdout");
        } else {
            println!("{}", stats.to_json()?);
        }
    }
    ingest.close()
}

fn load_config(args: &Args) -> Result<IngestConfig> {
    let mut config = IngestConfig::load_from(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bytes) = args.buffer_bytes {
        config.buffer_bytes = bytes;
    }
    if let Some(group) = args.multicast_group {
        config.multicast_group = Some(group);
    }
    config.validate()?;
    Ok(config)
}

fn open_sink(output: &str) -> Result<Box<dyn Write>> {
    if output == "-" {
        return Ok(Box::new(BufWriter::new(std::io::stdout().lock())));
    }
    if output.trim().is_empty() {
        return Err(anyhow!("output path must not be empty"));
    }
    let file = File::create(output).with_context(|| format!("create output file {}", output))?;
    Ok(Box::new(BufWriter::new(file)))
}
