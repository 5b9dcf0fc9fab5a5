use chrono::Utc;
use log::{debug, error, info, log_enabled, trace, warn, Level};
use parking_lot::Mutex;
use pcap::{Activated, Capture, Device};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::capture::parser::{header_timestamp, PacketParser};
use crate::flow::FlowTable;
use crate::models::config::AppConfig;
use crate::models::interface::InterfaceInfo;
use crate::models::packet::Packet;
use crate::models::stats::CaptureStats;
use crate::utils::error::{AppError, AppResult};

/// Packets buffered between the capture thread and the flow table
const CHANNEL_CAPACITY: usize = 1024;

/// Read errors in a row before the capture gives up
const MAX_CONSECUTIVE_ERRORS: usize = 5;

/// Drives one capture session into a flow table.
///
/// The pcap handle is read on a blocking thread which sends decoded packets
/// over a channel to a single task owning the [`FlowTable`]. The table is
/// handed back only once both sides have finished.
pub struct CaptureManager {
    /// Application configuration
    config: AppConfig,

    /// Capture statistics, updated by the capture thread
    stats: Arc<Mutex<CaptureStats>>,

    /// Set to end a live capture
    stop: Arc<AtomicBool>,
}

impl CaptureManager {
    /// Create a new capture manager
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            stats: Arc::new(Mutex::new(CaptureStats::default())),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Capture devices known to libpcap, with addresses and MACs from the OS
    pub fn list_devices() -> AppResult<Vec<InterfaceInfo>> {
        let system = pnet_datalink::interfaces();

        let devices = Device::list()?
            .into_iter()
            .map(|device| {
                let mut info = InterfaceInfo::new(device.name.clone()).with_description(device.desc.clone());
                info.ipv4_address = device.addresses.iter().find_map(|address| match address.addr {
                    IpAddr::V4(ipv4) => Some(ipv4.to_string()),
                    IpAddr::V6(_) => None,
                });
                info.is_loopback = device.flags.is_loopback();

                if let Some(iface) = system.iter().find(|iface| iface.name == device.name) {
                    info.mac_address = iface.mac.map(|mac| mac.to_string());
                    if info.ipv4_address.is_none() {
                        info.ipv4_address = iface.ips.iter().find(|ip| ip.is_ipv4()).map(|ip| ip.ip().to_string());
                    }
                }
                info
            })
            .collect::<Vec<_>>();

        debug!("Found {} capture devices", devices.len());
        Ok(devices)
    }

    /// Flag that ends the capture when set, e.g. from a signal handler
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Snapshot of the capture statistics
    pub fn stats(&self) -> CaptureStats {
        self.stats.lock().clone()
    }

    /// Run the capture to completion and return the populated flow table.
    ///
    /// Offline captures end at end of file; live captures end when the stop
    /// flag is set. Both end early once `max_packets` have been ingested.
    pub async fn run(&self) -> AppResult<FlowTable> {
        let capture = self.open()?;

        {
            let mut stats = self.stats.lock();
            *stats = CaptureStats::default();
            stats.start_time = Some(Utc::now());
        }

        let (tx, mut rx) = mpsc::channel::<Packet>(CHANNEL_CAPACITY);

        let consumer = tokio::spawn(async move {
            let mut table = FlowTable::new();
            while let Some(packet) = rx.recv().await {
                table.ingest(&packet);
            }
            table
        });

        let stats = Arc::clone(&self.stats);
        let stop = Arc::clone(&self.stop);
        let max_packets = self.config.max_packets;
        let producer =
            tokio::task::spawn_blocking(move || Self::run_capture(capture, tx, stats, stop, max_packets));

        let captured = producer
            .await
            .map_err(|e| AppError::CaptureError(format!("Capture thread failed: {}", e)))?;
        let table = consumer
            .await
            .map_err(|e| AppError::CaptureError(format!("Flow table task failed: {}", e)))?;

        self.stats.lock().end_time = Some(Utc::now());
        captured?;

        let stats = self.stats();
        info!(
            "Capture finished: {} packets ({} bytes), {} ingested, {} errors, {} flows",
            stats.total_packets,
            stats.total_bytes,
            stats.ingested_packets,
            stats.errors,
            table.len()
        );
        Ok(table)
    }

    /// Open the configured device or file and apply the BPF filter
    fn open(&self) -> AppResult<Capture<dyn Activated>> {
        let mut capture: Capture<dyn Activated> = if self.config.live {
            info!(
                "Opening device {} (promiscuous: {}, snaplen: {}, timeout: {}ms)",
                self.config.device, self.config.promiscuous, self.config.snaplen, self.config.timeout_ms
            );
            Capture::from_device(self.config.device.as_str())?
                .promisc(self.config.promiscuous)
                .snaplen(self.config.snaplen)
                .timeout(self.config.timeout_ms)
                .open()?
                .into()
        } else {
            let path = self
                .config
                .file
                .as_ref()
                .ok_or_else(|| AppError::ConfigError("No capture file given".to_string()))?;
            info!("Reading capture file {}", path.display());
            Capture::from_file(path)?.into()
        };

        if let Some(filter) = &self.config.filter {
            info!("Applying filter: {}", filter);
            match capture.filter(filter, true) {
                Ok(()) => debug!("Filter applied successfully"),
                Err(e) => warn!("Failed to apply filter: {}", e),
            }
        }

        Ok(capture)
    }

    /// Read frames until end of input, stop, or the packet cap
    fn run_capture(
        mut capture: Capture<dyn Activated>,
        tx: mpsc::Sender<Packet>,
        stats: Arc<Mutex<CaptureStats>>,
        stop: Arc<AtomicBool>,
        max_packets: Option<usize>,
    ) -> AppResult<()> {
        let parser = PacketParser::new(capture.get_datalink());
        let mut ingested = 0usize;
        let mut consecutive_errors = 0;

        while !stop.load(Ordering::SeqCst) {
            if max_packets.is_some_and(|max| ingested >= max) {
                info!("Reached packet limit of {}", ingested);
                break;
            }

            let frame = match capture.next_packet() {
                Ok(frame) => {
                    consecutive_errors = 0;
                    frame
                }
                Err(pcap::Error::TimeoutExpired) => {
                    trace!("Packet capture timed out, continuing");
                    continue;
                }
                Err(pcap::Error::NoMorePackets) => {
                    debug!("End of capture file");
                    break;
                }
                Err(e) => {
                    error!("Error capturing packet: {}", e);
                    stats.lock().errors += 1;
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(AppError::CaptureError(format!(
                            "Too many consecutive errors ({}), last: {}",
                            consecutive_errors, e
                        )));
                    }
                    thread::sleep(Duration::from_millis(100));
                    continue;
                }
            };

            {
                let mut stats = stats.lock();
                stats.total_packets += 1;
                stats.total_bytes += frame.data.len();
            }

            let timestamp = header_timestamp(frame.header.ts.tv_sec as i64, frame.header.ts.tv_usec as i64);
            let packet = parser.parse_packet(frame.data, timestamp);

            if log_enabled!(Level::Trace) {
                trace!("Captured {} byte packet at {}", packet.length, packet.timestamp);
            }

            if tx.blocking_send(packet).is_err() {
                warn!("Flow table receiver closed, stopping capture");
                break;
            }
            ingested += 1;
            stats.lock().ingested_packets += 1;
        }

        Ok(())
    }
}
