pub mod procfs;
pub mod system;

#[cfg(test)]
pub mod fake;

use crate::snapshot::{
    Address, Battery, CpuBlock, CpuFreq, CpuStats, DiskEntry, InterfaceEntry, LinkStatus,
    LoggedInUser, MemoryBlock, OtherBlock, SensorBlock, Snapshot, TemperatureReading,
};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SENSORS_UNSUPPORTED_NOTE: &str =
    "No temperature or battery sensors could be read on this platform.";

/// Categories already counted inside `user`/`nice` on Linux.
const NESTED_CPU_CATEGORIES: [&str; 2] = ["guest", "guest_nice"];

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("no CPUs could be enumerated")]
    NoCpus,
    #[error("memory statistics are unavailable")]
    MemoryUnavailable,
    #[error("could not enumerate disk partitions: {source}")]
    Partitions { source: io::Error },
    #[error("could not enumerate network I/O counters: {source}")]
    NetworkCounters { source: io::Error },
}

#[derive(Debug, Clone)]
pub struct CpuReading {
    pub logical_count: usize,
    pub percent: f64,
    pub times: BTreeMap<String, f64>,
    pub stats: CpuStats,
    pub freq: CpuFreq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IoCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub drops_in: Option<u64>,
    pub drops_out: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkStats {
    pub is_up: Option<bool>,
    pub speed_mbps: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostInfo {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub boot_time: u64,
}

/// Raw OS metric queries. Implementations report what the platform exposes and
/// leave joining, ordering and degradation decisions to [`Collector`].
pub trait MetricSource {
    /// Takes the first sample of differential counters (CPU usage, network I/O).
    fn prime(&mut self);
    fn cpu(&mut self) -> Result<CpuReading, CollectError>;
    fn memory(&mut self) -> Result<MemoryBlock, CollectError>;
    fn partitions(&mut self) -> Result<Vec<Partition>, CollectError>;
    fn disk_usage(&self, partition: &Partition) -> io::Result<DiskUsage>;
    fn io_counters(&mut self) -> Result<Vec<IoCounters>, CollectError>;
    fn link_stats(&self) -> io::Result<HashMap<String, LinkStats>>;
    fn addresses(&self) -> io::Result<HashMap<String, Vec<Address>>>;
    fn temperatures(&mut self) -> Vec<TemperatureReading>;
    fn battery(&self) -> io::Result<Option<Battery>>;
    fn host(&mut self) -> HostInfo;
    fn users(&self) -> io::Result<Vec<LoggedInUser>>;
}

/// A non-fatal problem met while building one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub scope: String,
    pub message: String,
}

impl Diagnostic {
    fn new(scope: impl Into<String>, message: impl ToString) -> Self {
        Self {
            scope: scope.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub snapshot: Snapshot,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Collector<S: MetricSource> {
    source: S,
    cpu_baseline: BTreeMap<String, f64>,
    cycles: u64,
}

impl<S: MetricSource> Collector<S> {
    /// Primes the source's differential counters and waits `settle_delay` so the
    /// first real reading has something to compare against.
    pub fn new(mut source: S, settle_delay: Duration) -> Self {
        source.prime();
        let cpu_baseline = match source.cpu() {
            Ok(reading) => reading.times,
            Err(err) => {
                warn!(error = %err, "could not take the initial CPU time sample");
                BTreeMap::new()
            }
        };
        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }
        info!(settle_ms = settle_delay.as_millis() as u64, "collector initialized");

        Self {
            source,
            cpu_baseline,
            cycles: 0,
        }
    }

    pub fn collect(&mut self) -> Result<Snapshot, CollectError> {
        self.collect_with_diagnostics().map(|c| c.snapshot)
    }

    pub fn collect_with_diagnostics(&mut self) -> Result<Collection, CollectError> {
        let mut diagnostics = Vec::new();

        let cpu = self.collect_cpu()?;
        self.fetched("cpu");

        let memory = self.source.memory()?;
        self.fetched("memory");

        let disks = self.collect_disks(&mut diagnostics)?;
        self.fetched("disks");

        let network = self.collect_network(&mut diagnostics)?;
        self.fetched("network");

        let sensors = self.collect_sensors(&mut diagnostics);
        self.fetched("sensors");

        let other = self.collect_other(&mut diagnostics);
        self.fetched("other");

        let snapshot = Snapshot {
            timestamp: now_epoch(),
            cpu,
            memory,
            disks,
            network,
            sensors,
            other,
        };

        if self.cycles == 0 {
            info!(
                disks = snapshot.disks.len(),
                interfaces = snapshot.network.len(),
                degraded = diagnostics.len(),
                "first snapshot collected; further per-section logging at debug level"
            );
        }
        self.cycles += 1;

        Ok(Collection {
            snapshot,
            diagnostics,
        })
    }

    fn fetched(&self, section: &'static str) {
        if self.cycles == 0 {
            info!(section, "fetched system info section");
        } else {
            debug!(section, "fetched system info section");
        }
    }

    fn collect_cpu(&mut self) -> Result<CpuBlock, CollectError> {
        let reading = self.source.cpu()?;
        if reading.logical_count == 0 {
            return Err(CollectError::NoCpus);
        }

        let times_percent = times_percent(&self.cpu_baseline, &reading.times);
        self.cpu_baseline = reading.times.clone();

        Ok(CpuBlock {
            logical_count: reading.logical_count,
            percent: reading.percent,
            times: reading.times,
            times_percent,
            stats: reading.stats,
            freq: reading.freq,
        })
    }

    fn collect_disks(
        &mut self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<DiskEntry>, CollectError> {
        let partitions = self.source.partitions()?;
        let source = &self.source;

        let (disks, failures) = partitions.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut disks, mut failures), p| {
                match source.disk_usage(&p) {
                    Ok(usage) => disks.push(DiskEntry {
                        percent: usage_percent(usage.used, usage.total),
                        device: p.device,
                        mountpoint: p.mountpoint,
                        fstype: p.fstype,
                        total: usage.total,
                        used: usage.used,
                        free: usage.free,
                    }),
                    Err(err) => {
                        warn!(mountpoint = %p.mountpoint, error = %err, "could not get disk usage");
                        failures.push(Diagnostic::new(format!("disk {}", p.mountpoint), err));
                    }
                }
                (disks, failures)
            },
        );

        diagnostics.extend(failures);
        Ok(disks)
    }

    fn collect_network(
        &mut self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<InterfaceEntry>, CollectError> {
        let counters = self.source.io_counters()?;

        let stats = self.source.link_stats().unwrap_or_else(|err| {
            warn!(error = %err, "could not read interface link stats");
            diagnostics.push(Diagnostic::new("network link stats", err));
            HashMap::new()
        });
        let mut addrs = self.source.addresses().unwrap_or_else(|err| {
            warn!(error = %err, "could not read interface addresses");
            diagnostics.push(Diagnostic::new("network addresses", err));
            HashMap::new()
        });

        Ok(join_interfaces(counters, &stats, &mut addrs))
    }

    fn collect_sensors(&mut self, diagnostics: &mut Vec<Diagnostic>) -> SensorBlock {
        let temperatures = self.source.temperatures();
        let battery = self.source.battery().unwrap_or_else(|err| {
            warn!(error = %err, "could not read battery status");
            diagnostics.push(Diagnostic::new("battery", err));
            None
        });

        if temperatures.is_empty() && battery.is_none() {
            if self.cycles == 0 {
                warn!("no sensors reported; sensor section carries a note only");
            }
            return SensorBlock::unsupported(SENSORS_UNSUPPORTED_NOTE);
        }

        SensorBlock::Readings {
            temperatures,
            battery,
        }
    }

    fn collect_other(&mut self, diagnostics: &mut Vec<Diagnostic>) -> OtherBlock {
        let host = self.source.host();
        let users = self.source.users().unwrap_or_else(|err| {
            warn!(error = %err, "could not list logged-in users");
            diagnostics.push(Diagnostic::new("users", err));
            Vec::new()
        });

        OtherBlock {
            os_name: host.os_name,
            os_version: host.os_version,
            boot_time: host.boot_time,
            users,
        }
    }
}

/// I/O counters are the canonical key set; link stats and addresses are looked
/// up by name and default to unknown/empty.
fn join_interfaces(
    counters: Vec<IoCounters>,
    stats: &HashMap<String, LinkStats>,
    addrs: &mut HashMap<String, Vec<Address>>,
) -> Vec<InterfaceEntry> {
    counters
        .into_iter()
        .map(|c| {
            let link = stats.get(&c.name).copied().unwrap_or_default();
            let addresses = addrs.remove(&c.name).unwrap_or_default();
            InterfaceEntry {
                is_up: LinkStatus::from(link.is_up),
                speed_mbps: link.speed_mbps,
                addresses,
                name: c.name,
                bytes_sent: c.bytes_sent,
                bytes_recv: c.bytes_recv,
                packets_sent: c.packets_sent,
                packets_recv: c.packets_recv,
                errors_in: c.errors_in,
                errors_out: c.errors_out,
                drops_in: c.drops_in,
                drops_out: c.drops_out,
            }
        })
        .collect()
}

fn times_percent(
    previous: &BTreeMap<String, f64>,
    current: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let deltas: BTreeMap<&str, f64> = current
        .iter()
        .map(|(k, v)| {
            let prev = previous.get(k).copied().unwrap_or(0.0);
            (k.as_str(), (v - prev).max(0.0))
        })
        .collect();
    let total: f64 = deltas
        .iter()
        .filter(|(k, _)| !NESTED_CPU_CATEGORIES.contains(k))
        .map(|(_, v)| v)
        .sum();

    deltas
        .into_iter()
        .map(|(k, delta)| {
            let pct = if total > 0.0 {
                delta / total * 100.0
            } else {
                0.0
            };
            (k.to_string(), pct)
        })
        .collect()
}

pub fn usage_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(used as f64 / total as f64 * 100.0)
    }
}

pub fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
