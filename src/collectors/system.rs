use super::procfs;
use super::{
    CollectError, CpuReading, DiskUsage, HostInfo, IoCounters, LinkStats, MetricSource, Partition,
};
use crate::snapshot::{
    Address, AddressFamily, Battery, CpuFreq, CpuStats, LoggedInUser, MemoryBlock, MemoryUsage,
    TemperatureReading,
};
use chrono::{Local, NaiveDateTime, TimeZone};
use pnet::datalink;
use pnet::ipnetwork::IpNetwork;
use std::collections::{BTreeMap, HashMap};
#[cfg(target_os = "linux")]
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
#[cfg(not(target_os = "linux"))]
use sysinfo::{NetworkExt, NetworksExt};
use sysinfo::{ComponentExt, CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

/// Live metric source backed by sysinfo, pnet and (on Linux) procfs/sysfs.
pub struct HostSource {
    system: System,
    usage: HashMap<String, DiskUsage>,
}

impl HostSource {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
            usage: HashMap::new(),
        }
    }
}

impl Default for HostSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for HostSource {
    fn prime(&mut self) {
        self.system.refresh_cpu();
        self.system.refresh_networks_list();
    }

    fn cpu(&mut self) -> Result<CpuReading, CollectError> {
        self.system.refresh_cpu();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(CollectError::NoCpus);
        }

        let (times, stats) = cpu_times_and_stats();
        let current_mhz = cpus
            .first()
            .map(|c| c.frequency())
            .filter(|mhz| *mhz > 0)
            .map(|mhz| mhz as f64);

        Ok(CpuReading {
            logical_count: cpus.len(),
            percent: self.system.global_cpu_info().cpu_usage() as f64,
            times,
            stats,
            freq: CpuFreq {
                current_mhz,
                min_mhz: procfs::read_freq_mhz(Path::new(procfs::SYS_CPUFREQ), "cpuinfo_min_freq"),
                max_mhz: procfs::read_freq_mhz(Path::new(procfs::SYS_CPUFREQ), "cpuinfo_max_freq"),
            },
        })
    }

    fn memory(&mut self) -> Result<MemoryBlock, CollectError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectError::MemoryUnavailable);
        }

        let available = self.system.available_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        Ok(MemoryBlock {
            virtual_memory: MemoryUsage {
                total,
                available: Some(available),
                used: self.system.used_memory(),
                free: self.system.free_memory(),
                percent: super::usage_percent(total.saturating_sub(available), total),
            },
            swap_memory: MemoryUsage {
                total: swap_total,
                available: None,
                used: swap_used,
                free: self.system.free_swap(),
                percent: super::usage_percent(swap_used, swap_total),
            },
        })
    }

    fn partitions(&mut self) -> Result<Vec<Partition>, CollectError> {
        #[cfg(target_os = "linux")]
        fs::metadata("/proc/self/mounts").map_err(|source| CollectError::Partitions { source })?;

        self.system.refresh_disks_list();
        let usage = &mut self.usage;
        usage.clear();

        let partitions = self
            .system
            .disks()
            .iter()
            .map(|d| {
                let mountpoint = d.mount_point().to_string_lossy().to_string();
                let total = d.total_space();
                let free = d.available_space();
                usage.insert(
                    mountpoint.clone(),
                    DiskUsage {
                        total,
                        used: total.saturating_sub(free),
                        free,
                    },
                );
                Partition {
                    device: d.name().to_string_lossy().to_string(),
                    mountpoint,
                    fstype: String::from_utf8_lossy(d.file_system()).to_string(),
                }
            })
            .collect();

        Ok(partitions)
    }

    fn disk_usage(&self, partition: &Partition) -> io::Result<DiskUsage> {
        // Removable media can disappear between enumeration and the usage query.
        std::fs::metadata(&partition.mountpoint)?;
        self.usage.get(&partition.mountpoint).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no usage recorded for {}", partition.mountpoint),
            )
        })
    }

    #[cfg(target_os = "linux")]
    fn io_counters(&mut self) -> Result<Vec<IoCounters>, CollectError> {
        procfs::read_net_dev().map_err(|source| CollectError::NetworkCounters { source })
    }

    #[cfg(not(target_os = "linux"))]
    fn io_counters(&mut self) -> Result<Vec<IoCounters>, CollectError> {
        self.system.refresh_networks_list();
        let mut counters: Vec<IoCounters> = self
            .system
            .networks()
            .iter()
            .map(|(name, data)| IoCounters {
                name: name.to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
                errors_in: data.total_errors_on_received(),
                errors_out: data.total_errors_on_transmitted(),
                drops_in: None,
                drops_out: None,
            })
            .collect();
        counters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(counters)
    }

    fn link_stats(&self) -> io::Result<HashMap<String, LinkStats>> {
        Ok(datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let stats = LinkStats {
                    is_up: Some(iface.is_up()),
                    speed_mbps: procfs::read_link_speed(&iface.name),
                };
                (iface.name, stats)
            })
            .collect())
    }

    fn addresses(&self) -> io::Result<HashMap<String, Vec<Address>>> {
        Ok(datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let mut addrs: Vec<Address> = iface.ips.iter().map(address_from_network).collect();
                if let Some(mac) = iface.mac {
                    addrs.push(Address {
                        family: AddressFamily::Link,
                        address: mac.to_string(),
                        netmask: None,
                        broadcast: None,
                    });
                }
                (iface.name, addrs)
            })
            .collect())
    }

    fn temperatures(&mut self) -> Vec<TemperatureReading> {
        self.system.refresh_components_list();
        let mut temps: Vec<TemperatureReading> = self
            .system
            .components()
            .iter()
            .map(|c| TemperatureReading {
                label: c.label().to_string(),
                current_celsius: c.temperature() as f64,
                high_celsius: None,
                critical_celsius: c.critical().map(|v| v as f64),
            })
            .filter(|t| t.current_celsius > 0.0)
            .collect();

        let component_count = temps.len();
        if temps.is_empty() {
            temps = procfs::read_thermal_zones(Path::new(procfs::SYS_THERMAL));
        }
        debug!(
            components = component_count,
            total = temps.len(),
            "temperature readings by source"
        );

        temps
    }

    #[cfg(target_os = "linux")]
    fn battery(&self) -> io::Result<Option<Battery>> {
        procfs::read_battery(Path::new(procfs::SYS_POWER_SUPPLY))
    }

    #[cfg(not(target_os = "linux"))]
    fn battery(&self) -> io::Result<Option<Battery>> {
        Ok(None)
    }

    fn host(&mut self) -> HostInfo {
        HostInfo {
            os_name: self.system.name(),
            os_version: self.system.kernel_version(),
            boot_time: self.system.boot_time(),
        }
    }

    fn users(&self) -> io::Result<Vec<LoggedInUser>> {
        let output = Command::new("who").output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!("who exited with {}", output.status)));
        }
        Ok(parse_who_output(
            &String::from_utf8_lossy(&output.stdout),
            &Local,
        ))
    }
}

#[cfg(target_os = "linux")]
fn cpu_times_and_stats() -> (BTreeMap<String, f64>, CpuStats) {
    match procfs::read_proc_stat() {
        Ok(stat) => (
            stat.times,
            CpuStats {
                ctx_switches: stat.ctx_switches,
                interrupts: stat.interrupts,
                soft_interrupts: stat.soft_interrupts,
                syscalls: None,
            },
        ),
        Err(err) => {
            debug!(error = %err, "could not read /proc/stat");
            (BTreeMap::new(), CpuStats::default())
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn cpu_times_and_stats() -> (BTreeMap<String, f64>, CpuStats) {
    (BTreeMap::new(), CpuStats::default())
}

fn address_from_network(net: &IpNetwork) -> Address {
    match net {
        IpNetwork::V4(v4) => Address {
            family: AddressFamily::Inet,
            address: v4.ip().to_string(),
            netmask: Some(v4.mask().to_string()),
            broadcast: Some(v4.broadcast().to_string()),
        },
        IpNetwork::V6(v6) => Address {
            family: AddressFamily::Inet6,
            address: v6.ip().to_string(),
            netmask: Some(v6.mask().to_string()),
            broadcast: None,
        },
    }
}

/// Parses `who` lines: `name tty YYYY-MM-DD HH:MM [(host)]`.
pub fn parse_who_output<Tz: TimeZone>(text: &str, tz: &Tz) -> Vec<LoggedInUser> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?.to_string();
            let _tty = fields.next()?;
            let date = fields.next();
            let time = fields.next();

            let started = date.zip(time).and_then(|(d, t)| {
                let naive =
                    NaiveDateTime::parse_from_str(&format!("{d} {t}"), "%Y-%m-%d %H:%M").ok()?;
                let local = tz.from_local_datetime(&naive).earliest()?;
                Some(local.timestamp() as f64)
            });
            let host = fields
                .find(|f| f.starts_with('('))
                .map(|f| f.trim_start_matches('(').trim_end_matches(')').to_string())
                .filter(|h| !h.is_empty());

            Some(LoggedInUser {
                name,
                host,
                started,
            })
        })
        .collect()
}
