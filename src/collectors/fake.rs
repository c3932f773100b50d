use super::{
    CollectError, CpuReading, DiskUsage, HostInfo, IoCounters, LinkStats, MetricSource, Partition,
};
use crate::snapshot::{
    Address, AddressFamily, Battery, CpuFreq, CpuStats, LoggedInUser, MemoryBlock, MemoryUsage,
    TemperatureReading,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;

/// Scripted metric source for collector and session tests.
///
/// CPU samples are popped one per `cpu()` call; the last one repeats once the
/// script runs out. Network counters grow by their step on every call.
pub struct FakeSource {
    logical_count: usize,
    cpu_percents: VecDeque<f64>,
    cpu_times: VecDeque<BTreeMap<String, f64>>,
    last_percent: f64,
    last_times: BTreeMap<String, f64>,
    partitions: Vec<(Partition, DiskUsage)>,
    failing_mounts: HashSet<String>,
    partitions_fail: bool,
    interfaces: Vec<(String, u64)>,
    counter_calls: u64,
    counters_fail: bool,
    links: HashMap<String, LinkStats>,
    links_fail: bool,
    addresses: HashMap<String, Vec<Address>>,
    addresses_fail: bool,
    temperatures: Vec<TemperatureReading>,
    battery: Option<Battery>,
    battery_fail: bool,
    users: Vec<LoggedInUser>,
    users_fail: bool,
    prime_calls: usize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            logical_count: 4,
            cpu_percents: VecDeque::new(),
            cpu_times: VecDeque::new(),
            last_percent: 0.0,
            last_times: BTreeMap::new(),
            partitions: Vec::new(),
            failing_mounts: HashSet::new(),
            partitions_fail: false,
            interfaces: Vec::new(),
            counter_calls: 0,
            counters_fail: false,
            links: HashMap::new(),
            links_fail: false,
            addresses: HashMap::new(),
            addresses_fail: false,
            temperatures: Vec::new(),
            battery: None,
            battery_fail: false,
            users: vec![LoggedInUser {
                name: "alice".to_string(),
                host: Some("10.0.0.2".to_string()),
                started: Some(1_700_000_100.0),
            }],
            users_fail: false,
            prime_calls: 0,
        }
    }

    pub fn with_logical_count(mut self, count: usize) -> Self {
        self.logical_count = count;
        self
    }

    pub fn with_cpu_percents(mut self, percents: Vec<f64>) -> Self {
        self.cpu_percents = percents.into();
        self
    }

    pub fn with_cpu_times<const N: usize>(mut self, samples: Vec<[(&str, f64); N]>) -> Self {
        self.cpu_times = samples
            .into_iter()
            .map(|sample| {
                sample
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        self
    }

    pub fn with_partition(mut self, device: &str, mount: &str, total: u64, used: u64) -> Self {
        self.partitions.push((
            Partition {
                device: device.to_string(),
                mountpoint: mount.to_string(),
                fstype: "ext4".to_string(),
            },
            DiskUsage {
                total,
                used,
                free: total.saturating_sub(used),
            },
        ));
        self
    }

    pub fn failing_mount(mut self, mount: &str) -> Self {
        self.failing_mounts.insert(mount.to_string());
        self
    }

    pub fn failing_partitions(mut self) -> Self {
        self.partitions_fail = true;
        self
    }

    /// `step` bytes are added to both directions on every counter read.
    pub fn with_interface(mut self, name: &str, step: u64) -> Self {
        self.interfaces.push((name.to_string(), step));
        self
    }

    pub fn failing_counters(mut self) -> Self {
        self.counters_fail = true;
        self
    }

    pub fn with_link(mut self, name: &str, up: bool, speed: Option<u64>) -> Self {
        self.links.insert(
            name.to_string(),
            LinkStats {
                is_up: Some(up),
                speed_mbps: speed,
            },
        );
        self
    }

    pub fn failing_link_stats(mut self) -> Self {
        self.links_fail = true;
        self
    }

    pub fn with_address(mut self, name: &str, ip: &str) -> Self {
        self.addresses
            .entry(name.to_string())
            .or_default()
            .push(Address {
                family: AddressFamily::Inet,
                address: ip.to_string(),
                netmask: Some("255.255.255.0".to_string()),
                broadcast: None,
            });
        self
    }

    pub fn failing_addresses(mut self) -> Self {
        self.addresses_fail = true;
        self
    }

    pub fn with_battery(mut self, battery: Battery) -> Self {
        self.battery = Some(battery);
        self
    }

    pub fn failing_battery(mut self) -> Self {
        self.battery_fail = true;
        self
    }

    pub fn with_temperature(mut self, label: &str, celsius: f64) -> Self {
        self.temperatures.push(TemperatureReading {
            label: label.to_string(),
            current_celsius: celsius,
            high_celsius: None,
            critical_celsius: Some(100.0),
        });
        self
    }

    pub fn failing_users(mut self) -> Self {
        self.users_fail = true;
        self
    }

    pub fn prime_calls(&self) -> usize {
        self.prime_calls
    }
}

impl MetricSource for FakeSource {
    fn prime(&mut self) {
        self.prime_calls += 1;
    }

    fn cpu(&mut self) -> Result<CpuReading, CollectError> {
        if let Some(p) = self.cpu_percents.pop_front() {
            self.last_percent = p;
        }
        if let Some(t) = self.cpu_times.pop_front() {
            self.last_times = t;
        }
        Ok(CpuReading {
            logical_count: self.logical_count,
            percent: self.last_percent,
            times: self.last_times.clone(),
            stats: CpuStats {
                ctx_switches: Some(1_000),
                interrupts: Some(500),
                soft_interrupts: None,
                syscalls: None,
            },
            freq: CpuFreq {
                current_mhz: Some(2400.0),
                min_mhz: None,
                max_mhz: None,
            },
        })
    }

    fn memory(&mut self) -> Result<MemoryBlock, CollectError> {
        Ok(MemoryBlock {
            virtual_memory: MemoryUsage {
                total: 8 * 1024 * 1024 * 1024,
                available: Some(4 * 1024 * 1024 * 1024),
                used: 3 * 1024 * 1024 * 1024,
                free: 1024 * 1024 * 1024,
                percent: Some(50.0),
            },
            swap_memory: MemoryUsage {
                total: 0,
                available: None,
                used: 0,
                free: 0,
                percent: None,
            },
        })
    }

    fn partitions(&mut self) -> Result<Vec<Partition>, CollectError> {
        if self.partitions_fail {
            return Err(CollectError::Partitions {
                source: io::Error::new(io::ErrorKind::PermissionDenied, "mount table unreadable"),
            });
        }
        Ok(self.partitions.iter().map(|(p, _)| p.clone()).collect())
    }

    fn disk_usage(&self, partition: &Partition) -> io::Result<DiskUsage> {
        if self.failing_mounts.contains(&partition.mountpoint) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} was ejected", partition.mountpoint),
            ));
        }
        self.partitions
            .iter()
            .find(|(p, _)| p.mountpoint == partition.mountpoint)
            .map(|(_, usage)| *usage)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown mount"))
    }

    fn io_counters(&mut self) -> Result<Vec<IoCounters>, CollectError> {
        if self.counters_fail {
            return Err(CollectError::NetworkCounters {
                source: io::Error::new(io::ErrorKind::NotFound, "no counters"),
            });
        }
        self.counter_calls += 1;
        let calls = self.counter_calls;
        Ok(self
            .interfaces
            .iter()
            .map(|(name, step)| IoCounters {
                name: name.clone(),
                bytes_sent: step * calls,
                bytes_recv: step * calls * 2,
                packets_sent: calls,
                packets_recv: calls * 2,
                errors_in: 0,
                errors_out: 0,
                drops_in: Some(0),
                drops_out: None,
            })
            .collect())
    }

    fn link_stats(&self) -> io::Result<HashMap<String, LinkStats>> {
        if self.links_fail {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "no link stats"));
        }
        Ok(self.links.clone())
    }

    fn addresses(&self) -> io::Result<HashMap<String, Vec<Address>>> {
        if self.addresses_fail {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "no address table"));
        }
        Ok(self.addresses.clone())
    }

    fn temperatures(&mut self) -> Vec<TemperatureReading> {
        self.temperatures.clone()
    }

    fn battery(&self) -> io::Result<Option<Battery>> {
        if self.battery_fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "power_supply unreadable"));
        }
        Ok(self.battery.clone())
    }

    fn host(&mut self) -> HostInfo {
        HostInfo {
            os_name: Some("Linux".to_string()),
            os_version: Some("6.1.0".to_string()),
            boot_time: 1_700_000_000,
        }
    }

    fn users(&self) -> io::Result<Vec<LoggedInUser>> {
        if self.users_fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "who not found"));
        }
        Ok(self.users.clone())
    }
}
