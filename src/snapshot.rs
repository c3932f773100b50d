use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: f64,
    pub cpu: CpuBlock,
    pub memory: MemoryBlock,
    pub disks: Vec<DiskEntry>,
    pub network: Vec<InterfaceEntry>,
    pub sensors: SensorBlock,
    pub other: OtherBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuBlock {
    pub logical_count: usize,
    pub percent: f64,
    /// Cumulative seconds per time category; key set depends on the platform.
    pub times: BTreeMap<String, f64>,
    /// Same categories as `times`, as a share of elapsed time since the previous reading.
    pub times_percent: BTreeMap<String, f64>,
    pub stats: CpuStats,
    pub freq: CpuFreq,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub ctx_switches: Option<u64>,
    pub interrupts: Option<u64>,
    pub soft_interrupts: Option<u64>,
    pub syscalls: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuFreq {
    pub current_mhz: Option<f64>,
    pub min_mhz: Option<f64>,
    pub max_mhz: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub virtual_memory: MemoryUsage,
    pub swap_memory: MemoryUsage,
}

/// OS-reported figures; `used + free` is not guaranteed to equal `total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: Option<u64>,
    pub used: u64,
    pub free: u64,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskEntry {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub drops_in: Option<u64>,
    pub drops_out: Option<u64>,
    pub is_up: LinkStatus,
    pub speed_mbps: Option<u64>,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Up,
    Down,
    Unknown,
}

impl From<Option<bool>> for LinkStatus {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => LinkStatus::Up,
            Some(false) => LinkStatus::Down,
            None => LinkStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub family: AddressFamily,
    pub address: String,
    pub netmask: Option<String>,
    pub broadcast: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFamily {
    Inet,
    Inet6,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SensorBlock {
    Unsupported {
        note: String,
    },
    Readings {
        temperatures: Vec<TemperatureReading>,
        battery: Option<Battery>,
    },
}

impl SensorBlock {
    pub fn unsupported(note: impl Into<String>) -> Self {
        SensorBlock::Unsupported { note: note.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub label: String,
    pub current_celsius: f64,
    pub high_celsius: Option<f64>,
    pub critical_celsius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub percent: f64,
    pub power_plugged: Option<bool>,
    pub seconds_left: SecondsLeft,
}

/// Remaining battery time. The two sentinels must never be rendered as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondsLeft {
    Seconds(u64),
    Unlimited,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherBlock {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub boot_time: u64,
    pub users: Vec<LoggedInUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedInUser {
    pub name: String,
    pub host: Option<String>,
    pub started: Option<f64>,
}
