//! Parsers for Linux `/proc` and `/sys` files.
//!
//! Parsing is kept separate from reading so every format can be checked
//! against literal file contents on any platform.
#![cfg_attr(not(target_os = "linux"), allow(dead_code))]

use super::IoCounters;
use crate::snapshot::{Battery, SecondsLeft, TemperatureReading};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

pub const PROC_STAT: &str = "/proc/stat";
pub const PROC_NET_DEV: &str = "/proc/net/dev";
pub const SYS_CPUFREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq";
pub const SYS_CLASS_NET: &str = "/sys/class/net";
pub const SYS_THERMAL: &str = "/sys/class/thermal";
pub const SYS_POWER_SUPPLY: &str = "/sys/class/power_supply";

/// Kernel USER_HZ; `/proc/stat` times are in these ticks.
const USER_HZ: f64 = 100.0;

const CPU_CATEGORIES: [&str; 10] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub times: BTreeMap<String, f64>,
    pub ctx_switches: Option<u64>,
    pub interrupts: Option<u64>,
    pub soft_interrupts: Option<u64>,
}

pub fn read_proc_stat() -> io::Result<ProcStat> {
    Ok(parse_proc_stat(&fs::read_to_string(PROC_STAT)?))
}

pub fn parse_proc_stat(text: &str) -> ProcStat {
    let mut out = ProcStat::default();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("cpu ") {
            out.times = rest
                .split_whitespace()
                .zip(CPU_CATEGORIES)
                .filter_map(|(raw, name)| {
                    let ticks = raw.parse::<u64>().ok()?;
                    Some((name.to_string(), ticks as f64 / USER_HZ))
                })
                .collect();
        } else if let Some(rest) = line.strip_prefix("ctxt ") {
            out.ctx_switches = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("intr ") {
            out.interrupts = first_number(rest);
        } else if let Some(rest) = line.strip_prefix("softirq ") {
            out.soft_interrupts = first_number(rest);
        }
    }

    out
}

fn first_number(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}

pub fn read_net_dev() -> io::Result<Vec<IoCounters>> {
    Ok(parse_net_dev(&fs::read_to_string(PROC_NET_DEV)?))
}

/// Interfaces come back in file order.
pub fn parse_net_dev(text: &str) -> Vec<IoCounters> {
    text.lines()
        .filter_map(|line| {
            let (name, fields) = line.split_once(':')?;
            let values: Vec<u64> = fields
                .split_whitespace()
                .map(|v| v.parse::<u64>())
                .collect::<Result<_, _>>()
                .ok()?;
            if values.len() < 16 {
                return None;
            }
            Some(IoCounters {
                name: name.trim().to_string(),
                bytes_recv: values[0],
                packets_recv: values[1],
                errors_in: values[2],
                drops_in: Some(values[3]),
                bytes_sent: values[8],
                packets_sent: values[9],
                errors_out: values[10],
                drops_out: Some(values[11]),
            })
        })
        .collect()
}

/// `cpuinfo_{min,max}_freq` hold kHz.
pub fn read_freq_mhz(root: &Path, file: &str) -> Option<f64> {
    let raw = fs::read_to_string(root.join(file)).ok()?;
    parse_khz_as_mhz(&raw)
}

pub fn parse_khz_as_mhz(raw: &str) -> Option<f64> {
    let khz = raw.trim().parse::<f64>().ok()?;
    (khz > 0.0).then_some(khz / 1000.0)
}

pub fn read_link_speed(name: &str) -> Option<u64> {
    let raw = fs::read_to_string(Path::new(SYS_CLASS_NET).join(name).join("speed")).ok()?;
    parse_link_speed(&raw)
}

/// Virtual and disconnected links report `-1` (or fail to read).
pub fn parse_link_speed(raw: &str) -> Option<u64> {
    let v = raw.trim().parse::<i64>().ok()?;
    (v > 0).then_some(v as u64)
}

pub fn read_thermal_zones(root: &Path) -> Vec<TemperatureReading> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut zones: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|v| v.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"))
        })
        .collect();
    zones.sort();

    let mut out = Vec::new();
    for path in zones {
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        let label = fs::read_to_string(path.join("type"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| name.to_string());
        let Some(celsius) = fs::read_to_string(path.join("temp"))
            .ok()
            .and_then(|raw| parse_millidegrees(&raw))
        else {
            continue;
        };
        if celsius > 0.0 {
            out.push(TemperatureReading {
                label,
                current_celsius: celsius,
                high_celsius: None,
                critical_celsius: None,
            });
        }
    }

    out
}

fn parse_millidegrees(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    Some(if v > 1000.0 { v / 1000.0 } else { v })
}

/// First `BAT*` supply under `root`, if any.
pub fn read_battery(root: &Path) -> io::Result<Option<Battery>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    let mut batteries: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|v| v.to_str())
                .is_some_and(|n| n.starts_with("BAT"))
        })
        .collect();
    batteries.sort();

    let Some(dir) = batteries.first() else {
        return Ok(None);
    };

    let read = |file: &str| fs::read_to_string(dir.join(file)).ok();
    let read_u64 = |file: &str| read(file).and_then(|s| s.trim().parse::<u64>().ok());

    let Some(capacity) = read_u64("capacity") else {
        return Ok(None);
    };
    let status = read("status").unwrap_or_default();
    let energy_now = read_u64("energy_now").or_else(|| read_u64("charge_now"));
    let power_now = read_u64("power_now").or_else(|| read_u64("current_now"));

    Ok(Some(battery_from_fields(
        capacity,
        status.trim(),
        energy_now,
        power_now,
    )))
}

pub fn battery_from_fields(
    capacity: u64,
    status: &str,
    energy_now: Option<u64>,
    power_now: Option<u64>,
) -> Battery {
    let power_plugged = match status {
        "Discharging" => Some(false),
        "Charging" | "Full" | "Not charging" => Some(true),
        _ => None,
    };

    let seconds_left = match (power_plugged, energy_now, power_now) {
        (Some(true), _, _) => SecondsLeft::Unlimited,
        (Some(false), Some(energy), Some(power)) if power > 0 => {
            SecondsLeft::Seconds(energy.saturating_mul(3600) / power)
        }
        _ => SecondsLeft::Unknown,
    };

    Battery {
        percent: capacity as f64,
        power_plugged,
        seconds_left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0
intr 1462898 0 9 0 0 0
ctxt 2718392
btime 1700000000
processes 30022
softirq 94751 0 12345 3 0
";

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     100    0    0    0     0          0         0   123456     100    0    0    0     0       0          0
  eth0:98765432   54321    2    7    0     0          0        10 12345678   43210    1    3    0     0       0          0
wlan0:0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";

    #[test]
    fn proc_stat_times_are_seconds_in_order() {
        let stat = parse_proc_stat(STAT);
        assert_eq!(stat.times.len(), 10);
        assert_eq!(stat.times["user"], 101321.53);
        assert_eq!(stat.times["idle"], 468284.83);
        assert_eq!(stat.times["guest"], 1756.28);
        assert_eq!(stat.ctx_switches, Some(2718392));
        assert_eq!(stat.interrupts, Some(1462898));
        assert_eq!(stat.soft_interrupts, Some(94751));
    }

    #[test]
    fn proc_stat_short_cpu_line_keeps_known_categories() {
        let stat = parse_proc_stat("cpu 100 0 50 850\n");
        let keys: Vec<&str> = stat.times.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["idle", "nice", "system", "user"]);
        assert_eq!(stat.ctx_switches, None);
    }

    #[test]
    fn net_dev_keeps_file_order_and_drops() {
        let counters = parse_net_dev(NET_DEV);
        let names: Vec<&str> = counters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["lo", "eth0", "wlan0"]);

        let eth0 = &counters[1];
        assert_eq!(eth0.bytes_recv, 98765432);
        assert_eq!(eth0.packets_recv, 54321);
        assert_eq!(eth0.errors_in, 2);
        assert_eq!(eth0.drops_in, Some(7));
        assert_eq!(eth0.bytes_sent, 12345678);
        assert_eq!(eth0.packets_sent, 43210);
        assert_eq!(eth0.errors_out, 1);
        assert_eq!(eth0.drops_out, Some(3));
    }

    #[test]
    fn link_speed_rejects_unknown() {
        assert_eq!(parse_link_speed("1000\n"), Some(1000));
        assert_eq!(parse_link_speed("-1\n"), None);
        assert_eq!(parse_link_speed("0"), None);
        assert_eq!(parse_link_speed(""), None);
    }

    #[test]
    fn khz_converts_to_mhz() {
        assert_eq!(parse_khz_as_mhz("3400000\n"), Some(3400.0));
        assert_eq!(parse_khz_as_mhz("garbage"), None);
    }

    #[test]
    fn battery_sentinels_follow_status() {
        let charging = battery_from_fields(55, "Charging", Some(30_000_000), Some(10_000_000));
        assert_eq!(charging.power_plugged, Some(true));
        assert_eq!(charging.seconds_left, SecondsLeft::Unlimited);

        let draining = battery_from_fields(40, "Discharging", Some(20_000_000), Some(10_000_000));
        assert_eq!(draining.power_plugged, Some(false));
        assert_eq!(draining.seconds_left, SecondsLeft::Seconds(7200));

        let idle = battery_from_fields(40, "Discharging", Some(20_000_000), Some(0));
        assert_eq!(idle.seconds_left, SecondsLeft::Unknown);

        let odd = battery_from_fields(90, "Unknown", None, None);
        assert_eq!(odd.power_plugged, None);
        assert_eq!(odd.seconds_left, SecondsLeft::Unknown);
    }

    #[test]
    fn battery_and_thermal_dirs_are_read() {
        let dir = tempfile::tempdir().expect("tempdir");

        let bat = dir.path().join("power_supply/BAT0");
        fs::create_dir_all(&bat).expect("bat dir");
        fs::write(bat.join("capacity"), "77\n").expect("capacity");
        fs::write(bat.join("status"), "Full\n").expect("status");
        fs::create_dir_all(dir.path().join("power_supply/AC")).expect("ac dir");

        let battery = read_battery(&dir.path().join("power_supply"))
            .expect("readable")
            .expect("battery present");
        assert_eq!(battery.percent, 77.0);
        assert_eq!(battery.seconds_left, SecondsLeft::Unlimited);

        let zone = dir.path().join("thermal/thermal_zone0");
        fs::create_dir_all(&zone).expect("zone dir");
        fs::write(zone.join("type"), "x86_pkg_temp\n").expect("type");
        fs::write(zone.join("temp"), "45500\n").expect("temp");
        fs::create_dir_all(dir.path().join("thermal/cooling_device0")).expect("cooling dir");

        let temps = read_thermal_zones(&dir.path().join("thermal"));
        assert_eq!(temps.len(), 1);
        assert_eq!(temps[0].label, "x86_pkg_temp");
        assert_eq!(temps[0].current_celsius, 45.5);
    }

    #[test]
    fn missing_power_supply_dir_means_no_battery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let battery = read_battery(&dir.path().join("absent")).expect("not an error");
        assert!(battery.is_none());
    }
}
