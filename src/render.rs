//! Terminal rendering of a [`Snapshot`].
//!
//! The layout is a stack of titled sections separated by horizontal rules;
//! per-item data (disks, interfaces, temperatures) is drawn as a box grid.

use crate::collectors::Diagnostic;
use crate::format::{
    format_bytes, format_duration, format_opt, format_percent, format_timestamp, NOT_AVAILABLE,
};
use crate::snapshot::{
    AddressFamily, CpuBlock, InterfaceEntry, LinkStatus, MemoryBlock, MemoryUsage, OtherBlock,
    SensorBlock, Snapshot,
};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};
use std::time::Duration;

pub struct Renderer {
    width: usize,
    clear_screen: bool,
}

impl Renderer {
    pub fn new(width: usize, clear_screen: bool) -> Self {
        Self {
            width,
            clear_screen,
        }
    }

    pub fn render<W: Write>(
        &self,
        snapshot: &Snapshot,
        diagnostics: &[Diagnostic],
        out: &mut W,
    ) -> io::Result<()> {
        if self.clear_screen {
            execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        writeln!(
            out,
            "--- System Monitor - {} ---",
            format_timestamp(Some(snapshot.timestamp))
        )?;
        self.rule(out, '-')?;

        self.render_cpu(&snapshot.cpu, out)?;
        self.render_memory(&snapshot.memory, out)?;
        self.render_disks(snapshot, out)?;
        self.render_network(&snapshot.network, out)?;
        self.render_sensors(&snapshot.sensors, out)?;
        self.render_other(&snapshot.other, snapshot.timestamp, out)?;

        if !diagnostics.is_empty() {
            writeln!(out, "\n## Warnings")?;
            for d in diagnostics {
                writeln!(out, "  - {}: {}", d.scope, d.message)?;
            }
            self.rule(out, '-')?;
        }

        writeln!(out)?;
        self.rule(out, '=')?;
        writeln!(out, "Press Ctrl+C to stop.")?;
        out.flush()
    }

    fn rule<W: Write>(&self, out: &mut W, ch: char) -> io::Result<()> {
        writeln!(out, "{}", ch.to_string().repeat(self.width))
    }

    fn render_cpu<W: Write>(&self, cpu: &CpuBlock, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## CPU Information")?;
        writeln!(out, "  CPU Count (Logical): {}", cpu.logical_count)?;
        writeln!(out, "  Overall Usage: {}", format_percent(Some(cpu.percent)))?;
        writeln!(
            out,
            "  Frequency: {} MHz (min {}, max {})",
            format_mhz(cpu.freq.current_mhz),
            format_mhz(cpu.freq.min_mhz),
            format_mhz(cpu.freq.max_mhz)
        )?;

        if !cpu.times.is_empty() {
            writeln!(out, "  Times (seconds):")?;
            for (key, val) in &cpu.times {
                writeln!(out, "    - {}: {:.2}s", capitalize(key), val)?;
            }
        }
        if !cpu.times_percent.is_empty() {
            writeln!(out, "  Times (%):")?;
            for (key, val) in &cpu.times_percent {
                writeln!(out, "    - {}: {:.1}%", capitalize(key), val)?;
            }
        }

        writeln!(
            out,
            "  Context Switches: {}  Interrupts: {}  Soft Interrupts: {}",
            format_opt(cpu.stats.ctx_switches),
            format_opt(cpu.stats.interrupts),
            format_opt(cpu.stats.soft_interrupts)
        )?;
        self.rule(out, '-')
    }

    fn render_memory<W: Write>(&self, memory: &MemoryBlock, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## Memory Information")?;

        let vm = &memory.virtual_memory;
        writeln!(out, "  Virtual Memory:")?;
        writeln!(out, "    Total:     {}", format_bytes(Some(vm.total)))?;
        writeln!(out, "    Available: {}", format_bytes(vm.available))?;
        writeln!(out, "    Used:      {}", used_with_percent(vm))?;
        writeln!(out, "    Free:      {}", format_bytes(Some(vm.free)))?;

        let swap = &memory.swap_memory;
        writeln!(out, "  Swap Memory:")?;
        writeln!(out, "    Total: {}", format_bytes(Some(swap.total)))?;
        writeln!(out, "    Used:  {}", used_with_percent(swap))?;
        writeln!(out, "    Free:  {}", format_bytes(Some(swap.free)))?;
        self.rule(out, '-')
    }

    fn render_disks<W: Write>(&self, snapshot: &Snapshot, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## Disk Information")?;
        if snapshot.disks.is_empty() {
            writeln!(out, "  No Disk data available.")?;
            return self.rule(out, '-');
        }

        let rows: Vec<Vec<String>> = snapshot
            .disks
            .iter()
            .map(|d| {
                vec![
                    d.device.clone(),
                    d.mountpoint.clone(),
                    d.fstype.clone(),
                    format_bytes(Some(d.total)),
                    format_bytes(Some(d.used)),
                    format_bytes(Some(d.free)),
                    format_percent(d.percent),
                ]
            })
            .collect();
        write_grid(
            out,
            &["Device", "Mount Point", "FS Type", "Total", "Used", "Free", "Usage %"],
            &rows,
        )?;
        self.rule(out, '-')
    }

    fn render_network<W: Write>(&self, network: &[InterfaceEntry], out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## Network Information")?;
        if network.is_empty() {
            writeln!(out, "  No Network data available.")?;
            return self.rule(out, '-');
        }

        let rows: Vec<Vec<String>> = network
            .iter()
            .map(|n| {
                vec![
                    n.name.clone(),
                    link_label(n.is_up).to_string(),
                    n.speed_mbps
                        .map(|s| format!("{s} Mbps"))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                    format_bytes(Some(n.bytes_sent)),
                    format_bytes(Some(n.bytes_recv)),
                    primary_address(n),
                ]
            })
            .collect();
        write_grid(
            out,
            &["Interface", "Status", "Speed", "Sent", "Received", "Address"],
            &rows,
        )?;
        self.rule(out, '-')
    }

    fn render_sensors<W: Write>(&self, sensors: &SensorBlock, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## Sensor Information")?;
        match sensors {
            SensorBlock::Unsupported { note } => writeln!(out, "  Note: {note}")?,
            SensorBlock::Readings {
                temperatures,
                battery,
            } => {
                if !temperatures.is_empty() {
                    writeln!(out, "  Temperatures:")?;
                    let rows: Vec<Vec<String>> = temperatures
                        .iter()
                        .map(|t| {
                            vec![
                                t.label.clone(),
                                format_celsius(Some(t.current_celsius)),
                                format_celsius(t.high_celsius),
                                format_celsius(t.critical_celsius),
                            ]
                        })
                        .collect();
                    write_grid(out, &["Label", "Current", "High", "Critical"], &rows)?;
                }
                if let Some(battery) = battery {
                    writeln!(out, "  Battery:")?;
                    writeln!(out, "    Percent: {}", format_percent(Some(battery.percent)))?;
                    writeln!(
                        out,
                        "    Power Plugged: {}",
                        battery
                            .power_plugged
                            .map(|p| if p { "Yes" } else { "No" })
                            .unwrap_or(NOT_AVAILABLE)
                    )?;
                    writeln!(out, "    Time Left: {}", format_duration(battery.seconds_left))?;
                }
            }
        }
        self.rule(out, '-')
    }

    fn render_other<W: Write>(&self, other: &OtherBlock, now: f64, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n## Other Information")?;
        writeln!(
            out,
            "  OS: {} {}",
            other.os_name.as_deref().unwrap_or(NOT_AVAILABLE),
            other.os_version.as_deref().unwrap_or(NOT_AVAILABLE)
        )?;
        writeln!(
            out,
            "  Boot Time: {}",
            format_timestamp(Some(other.boot_time as f64))
        )?;
        writeln!(out, "  Uptime: {}", format_uptime(other.boot_time, now))?;

        if !other.users.is_empty() {
            writeln!(out, "  Logged-in Users:")?;
            for user in &other.users {
                writeln!(
                    out,
                    "    - {} (Host: {}, Started: {})",
                    user.name,
                    user.host.as_deref().unwrap_or(NOT_AVAILABLE),
                    format_timestamp(user.started)
                )?;
            }
        }
        self.rule(out, '-')
    }
}

fn used_with_percent(usage: &MemoryUsage) -> String {
    format!(
        "{} ({})",
        format_bytes(Some(usage.used)),
        format_percent(usage.percent)
    )
}

fn format_mhz(mhz: Option<f64>) -> String {
    mhz.map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_celsius(celsius: Option<f64>) -> String {
    celsius
        .map(|v| format!("{v:.1}°C"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_uptime(boot_time: u64, now: f64) -> String {
    if boot_time == 0 || now < boot_time as f64 {
        return NOT_AVAILABLE.to_string();
    }
    let secs = (now - boot_time as f64) as u64;
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

fn link_label(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::Up => "Up",
        LinkStatus::Down => "Down",
        LinkStatus::Unknown => NOT_AVAILABLE,
    }
}

/// First IPv4 address, falling back to IPv6.
fn primary_address(entry: &InterfaceEntry) -> String {
    [AddressFamily::Inet, AddressFamily::Inet6]
        .iter()
        .find_map(|family| entry.addresses.iter().find(|a| a.family == *family))
        .map(|a| a.address.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_grid<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    writeln!(out, "{}", grid_border(&widths, ['╒', '═', '╤', '╕']))?;
    writeln!(out, "{}", grid_line(&widths, headers))?;
    writeln!(out, "{}", grid_border(&widths, ['╞', '═', '╪', '╡']))?;
    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(out, "{}", grid_line(&widths, &cells))?;
        if idx + 1 < rows.len() {
            writeln!(out, "{}", grid_border(&widths, ['├', '─', '┼', '┤']))?;
        }
    }
    writeln!(out, "{}", grid_border(&widths, ['╘', '═', '╧', '╛']))
}

/// `[left, fill, junction, right]`
fn grid_border(widths: &[usize], [left, fill, mid, right]: [char; 4]) -> String {
    let segments: Vec<String> = widths
        .iter()
        .map(|w| fill.to_string().repeat(w + 2))
        .collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

fn grid_line(widths: &[usize], cells: &[&str]) -> String {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).copied().unwrap_or("");
            let pad = w.saturating_sub(cell.chars().count());
            format!(" {cell}{} ", " ".repeat(pad))
        })
        .collect();
    format!("│{}│", padded.join("│"))
}
