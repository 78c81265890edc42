// Plain-text rendering of API records: stat boxes, bar charts and tables.
// Everything here returns a `String` so the UI decides where it goes and
// what colour it gets. Widths are counted in chars.

use crate::models::{Dashboard, HourlyMetric, Node, NodeMetricRank};
use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

pub const RANK_PAGE_SIZE: usize = 10;
const BOX_WIDTH: usize = 24;
const CHART_HEIGHT: usize = 10;

pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.2} {}B", bytes as f64 / div as f64, unit)
}

/// `mbps` is in megabits per second.
pub fn format_bandwidth(mbps: f64) -> String {
    if mbps < 1000.0 {
        format!("{:.2} Mbps", mbps)
    } else {
        format!("{:.2} Gbps", mbps / 1000.0)
    }
}

pub fn pad(s: &str, width: usize, align_left: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.chars().take(width).collect();
    }
    let padding = " ".repeat(width - len);
    if align_left {
        format!("{}{}", s, padding)
    } else {
        format!("{}{}", padding, s)
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

pub fn format_time(t: Option<DateTime<Utc>>) -> String {
    match t {
        Some(t) if t.timestamp() > 0 => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => "-".to_string(),
    }
}

/// A row of boxed `title / value` cards.
pub fn stat_boxes(cards: &[(&str, String)]) -> String {
    let border = "─".repeat(BOX_WIDTH);
    let row = |open: &str, close: &str| -> String {
        cards
            .iter()
            .map(|_| format!("{}{}{}", open, border, close))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let cells = |f: &dyn Fn(&(&str, String)) -> String| -> String {
        cards
            .iter()
            .map(|c| format!("│ {} │", f(c)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", row("┌", "┐"));
    let _ = writeln!(out, "{}", cells(&|c| pad(c.0, BOX_WIDTH - 2, true)));
    let _ = writeln!(out, "{}", cells(&|c| pad(&c.1, BOX_WIDTH - 2, false)));
    let _ = writeln!(out, "{}", row("└", "┘"));
    out
}

/// Vertical bar chart, oldest hour on the left. `hourly` is in API order
/// (newest first). The y axis is scaled to the largest value.
pub fn bar_chart(hourly: &[HourlyMetric], value: impl Fn(&HourlyMetric) -> f64) -> String {
    let points: Vec<&HourlyMetric> = hourly.iter().rev().collect();
    let values: Vec<f64> = points.iter().map(|h| value(*h)).collect();
    let max_y = values.iter().cloned().fold(0.0_f64, f64::max);
    let max_y = if max_y > 0.0 { max_y } else { 1.0 };

    let heights: Vec<usize> = values
        .iter()
        .map(|v| {
            let y = ((v / max_y) * (CHART_HEIGHT - 1) as f64).max(0.0) as usize;
            y.min(CHART_HEIGHT - 1)
        })
        .collect();

    let mut out = String::new();
    for row in 0..CHART_HEIGHT {
        let level = CHART_HEIGHT - 1 - row;
        let label = max_y * (CHART_HEIGHT - row) as f64 / CHART_HEIGHT as f64;
        let _ = write!(out, "{:>8.1}┤", label);
        for h in &heights {
            out.push(if *h >= level { '█' } else { ' ' });
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{}└{}", " ".repeat(8), "─".repeat(points.len()));

    let mut axis = " ".repeat(9);
    for (i, point) in points.iter().enumerate().step_by(6) {
        let tick = format!("{}h", point.hour);
        let target = 9 + i;
        let current = axis.chars().count();
        if current < target {
            axis.push_str(&" ".repeat(target - current));
        }
        axis.push_str(&tick);
    }
    out.push_str(axis.trim_end());
    out.push('\n');
    out
}

/// Detail table for the trailing `hours` entries, kept in API order.
pub fn hourly_table(hourly: &[HourlyMetric], hours: usize) -> String {
    let recent = &hourly[hourly.len().saturating_sub(hours)..];

    let mut out = String::new();
    let _ = writeln!(out, "┌──────┬──────────┬──────────────┬──────────────┬──────────────┐");
    let _ = writeln!(
        out,
        "│ {} │ {} │ {} │ {} │ {} │",
        pad("Hour", 4, true),
        pad("Nodes", 8, true),
        pad("Traffic", 12, true),
        pad("Hits", 12, true),
        pad("Bandwidth", 12, true)
    );
    let _ = writeln!(out, "├──────┼──────────┼──────────────┼──────────────┼──────────────┤");
    for h in recent {
        let _ = writeln!(
            out,
            "│ {} │ {} │ {} │ {} │ {} │",
            pad(&format!("{:02}h", h.hour), 4, true),
            pad(&h.nodes.to_string(), 8, false),
            pad(&format_bytes(h.bytes), 12, false),
            pad(&h.hits.to_string(), 12, false),
            pad(&format_bandwidth(h.bandwidth), 12, false)
        );
    }
    let _ = writeln!(out, "└──────┴──────────┴──────────────┴──────────────┴──────────────┘");
    out
}

pub fn dashboard(d: &Dashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Key metrics");
    out.push_str(&stat_boxes(&[
        ("Nodes online", format!("{}", d.current_nodes)),
        ("Current bandwidth", format_bandwidth(d.current_bandwidth)),
        ("Load", format!("{:.2}%", d.load * 100.0)),
    ]));
    let _ = writeln!(out, "\nToday");
    out.push_str(&stat_boxes(&[
        ("Traffic", format_bytes(d.bytes)),
        ("Hits", format!("{}", d.hits)),
        ("Bandwidth cap", format_bandwidth(d.bandwidth)),
    ]));

    if d.hourly.is_empty() {
        return out;
    }

    let charts: [(&str, Box<dyn Fn(&HourlyMetric) -> f64>); 4] = [
        ("Nodes online per hour", Box::new(|h: &HourlyMetric| h.nodes as f64)),
        ("Average bandwidth per hour (Gbps)", Box::new(|h: &HourlyMetric| h.bandwidth / 1000.0)),
        (
            "Traffic per hour (TB)",
            Box::new(|h: &HourlyMetric| h.bytes as f64 / 1024f64.powi(4)),
        ),
        ("Hits per hour (x10k)", Box::new(|h: &HourlyMetric| h.hits as f64 / 10_000.0)),
    ];
    for (title, value) in charts.iter() {
        let _ = writeln!(out, "\n{}", title);
        out.push_str(&bar_chart(&d.hourly, value));
    }

    let _ = writeln!(out, "\nLast 6 hours");
    out.push_str(&hourly_table(&d.hourly, 6));
    out
}

pub fn node_status(enabled: bool, down_reason: Option<&str>) -> String {
    match (enabled, down_reason) {
        (true, _) => "online".to_string(),
        (false, Some(reason)) if !reason.is_empty() => format!("offline ({})", reason),
        (false, _) => "offline".to_string(),
    }
}

/// One-line summary used in the node picker.
pub fn node_list_item(node: &Node) -> String {
    format!(
        "{} [{}] (ID: {})",
        node.name,
        node_status(node.is_enabled, None),
        node.id
    )
}

pub fn node_detail(node: &Node) -> String {
    let mut out = String::new();
    let line = "─".repeat(50);
    let mut field = |k: &str, v: String| {
        let _ = writeln!(out, "{} {}", pad(&format!("{}:", k), 15, true), v);
    };

    field("Name", node.name.clone());
    field(
        "Status",
        node_status(node.is_enabled, node.down_reason.as_deref()),
    );
    if node.is_banned {
        field(
            "Banned",
            node.ban_reason.clone().unwrap_or_else(|| "yes".to_string()),
        );
    }
    field("Bandwidth", format!("{} Mbps", node.bandwidth));
    field("Measured", format!("{} Mbps", node.measure_bandwidth));
    field("Runtime", node.flavor.runtime.clone());
    field("Storage", node.flavor.storage.clone());
    field("Version", node.version.clone());
    field("Trust", node.trust.to_string());
    field("Created", format_time(node.created_at));
    field("Last activity", format_time(node.last_activity));
    if node.uptime.is_some_and(|t| t.timestamp() > 0) {
        field("Up since", format_time(node.uptime));
    }
    if node.downtime.is_some_and(|t| t.timestamp() > 0) {
        field("Down since", format_time(node.downtime));
    }

    if !node.sponsor.name.is_empty() {
        let _ = writeln!(out, "{}", line);
        let _ = writeln!(out, "{} {}", pad("Sponsor:", 15, true), node.sponsor.name);
        let _ = writeln!(out, "{} {}", pad("Sponsor URL:", 15, true), node.sponsor.url);
    }

    let _ = writeln!(out, "{}", line);
    let _ = writeln!(
        out,
        "{} {}://{}:{}",
        pad("Endpoint:", 15, true),
        node.endpoint.proto,
        node.endpoint.host,
        node.endpoint.port
    );
    out
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Leaderboard rows for zero-based `page`.
pub fn rank_page(ranks: &[NodeMetricRank], page: usize, page_size: usize) -> String {
    let start = (page * page_size).min(ranks.len());
    let end = (start + page_size).min(ranks.len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {} {} {} {}",
        pad("#", 4, true),
        pad("Node", 24, true),
        pad("Hits", 12, false),
        pad("Traffic", 12, false),
        pad("Status", 8, true),
        "Sponsor"
    );
    let _ = writeln!(out, "{}", "─".repeat(80));
    for (i, rank) in ranks[start..end].iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {}",
            pad(&(start + i + 1).to_string(), 4, true),
            pad(&truncate(&rank.name, 24), 24, true),
            pad(&rank.metric.hits.to_string(), 12, false),
            pad(&format_bytes(rank.metric.bytes), 12, false),
            pad(&node_status(rank.is_enabled, None), 8, true),
            rank.sponsor.name
        );
    }
    let _ = writeln!(
        out,
        "\nPage {}/{} ({} nodes)",
        page + 1,
        page_count(ranks.len(), page_size).max(1),
        ranks.len()
    );
    out
}
