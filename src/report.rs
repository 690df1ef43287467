//! Plain-text diagnostic protocol builder.
//!
//! Consumes the record history, the run configuration and the prepared
//! summary paragraph; the layout is fixed so the tab-separated detail rows
//! can be parsed back by downstream tooling.

use crate::model::{RunConfig, TestRecord};
use anyhow::{Context, Result};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

const RULE: &str = "================================================================";
const ROW_RULE: &str = "----------------------------------------------------------------";

pub struct ReportContext<'a> {
    pub profile_name: &'a str,
    pub server_name: &'a str,
    pub config: &'a RunConfig,
}

/// Build the full report text: banner, header block, summary paragraph,
/// detail rows and trailer.
pub fn build_report(records: &[TestRecord], ctx: &ReportContext<'_>, summary: &str) -> String {
    let generated = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "now".into());
    let duration = humantime::format_duration(ctx.config.duration);

    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\nCONNECTION DIAGNOSTIC REPORT\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Generated: {generated}\n"));
    out.push_str(&format!("Profile: {}\n", ctx.profile_name));
    out.push_str(&format!(
        "Settings: cycle {}, total duration {duration}\n",
        ctx.config.interval
    ));
    out.push_str(&format!("Server: {}\n", ctx.server_name));
    out.push_str(RULE);
    out.push_str("\n\nSUMMARY:\n");
    out.push_str(summary);
    out.push_str("\n\n");
    out.push_str(RULE);
    out.push_str("\nMEASUREMENT LOG:\n");
    out.push_str("Time\t\t| Ping (ms)\t| Down (Mb/s)\t| Up (Mb/s)\t| Status\n");
    out.push_str(ROW_RULE);
    out.push('\n');

    let clock_fmt = format_description!("[hour]:[minute]:[second]");
    for r in records {
        let clock = r
            .timestamp
            .format(clock_fmt)
            .unwrap_or_else(|_| "--:--:--".into());
        out.push_str(&format!(
            "{clock}\t| {:.0}\t\t| {:.1}\t\t| {:.1}\t\t| {}\n",
            r.ping_ms, r.download_mbps, r.upload_mbps, r.status
        ));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push_str("\nGenerated by speedsim\n");
    out
}

/// Write a report to disk at the given path.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write report: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CycleInterval, RecordStatus};
    use std::time::Duration;
    use time::macros::datetime;

    fn record(id: u64, second: u8, ping: f64, down: f64, up: f64, status: RecordStatus) -> TestRecord {
        TestRecord {
            id,
            timestamp: datetime!(2026-02-01 08:30:00 UTC) + Duration::from_secs(second as u64),
            ping_ms: ping,
            download_mbps: down,
            upload_mbps: up,
            status,
        }
    }

    fn context(config: &RunConfig) -> ReportContext<'_> {
        ReportContext {
            profile_name: "Stability analysis (4h)",
            server_name: "AUTO (multi-server)",
            config,
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            server_id: "auto".into(),
            profile_id: "monitor-stability".into(),
            measure_download: true,
            measure_upload: true,
            measure_latency: true,
            duration: Duration::from_secs(4 * 60 * 60),
            interval: CycleInterval::Every(Duration::from_secs(900)),
        }
    }

    /// Extract the detail rows between the row rule and the blank trailer line.
    fn detail_rows(report: &str) -> Vec<&str> {
        report
            .lines()
            .skip_while(|l| *l != ROW_RULE)
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn report_carries_header_and_summary() {
        let cfg = config();
        let report = build_report(&[], &context(&cfg), "summary paragraph");
        assert!(report.contains("CONNECTION DIAGNOSTIC REPORT"));
        assert!(report.contains("Profile: Stability analysis (4h)"));
        assert!(report.contains("cycle every 15m"));
        assert!(report.contains("total duration 4h"));
        assert!(report.contains("Server: AUTO (multi-server)"));
        assert!(report.contains("summary paragraph"));
        assert!(detail_rows(&report).is_empty());
    }

    #[test]
    fn detail_rows_round_trip_in_insertion_order() {
        let records = vec![
            record(0, 15, 30.0, 88.5, 23.4, RecordStatus::Ok),
            record(1, 30, 120.0, 4.5, 12.1, RecordStatus::Warning),
            record(2, 45, 41.0, 55.2, 31.9, RecordStatus::Ok),
        ];
        let cfg = config();
        let report = build_report(&records, &context(&cfg), "s");

        let rows = detail_rows(&report);
        assert_eq!(rows.len(), records.len());
        for (row, rec) in rows.iter().zip(&records) {
            let cols: Vec<&str> = row.split('|').map(str::trim).collect();
            assert_eq!(cols.len(), 5);
            assert_eq!(cols[1].parse::<f64>().unwrap(), rec.ping_ms.round());
            assert_eq!(cols[2].parse::<f64>().unwrap(), rec.download_mbps);
            assert_eq!(cols[3].parse::<f64>().unwrap(), rec.upload_mbps);
            assert_eq!(cols[4], rec.status.to_string());
        }
        assert!(rows[0].starts_with("08:30:15"));
        assert!(rows[1].starts_with("08:30:30"));
        assert!(rows[2].starts_with("08:30:45"));
    }
}
