//! Verdict builders: turn a completed result set, or a history of them,
//! into human-readable qualitative text. Both functions are total.

use crate::model::{MeasurementResult, RecordStatus, TestRecord};
use crate::profiles::ProfileCategory;

/// Qualitative verdict for a completed quick test. Severe packet loss
/// overrides every use-case branch.
pub fn evaluate_quick_test(result: &MeasurementResult, category: ProfileCategory) -> String {
    if result.loss_pct > 5.0 {
        return "Warning: a high rate of packet loss was detected. \
                The connection is unstable regardless of raw speed."
            .to_string();
    }

    let verdict = match category {
        ProfileCategory::Gaming => {
            if result.ping_ms < 20.0 && result.jitter_ms < 10.0 {
                "Perfect result for gaming. Low latency and stable jitter."
            } else if result.ping_ms < 50.0 {
                "Good connection for most games, though latency may be \
                 borderline for competitive play."
            } else {
                "Not ideal for fast-paced online games: latency is above 50 ms."
            }
        }
        ProfileCategory::Streaming => {
            if result.download_mbps > 100.0 {
                "Excellent. The line can carry several 4K streams at once \
                 without buffering."
            } else if result.download_mbps > 25.0 {
                "Sufficient for 4K (UHD) streaming on a single device."
            } else {
                "Download speed is on the low side. Consider dropping video \
                 quality to Full HD (1080p)."
            }
        }
        ProfileCategory::Office => {
            if result.upload_mbps > 10.0 && result.jitter_ms < 30.0 {
                "Great for video calls. Picture and audio should stay clean."
            } else if result.upload_mbps > 2.0 {
                "Video calls will work, but screen sharing or HD video may \
                 stutter."
            } else {
                "Low upload speed. Video calls may degrade or drop."
            }
        }
        ProfileCategory::General | ProfileCategory::Diagnostic => {
            if result.download_mbps > 50.0 {
                "Very fast connection, enough for a whole household."
            } else if result.download_mbps > 10.0 {
                "A standard connection for everyday browsing, mail and social \
                 media."
            } else {
                "Slower than today's usual standard. Consider an upgrade for \
                 heavier use."
            }
        }
    };

    verdict.to_string()
}

/// One-paragraph summary of a monitoring history: averages plus a stability
/// conclusion driven by the error and warning rates.
pub fn summarize_records(records: &[TestRecord], profile_name: &str) -> String {
    if records.is_empty() {
        return "No measurement has been performed.".to_string();
    }

    let n = records.len() as f64;
    let avg_download = records.iter().map(|r| r.download_mbps).sum::<f64>() / n;
    let avg_ping = records.iter().map(|r| r.ping_ms).sum::<f64>() / n;
    let error_rate = records
        .iter()
        .filter(|r| r.status == RecordStatus::Error)
        .count() as f64
        / n;
    let warning_rate = records
        .iter()
        .filter(|r| r.status == RecordStatus::Warning)
        .count() as f64
        / n;

    let conclusion = if error_rate > 0.1 {
        format!(
            "The line shows significant instability ({:.1}% error rate); a \
             technical inspection is recommended.",
            error_rate * 100.0
        )
    } else if warning_rate > 0.2 {
        "The line works, but its parameters fluctuate under load; real-time \
         applications may be affected."
            .to_string()
    } else {
        "The line is stable; measured values match the standards for this \
         connection type."
            .to_string()
    };

    format!(
        "Diagnostics ({profile_name}): average download {avg_download:.1} Mb/s, \
         latency {avg_ping:.0} ms. {conclusion}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn result(ping: f64, jitter: f64, download: f64, upload: f64, loss: f64) -> MeasurementResult {
        MeasurementResult {
            ping_ms: ping,
            jitter_ms: jitter,
            download_mbps: download,
            upload_mbps: upload,
            loss_pct: loss,
        }
    }

    fn record(download: f64, ping: f64, status: RecordStatus) -> TestRecord {
        TestRecord {
            id: 0,
            timestamp: datetime!(2026-02-01 08:30:00 UTC),
            ping_ms: ping,
            download_mbps: download,
            upload_mbps: 20.0,
            status,
        }
    }

    #[test]
    fn high_loss_overrides_every_profile_branch() {
        let verdict = evaluate_quick_test(
            &result(15.0, 5.0, 80.0, 30.0, 6.0),
            ProfileCategory::Gaming,
        );
        assert!(verdict.contains("packet loss"));
    }

    #[test]
    fn gaming_branches_on_latency_and_jitter() {
        let perfect = evaluate_quick_test(
            &result(15.0, 5.0, 60.0, 30.0, 0.0),
            ProfileCategory::Gaming,
        );
        assert!(perfect.contains("Perfect result for gaming"));

        let borderline = evaluate_quick_test(
            &result(35.0, 12.0, 60.0, 30.0, 0.0),
            ProfileCategory::Gaming,
        );
        assert!(borderline.contains("borderline"));

        let poor = evaluate_quick_test(
            &result(80.0, 5.0, 60.0, 30.0, 0.0),
            ProfileCategory::Gaming,
        );
        assert!(poor.contains("above 50 ms"));
    }

    #[test]
    fn office_branches_on_upload_and_jitter() {
        let good = evaluate_quick_test(
            &result(30.0, 10.0, 40.0, 20.0, 0.0),
            ProfileCategory::Office,
        );
        assert!(good.contains("video calls"));

        let weak = evaluate_quick_test(
            &result(30.0, 10.0, 40.0, 1.0, 0.0),
            ProfileCategory::Office,
        );
        assert!(weak.contains("Low upload"));
    }

    #[test]
    fn general_fallback_always_yields_a_message() {
        for download in [5.0, 20.0, 80.0] {
            let verdict = evaluate_quick_test(
                &result(30.0, 5.0, download, 20.0, 0.0),
                ProfileCategory::General,
            );
            assert!(!verdict.is_empty());
        }
    }

    #[test]
    fn empty_history_yields_the_fixed_message() {
        assert_eq!(
            summarize_records(&[], "Stability analysis (4h)"),
            "No measurement has been performed."
        );
    }

    #[test]
    fn clean_history_reads_as_stable() {
        let records = vec![
            record(50.0, 30.0, RecordStatus::Ok),
            record(52.0, 32.0, RecordStatus::Ok),
        ];
        let summary = summarize_records(&records, "Stability analysis (4h)");
        assert!(summary.contains("stable"));
        assert!(summary.contains("51.0 Mb/s"));
        assert!(summary.contains("31 ms"));
    }

    #[test]
    fn warning_heavy_history_notes_fluctuation() {
        let records = vec![
            record(50.0, 30.0, RecordStatus::Ok),
            record(4.0, 120.0, RecordStatus::Warning),
        ];
        let summary = summarize_records(&records, "X");
        assert!(summary.contains("fluctuate"));
    }

    #[test]
    fn error_heavy_history_recommends_inspection() {
        let records = vec![
            record(50.0, 30.0, RecordStatus::Ok),
            record(0.0, 0.0, RecordStatus::Error),
        ];
        let summary = summarize_records(&records, "X");
        assert!(summary.contains("instability"));
        assert!(summary.contains("50.0% error rate"));
    }
}
