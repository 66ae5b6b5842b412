//! Terminal rendering for scan records and vendor analyses.

use scanvault_core::models::{
    AnalysisReport, HistoryResponse, ScanCheckResponse, ScanRecord, ScanStats, ScanStatus,
};
use std::fmt::Write;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable size, e.g. `1.5 MiB`.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes.max(0))
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// One-line description of where a scan stands.
pub fn describe_status(status: ScanStatus) -> &'static str {
    match status {
        ScanStatus::Pending => "waiting to be submitted",
        ScanStatus::Scanning => "scan in progress",
        ScanStatus::Completed => "scan completed",
        ScanStatus::Error => "scan failed",
    }
}

/// Status line plus, once completed, the detection summary and engine table.
pub fn render_check(scan_id: &str, check: &ScanCheckResponse) -> String {
    let mut out = format!(
        "Scan {}: {} ({})\n",
        scan_id,
        check.status,
        describe_status(check.status)
    );
    if check.status == ScanStatus::Completed {
        if let Some(analysis) = &check.analysis {
            out.push_str(&render_analysis(analysis));
        }
    }
    out
}

/// Detection counts and the per-engine results table.
pub fn render_analysis(analysis: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Analysis {} ({})",
        analysis.analysis_id, analysis.vendor_status
    );

    if let Some(stats) = &analysis.stats {
        let verdict = if stats.malicious > 0 || stats.suspicious > 0 {
            "THREATS DETECTED"
        } else {
            "clean"
        };
        let _ = writeln!(
            out,
            "Verdict: {}  malicious={} suspicious={} undetected={} harmless={} timeout={} failure={} unsupported={}",
            verdict,
            stats.malicious,
            stats.suspicious,
            stats.undetected,
            stats.harmless,
            stats.timeout,
            stats.failure,
            stats.type_unsupported
        );
    }

    let flagged = analysis.flagged_engines();
    if !flagged.is_empty() {
        let names: Vec<&str> = flagged.iter().map(|(name, _)| *name).collect();
        let _ = writeln!(out, "Flagged by: {}", names.join(", "));
    }

    if let Some(results) = &analysis.results {
        let _ = writeln!(out, "{:<24} {:<12} {:<16} {}", "ENGINE", "CATEGORY", "VERSION", "RESULT");
        for (engine, result) in results {
            let _ = writeln!(
                out,
                "{:<24} {:<12} {:<16} {}",
                truncate_string(engine, 24),
                truncate_string(&result.category, 12),
                truncate_string(result.engine_version.as_deref().unwrap_or("-"), 16),
                result.result.as_deref().unwrap_or("-")
            );
        }
    }
    out
}

pub fn render_record(record: &ScanRecord) -> String {
    format!(
        "{}  {:<10} {:>10}  {}  {}",
        record.id,
        record.status,
        format_size(record.file_size),
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        truncate_string(&record.file_name, 40)
    )
}

pub fn render_history(history: &HistoryResponse) -> String {
    if history.scans.is_empty() {
        return "No scans yet.\n".to_string();
    }
    let mut out = String::new();
    for record in &history.scans {
        let _ = writeln!(out, "{}", render_record(record));
    }
    let _ = writeln!(
        out,
        "Page {}/{} ({} scans)",
        history.page,
        history.pages.max(1),
        history.total
    );
    out
}

pub fn render_stats(stats: &ScanStats) -> String {
    let last = stats
        .last_scan_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "Total scans:      {}\nCompleted:        {}\nIn progress:      {}\nFailed:           {}\nThreats detected: {}\nLast scan:        {}\n",
        stats.total_scans,
        stats.completed,
        stats.in_progress,
        stats.failed,
        stats.threats_detected,
        last
    )
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanvault_core::models::{DetectionStats, EngineResult};
    use std::collections::BTreeMap;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn render_check_distinguishes_states() {
        let scanning = ScanCheckResponse {
            status: ScanStatus::Scanning,
            analysis: None,
        };
        assert!(render_check("s1", &scanning).contains("scan in progress"));

        let failed = ScanCheckResponse {
            status: ScanStatus::Error,
            analysis: None,
        };
        assert!(render_check("s1", &failed).contains("scan failed"));
    }

    #[test]
    fn render_check_completed_includes_engine_table() {
        let mut results = BTreeMap::new();
        results.insert(
            "EngineA".to_string(),
            EngineResult {
                category: "malicious".to_string(),
                engine_name: "EngineA".to_string(),
                engine_version: Some("1.2".to_string()),
                result: Some("EICAR-Test-File".to_string()),
            },
        );
        let check = ScanCheckResponse {
            status: ScanStatus::Completed,
            analysis: Some(AnalysisReport {
                analysis_id: "analysis-1".to_string(),
                vendor_status: "completed".to_string(),
                stats: Some(DetectionStats {
                    malicious: 1,
                    undetected: 60,
                    ..DetectionStats::default()
                }),
                results: Some(results),
            }),
        };

        let out = render_check("s1", &check);
        assert!(out.contains("THREATS DETECTED"));
        assert!(out.contains("EICAR-Test-File"));
        assert!(out.contains("malicious=1"));
        assert!(out.contains("Flagged by: EngineA"));
    }

    #[test]
    fn render_history_empty() {
        let history = HistoryResponse {
            scans: vec![],
            total: 0,
            page: 1,
            per_page: 10,
            pages: 0,
        };
        assert_eq!(render_history(&history), "No scans yet.\n");
    }
}
