//! Vendor analysis report as returned by the scanning service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::constants::VENDOR_STATUS_COMPLETED;

/// Vendor statuses that explicitly report a failed analysis.
const VENDOR_FAILURE_STATUSES: &[&str] = &["failed", "error", "failure"];

/// How a vendor status maps onto the local lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorOutcome {
    Completed,
    Failed,
    /// Queued, in progress, or anything unrecognized.
    StillRunning,
}

/// Aggregate engine verdict counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DetectionStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub undetected: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub failure: u32,
    #[serde(default, rename = "type-unsupported")]
    pub type_unsupported: u32,
}

impl DetectionStats {
    /// Engines flagging the file as malicious or suspicious.
    pub fn threats(&self) -> u32 {
        self.malicious + self.suspicious
    }

    pub fn engines_total(&self) -> u32 {
        self.malicious
            + self.suspicious
            + self.undetected
            + self.harmless
            + self.timeout
            + self.failure
            + self.type_unsupported
    }
}

/// Verdict of a single engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct EngineResult {
    pub category: String,
    pub engine_name: String,
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AnalysisReport {
    pub analysis_id: String,
    /// Raw vendor status string, e.g. `queued`, `in-progress`, `completed`.
    pub vendor_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DetectionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<String, EngineResult>>,
}

impl AnalysisReport {
    pub fn outcome(&self) -> VendorOutcome {
        let status = self.vendor_status.trim().to_ascii_lowercase();
        if status == VENDOR_STATUS_COMPLETED {
            VendorOutcome::Completed
        } else if VENDOR_FAILURE_STATUSES.contains(&status.as_str()) {
            VendorOutcome::Failed
        } else {
            VendorOutcome::StillRunning
        }
    }

    /// Engines with a malicious or suspicious verdict, sorted by engine key.
    pub fn flagged_engines(&self) -> Vec<(&str, &EngineResult)> {
        self.results
            .iter()
            .flat_map(|results| results.iter())
            .filter(|(_, r)| r.category == "malicious" || r.category == "suspicious")
            .map(|(name, r)| (name.as_str(), r))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: &str) -> AnalysisReport {
        AnalysisReport {
            analysis_id: "an-1".to_string(),
            vendor_status: status.to_string(),
            stats: None,
            results: None,
        }
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(report("completed").outcome(), VendorOutcome::Completed);
        assert_eq!(report("Completed ").outcome(), VendorOutcome::Completed);
        assert_eq!(report("failed").outcome(), VendorOutcome::Failed);
        assert_eq!(report("queued").outcome(), VendorOutcome::StillRunning);
        assert_eq!(report("in-progress").outcome(), VendorOutcome::StillRunning);
        assert_eq!(report("").outcome(), VendorOutcome::StillRunning);
    }

    #[test]
    fn test_stats_parse_vendor_keys() {
        let stats: DetectionStats = serde_json::from_value(serde_json::json!({
            "malicious": 1,
            "suspicious": 2,
            "undetected": 60,
            "type-unsupported": 3
        }))
        .unwrap();
        assert_eq!(stats.threats(), 3);
        assert_eq!(stats.type_unsupported, 3);
        assert_eq!(stats.harmless, 0);
        assert_eq!(stats.engines_total(), 66);
    }

    #[test]
    fn test_flagged_engines() {
        let mut results = BTreeMap::new();
        results.insert(
            "Kaspersky".to_string(),
            EngineResult {
                category: "undetected".to_string(),
                engine_name: "Kaspersky".to_string(),
                engine_version: None,
                result: None,
            },
        );
        results.insert(
            "CrowdStrike".to_string(),
            EngineResult {
                category: "malicious".to_string(),
                engine_name: "CrowdStrike Falcon".to_string(),
                engine_version: None,
                result: Some("malicious".to_string()),
            },
        );
        let mut r = report("completed");
        r.results = Some(results);

        let flagged = r.flagged_engines();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].0, "CrowdStrike");
    }
}
