use serde::Serialize;

// Plan envelope types
#[derive(Serialize)]
pub struct SourceSample { pub source_id: i64, pub url: String, pub name: Option<String> }

#[derive(Serialize)]
pub struct IngestPlan { pub sources: usize, pub sample_sources: Vec<SourceSample> }

// Apply/result envelope types
#[derive(Clone, Debug, Default, Serialize)]
pub struct SourceSummary {
    pub source_id: i64,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestTotals { pub sources: usize, pub inserted: usize, pub failed_sources: usize }

#[derive(Debug, Default, Serialize)]
pub struct IngestApply { pub totals: IngestTotals, pub per_source: Vec<SourceSummary> }
