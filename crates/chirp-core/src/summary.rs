use serde::Serialize;
use uuid::Uuid;

/// Per-stage outcome counts reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StageSummary {
    pub succeeded: usize,
    pub skipped_existing: usize,
    pub skipped_failed: usize,
}

impl StageSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped_existing + self.skipped_failed
    }
}

/// Summary of a whole batch run, printed as JSON by the CLI.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub species: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<StageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derive: Option<StageSummary>,
}

impl RunSummary {
    pub fn new(species: Vec<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            species,
            ingest: None,
            derive: None,
        }
    }
}
