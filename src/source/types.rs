use serde::Serialize;

use crate::store::Source;

#[derive(Serialize)]
pub struct SourceAddPlan {
    pub action: &'static str,
    pub url: String,
    pub name: Option<String>,
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct SourceAddResult {
    pub inserted: bool,
    pub source: Source,
}

#[derive(Serialize)]
pub struct SourceList {
    pub sources: Vec<Source>,
}

#[derive(Serialize)]
pub struct SourceRemoveResult {
    pub source_id: i64,
    pub removed: bool,
}
