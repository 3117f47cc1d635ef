use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Stats;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Summary, ListArticles }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Summary => "summary",
        Phase::ListArticles => "list_articles",
    }}
    fn span(&self) -> Span { match self {
        Phase::Summary => info_span!("summary"),
        Phase::ListArticles => info_span!("list_articles"),
    }}
}

impl OpMarker for Stats {
    const NAME: &'static str = "stats";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("stats") }
}
