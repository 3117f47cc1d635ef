use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Process;

#[derive(Copy, Clone, Debug)]
pub enum Phase { CountPending, FetchBatch, Dispatch, Join, Filter, Summarize, Persist }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::CountPending => "count_pending",
        Phase::FetchBatch => "fetch_batch",
        Phase::Dispatch => "dispatch",
        Phase::Join => "join",
        Phase::Filter => "filter",
        Phase::Summarize => "summarize",
        Phase::Persist => "persist",
    }}
    fn span(&self) -> Span { match self {
        Phase::CountPending => info_span!("count_pending"),
        Phase::FetchBatch => info_span!("fetch_batch"),
        Phase::Dispatch => info_span!("dispatch"),
        Phase::Join => info_span!("join"),
        Phase::Filter => info_span!("filter"),
        Phase::Summarize => info_span!("summarize"),
        Phase::Persist => info_span!("persist"),
    }}
}

impl OpMarker for Process {
    const NAME: &'static str = "process";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("process") }
}
