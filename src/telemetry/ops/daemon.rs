use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Daemon;

#[derive(Copy, Clone, Debug)]
pub enum Phase { FetchTick, ProcessTick, Shutdown }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::FetchTick => "fetch_tick",
        Phase::ProcessTick => "process_tick",
        Phase::Shutdown => "shutdown",
    }}
    fn span(&self) -> Span { match self {
        Phase::FetchTick => info_span!("fetch_tick"),
        Phase::ProcessTick => info_span!("process_tick"),
        Phase::Shutdown => info_span!("shutdown"),
    }}
}

impl OpMarker for Daemon {
    const NAME: &'static str = "daemon";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("daemon") }
}
