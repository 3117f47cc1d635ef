use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Settings;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Read, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Read => "read", Phase::Write => "write" } }
    fn span(&self) -> Span { match self { Phase::Read => info_span!("read"), Phase::Write => info_span!("write") } }
}

impl OpMarker for Settings {
    const NAME: &'static str = "settings";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("settings") }
}
