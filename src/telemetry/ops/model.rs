use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Model;

#[derive(Copy, Clone, Debug)]
pub enum Phase { ListModels, TestConnection }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::ListModels => "list_models", Phase::TestConnection => "test_connection" } }
    fn span(&self) -> Span { match self { Phase::ListModels => info_span!("list_models"), Phase::TestConnection => info_span!("test_connection") } }
}

impl OpMarker for Model {
    const NAME: &'static str = "model";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("model") }
}
