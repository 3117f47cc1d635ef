pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one typed context per command
pub fn init() -> LogCtx<ops::init::Init> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn source() -> LogCtx<ops::source::Source> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn ingest() -> LogCtx<ops::ingest::Ingest> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn process() -> LogCtx<ops::process::Process> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn model() -> LogCtx<ops::model::Model> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn settings() -> LogCtx<ops::settings::Settings> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn stats() -> LogCtx<ops::stats::Stats> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn daemon() -> LogCtx<ops::daemon::Daemon> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
