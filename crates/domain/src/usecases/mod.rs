//! Application use cases / business logic

pub mod embed;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod schedule;
pub mod schema;
mod stages;

pub use embed::{
    EmbedComposer, EmbedError, EmbedReport, EmbedSkip, SkippedFragment, strip_fragments,
};
pub use pipeline::{
    FollowUp, Pipeline, PipelineConfig, PipelineError, PipelineReport, SkipReason, StageOutcome,
    StageReport,
};
pub use reconcile::{ReconcileConfig, ReconcileError, Reconciler, SweepFailure, SweepReport};
pub use render::{FragmentKind, RenderConfig, Renderer};
pub use schedule::{ScheduleConfig, ScheduleError, ScheduleGenerator, ScheduleReport};
pub use schema::{SchemaInput, build_schema};
