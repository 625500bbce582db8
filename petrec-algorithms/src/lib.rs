//! petrec-algorithms: Reconstruction stages for detector event
//! building.
//!
//! The chain runs in four stages over one time window: edge pairing
//! ([`pulse_assembly`]), per-group pulse merging ([`group_merging`]),
//! opposite-side signal matching ([`hit_matching`]) and coincidence
//! clustering ([`event_assembly`]). [`pipeline`] wires the stages
//! together behind a validated configuration.

pub mod event_assembly;
pub mod group_merging;
pub mod hit_matching;
pub mod pipeline;
pub mod pulse_assembly;

pub use event_assembly::{assemble_events, AdjacencyPair, EventAssemblyConfig};
pub use group_merging::{merge_pulses, GroupMergingConfig};
pub use hit_matching::{match_signals, HitMatchingConfig};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary, WindowOutput};
pub use pulse_assembly::{assemble_pulses, PulseAssemblyConfig};
