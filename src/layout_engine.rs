//! Placement logic: hotkey snapping and applying saved layouts.

pub mod applier;
pub mod snap;

pub use applier::{ApplyError, ApplyFailure, ApplyReport, LayoutApplier, Targets};
pub use snap::{SnapCycler, SnapOutcome, SnapPosition};
