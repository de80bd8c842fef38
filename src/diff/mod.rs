//! n 路资源对比

pub mod analyzers;
mod engine;
mod path_info;
mod walker;

pub use analyzers::{DiffAnalyzer, get_analyzer};
pub use engine::{
    BINARY_FORMATS, CancelToken, CapsuleComparison, CapsuleEntry, DIFF_OUTPUT_TARGET, DiffEngine,
    DiffOutcome, DiffReason, DiffReport, ResourceDiff, UniqueResource, capsule_destination,
    destination_for, is_binary_format,
};
pub use path_info::{PathInfo, PathKind, RootInput};
pub use walker::{ResourceWalker, walk, walk_composite};
