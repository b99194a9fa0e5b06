pub mod template;
pub mod intrinsics;
pub mod overrides;
pub mod graph;
pub mod synth;
pub mod diff;

pub use template::*;
pub use intrinsics::{get_att, get_ref, sub, referenced_ids, is_pseudo_parameter};
pub use overrides::{PropertyOverride, OverrideError};
pub use graph::{ResourceGraph, NodeKind, GraphError};
pub use synth::{StackInput, ActionNode, Synthesized, StackError, synthesize, validate_stack_name, verify_resource_name};
pub use diff::{diff_templates, TemplateDiff, ResourceChange, ChangeKind};
