mod assembler;
mod builder;
mod error;
mod graph;
mod synth;

pub use assembler::{
    DEFAULT_ARTIFACT_MANIFEST, DEFAULT_BINARY_NAME, StackSettings, assemble, function_name,
    project_name,
};
pub use builder::{MONITORING_KEY_VAR, build, default_observability_layer};
pub use error::{GraphError, SynthError};
pub use graph::{creation_order, teardown_order};
pub use synth::{CloudFormationSynthesizer, SynthesizedStack, Synthesizer, write_template};
