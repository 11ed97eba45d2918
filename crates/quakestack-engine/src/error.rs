use std::io;
use std::path::PathBuf;

use quakestack_domain::LogicalId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {from} -> {to} references a resource outside the graph")]
    DanglingEdge { from: LogicalId, to: LogicalId },
    #[error("dependency cycle detected among: {resources}")]
    CycleDetected { resources: String },
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("failed to serialize template for stack {stack}")]
    Serialize {
        stack: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to create output directory {path}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write template {path}")]
    WriteTemplate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
