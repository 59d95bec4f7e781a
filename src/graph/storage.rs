//! Read/write road graph files from disk.
//!
//! The file is versioned JSON listing nodes and edges, with edges referring
//! to nodes by OSM id. Floats are written and parsed losslessly, so a saved
//! graph loads back with identical attributes.

use super::{GraphError, RoadEdge, RoadGraph, RoadNode};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Format version. Bump this when changing the file structure.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed graph file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported graph file version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("Inconsistent graph file: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredGraph {
    version: u32,
    nodes: Vec<RoadNode>,
    edges: Vec<StoredEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEdge {
    from: u64,
    to: u64,
    #[serde(flatten)]
    edge: RoadEdge,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write a graph to `path`, creating parent directories if needed
pub fn save(path: &Path, graph: &RoadGraph) -> Result<(), StorageError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }

    let stored = StoredGraph {
        version: FORMAT_VERSION,
        nodes: graph.nodes().cloned().collect(),
        edges: graph
            .edges()
            .map(|(from, to, edge)| StoredEdge {
                from: from.id,
                to: to.id,
                edge: edge.clone(),
            })
            .collect(),
    };

    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &stored)?;
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// Load a graph written by [`save`]
pub fn load(path: &Path) -> Result<RoadGraph, StorageError> {
    let file = File::open(path).map_err(io_error(path))?;
    let stored: StoredGraph = serde_json::from_reader(BufReader::new(file))?;

    if stored.version != FORMAT_VERSION {
        return Err(StorageError::Version {
            found: stored.version,
            expected: FORMAT_VERSION,
        });
    }

    let mut graph = RoadGraph::new();
    for node in stored.nodes {
        graph.add_node(node);
    }
    for stored_edge in stored.edges {
        graph.add_edge(stored_edge.from, stored_edge.to, stored_edge.edge)?;
    }
    Ok(graph)
}
