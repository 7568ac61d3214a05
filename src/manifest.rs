//! Route manifests: controller metadata kept in a YAML, JSON or TOML file.
//!
//! A manifest lists controllers with their base path, methods, parameters
//! and annotations. It is what the `restserver build` command compiles into
//! a persisted route table, and what an application can feed into
//! [`ControllerBuilder::from_meta`](crate::controller::ControllerBuilder::from_meta).
//!
//! ```yaml
//! root: api
//! controllers:
//!   - name: Users
//!     base_path: users
//!     methods:
//!       - name: show
//!         params:
//!           - name: id
//!         annotations:
//!           url: GET /$id
//!       - name: list
//!         params:
//!           - name: page
//!             default: 1
//!         annotations:
//!           url: [GET /, GET /page/$page]
//!           noAuth: true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::read_document;
use crate::meta::ControllerMeta;
use crate::router::RouteTable;

/// A controller entry of a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestController {
    /// Prefix for every route of the controller
    #[serde(default)]
    pub base_path: String,
    #[serde(flatten)]
    pub controller: ControllerMeta,
}

/// Parsed manifest file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Overrides the configured root when present
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub controllers: Vec<ManifestController>,
}

impl Manifest {
    /// Compile every controller into a fresh route table.
    ///
    /// `root` is used unless the manifest names its own.
    ///
    /// # Errors
    ///
    /// A `url` annotation or pattern of some controller is invalid.
    pub fn route_table(&self, root: &str) -> Result<RouteTable> {
        let root = self.root.as_deref().unwrap_or(root);
        let mut table = RouteTable::build();
        for entry in &self.controllers {
            table
                .register(root, &entry.base_path, &entry.controller)
                .with_context(|| format!("Invalid routes in controller {}", entry.controller.name))?;
        }
        Ok(table)
    }

    #[must_use]
    pub fn find_controller(&self, name: &str) -> Option<&ManifestController> {
        self.controllers.iter().find(|c| c.controller.name == name)
    }
}

/// Load a manifest, format chosen by file extension
///
/// # Errors
///
/// The file cannot be read or parsed.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let manifest: Manifest = read_document(path)?;
    info!(
        path = %path.display(),
        controllers = manifest.controllers.len(),
        "Manifest loaded"
    );
    Ok(manifest)
}
