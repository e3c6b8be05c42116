//! The full collaborator surface a command-line front end needs.

use std::path::Path;
use std::sync::Arc;

use crate::discovery::{ArtifactDirectory, ClassifyError, Introspector};
use crate::framework::TestFramework;
use crate::isolation::UnitRoot;

/// An introspector and test framework pair that can also enumerate containers and provide unit roots.
pub trait Backend: Introspector + TestFramework + 'static {
    /// Container names found below `root`, in the order they should be classified.
    ///
    /// Defaults to walking `root` for compiled artifacts.
    fn containers(&self, root: &Path) -> Result<Vec<String>, ClassifyError> {
        Ok(ArtifactDirectory::default().containers(root)?)
    }

    /// Extra roots every execution scope should define units from, ahead of the configured classpath.
    fn unit_roots(&self) -> Vec<Arc<dyn UnitRoot>> {
        Vec::new()
    }
}
