use std::fs;
use std::io;
use std::path::Path;

use isorun_core::conventions::DEFAULT_ARTIFACT_EXTENSION;

/// Enumerates compiled artifacts below a root directory as dotted container names.
///
/// `<root>/a/b/C.class` becomes `a.b.C`. Names come back sorted, so discovery output is stable across
/// file systems.
#[derive(Debug, Clone)]
pub struct ArtifactDirectory {
    extension: String,
}

impl Default for ArtifactDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_EXTENSION)
    }
}

impl ArtifactDirectory {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn containers(&self, root: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        self.walk(root, &mut Vec::new(), &mut names)?;
        names.sort();
        Ok(names)
    }

    fn walk(&self, dir: &Path, prefix: &mut Vec<String>, names: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping non UTF-8 path");
                continue;
            };

            if file_type.is_dir() {
                prefix.push(name.to_string());
                self.walk(&path, prefix, names)?;
                prefix.pop();
            } else if path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str()) {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let mut dotted = prefix.join(".");
                if !dotted.is_empty() {
                    dotted.push('.');
                }
                dotted.push_str(stem);
                names.push(dotted);
            }
        }
        Ok(())
    }
}
