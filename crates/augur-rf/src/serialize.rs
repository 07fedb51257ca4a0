//! Model files: a tagged, versioned bincode encoding of a [`RandomForest`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// First bytes of every model file.
const MAGIC: [u8; 4] = *b"AGRF";

/// Bumped whenever the encoded layout of [`RandomForest`] changes.
const FORMAT_VERSION: u32 = 1;

#[derive(serde::Serialize)]
struct ModelFileRef<'a> {
    magic: [u8; 4],
    format_version: u32,
    forest: &'a RandomForest,
}

/// Decoded in two steps so a foreign file or an old version is reported as
/// such instead of as a decode failure of the forest.
#[derive(serde::Deserialize)]
struct ModelHeader {
    magic: [u8; 4],
    format_version: u32,
}

#[derive(serde::Deserialize)]
struct ModelFile {
    #[serde(rename = "magic")]
    _magic: [u8; 4],
    #[serde(rename = "format_version")]
    _format_version: u32,
    forest: RandomForest,
}

impl RandomForest {
    /// Encode the model as the bytes of a model file.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::SerializeModel`] if bincode fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RfError> {
        bincode::serialize(&ModelFileRef {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            forest: self,
        })
        .map_err(|source| RfError::SerializeModel { source })
    }

    /// Save the model, replacing any existing file at `path`.
    ///
    /// The bytes go to a sibling `.partial` file first and are renamed into
    /// place, so an interrupted save never leaves a truncated model behind.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | encoding failed |
    /// | [`RfError::WriteModel`] | the file could not be written or renamed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let partial = partial_path(path);
        fs::write(&partial, &bytes)
            .and_then(|()| fs::rename(&partial, path))
            .map_err(|source| {
                let _ = fs::remove_file(&partial);
                RfError::WriteModel {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model saved by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | the file cannot be read |
    /// | [`RfError::DeserializeModel`] | the bytes do not decode |
    /// | [`RfError::NotAModel`] | the file does not start with the model tag |
    /// | [`RfError::IncompatibleModelVersion`] | written by another format version |
    /// | [`RfError::CorruptModel`] | tree widths or feature names disagree, or a split links outside its tree |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let forest = decode(&bytes, path)?;
        debug!(
            n_trees = forest.trees.len(),
            n_features = forest.n_features,
            "model loaded"
        );
        Ok(forest)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn decode(bytes: &[u8], path: &Path) -> Result<RandomForest, RfError> {
    let decode_error = |source| RfError::DeserializeModel {
        path: path.to_path_buf(),
        source,
    };

    let header: ModelHeader = bincode::deserialize(bytes).map_err(decode_error)?;
    if header.magic != MAGIC {
        return Err(RfError::NotAModel {
            path: path.to_path_buf(),
        });
    }
    if header.format_version != FORMAT_VERSION {
        return Err(RfError::IncompatibleModelVersion {
            expected: FORMAT_VERSION,
            found: header.format_version,
            path: path.to_path_buf(),
        });
    }

    let forest = bincode::deserialize::<ModelFile>(bytes)
        .map_err(decode_error)?
        .forest;
    let corrupt = |reason: String| RfError::CorruptModel {
        path: path.to_path_buf(),
        reason,
    };
    if forest.trees.is_empty() {
        return Err(corrupt("forest has no trees".to_string()));
    }
    if forest.feature_names.len() != forest.n_features {
        return Err(corrupt(format!(
            "{} feature names for {} features",
            forest.feature_names.len(),
            forest.n_features
        )));
    }
    if let Some(i) = forest
        .trees
        .iter()
        .position(|t| t.n_features() != forest.n_features || t.nodes().is_empty())
    {
        return Err(corrupt(format!("tree {i} does not match the forest")));
    }
    if let Some((i, link)) = forest
        .trees
        .iter()
        .enumerate()
        .find_map(|(i, t)| t.broken_link().map(|link| (i, link)))
    {
        return Err(corrupt(format!("tree {i}: {link}")));
    }
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::RandomForestConfig;
    use crate::node::{FeatureIndex, Node, NodeIndex};

    fn fitted() -> RandomForest {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let targets: Vec<f64> = features.iter().map(|r| r[0] * 1.5 - r[1]).collect();
        let names = vec!["x".to_string(), "y".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .with_seed(42)
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn saved_model_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let forest = fitted();
        forest.save(&path).unwrap();
        assert!(!partial_path(&path).exists());

        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded.feature_names(), forest.feature_names());
        for sample in [[1.5, 0.0], [11.0, 2.0], [25.0, 1.0]] {
            assert_eq!(forest.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
        }
    }

    #[test]
    fn save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"stale").unwrap();
        fitted().save(&path).unwrap();
        assert!(RandomForest::load(&path).is_ok());
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, RfError::ReadModel { .. }));
    }

    #[test]
    fn short_file_fails_to_decode() {
        let err = decode(b"AG", Path::new("short.bin")).unwrap_err();
        assert!(matches!(err, RfError::DeserializeModel { .. }));
    }

    #[test]
    fn foreign_file_is_not_a_model() {
        let err = decode(b"not a valid model file", Path::new("x.bin")).unwrap_err();
        assert!(matches!(err, RfError::NotAModel { .. }));
    }

    #[test]
    fn other_version_rejected() {
        let mut bytes = fitted().to_bytes().unwrap();
        // Version follows the four tag bytes, little-endian.
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        let err = decode(&bytes, Path::new("old.bin")).unwrap_err();
        assert!(matches!(
            err,
            RfError::IncompatibleModelVersion { expected: 1, found: 7, .. }
        ));
    }

    #[test]
    fn inconsistent_forest_is_corrupt() {
        let mut forest = fitted();
        forest.feature_names.pop();
        let bytes = forest.to_bytes().unwrap();
        let err = decode(&bytes, Path::new("bad.bin")).unwrap_err();
        assert!(matches!(err, RfError::CorruptModel { .. }));
    }

    fn relink(forest: &mut RandomForest, left: usize, feature: usize) {
        match &mut forest.trees[0].nodes[0] {
            Node::Split {
                left: l,
                feature: f,
                ..
            } => {
                *l = NodeIndex::new(left);
                *f = FeatureIndex::new(feature);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn dangling_links_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tampered.bin");
        for (left, feature) in [(9999, 0), (0, 0), (1, 2)] {
            let mut forest = fitted();
            relink(&mut forest, left, feature);
            forest.save(&path).unwrap();
            match RandomForest::load(&path) {
                Err(RfError::CorruptModel { reason, .. }) => assert!(reason.starts_with("tree 0")),
                other => panic!("left {left}, feature {feature}: {other:?}"),
            }
        }
    }
}
