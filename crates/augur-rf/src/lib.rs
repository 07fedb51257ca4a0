//! Random forest regression.
//!
//! [`RandomForestConfig::fit`] grows bagged CART trees in parallel and
//! reports impurity importances and, on request, an out-of-bag score.
//! [`GridSearch`] picks hyperparameters by target-stratified
//! [`CrossValidation`]. A fitted [`RandomForest`] predicts single rows or
//! batches and round-trips through a versioned model file.

mod config;
mod data;
mod error;
mod eval;
mod forest;
mod grid;
mod importance;
mod metrics;
mod node;
mod oob;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use error::RfError;
pub use eval::{CrossValidation, CrossValidationResult};
pub use forest::RandomForest;
pub use grid::{GridScore, GridSearch, GridSearchResult, HyperParams};
pub use importance::RankedFeature;
pub use metrics::{mean_squared_error, r2_score};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitMethod;
pub use tree::{RegressionTree, RegressionTreeConfig};
