//! Model-agnostic interpretation of fitted regression models.
//!
//! A [`Predictor`] bundles a [`Model`] with the rows it is explained on.
//! Each method implements [`Method`] and returns a serializable result:
//! permutation importance, Friedman's H-statistic, partial dependence with
//! ICE curves, accumulated local effects, a global surrogate tree, and a
//! local linear surrogate (LIME).

mod ale;
mod effect;
mod error;
mod importance;
mod interaction;
mod lime;
mod linalg;
mod loss;
mod method;
mod model;
mod pdp;
mod predictor;
mod stats;
mod surrogate;

pub use ale::{AccumulatedLocalEffects, weighted_mean_effect};
pub use effect::{EffectMethod, FeatureEffect};
pub use error::InterpretError;
pub use importance::{FeatureImportance, FeatureImportanceEntry, PermutationImportance};
pub use interaction::{Interaction, InteractionEntry, InteractionStrength};
pub use lime::{Instance, LocalEffect, LocalExplanation, LocalSurrogate};
pub use loss::{Compare, Loss};
pub use method::Method;
pub use model::{FnModel, Model};
pub use pdp::PartialDependence;
pub use predictor::Predictor;
pub use surrogate::{Condition, GlobalSurrogate, SurrogateLeaf, TreeSurrogate};
