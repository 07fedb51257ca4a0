//! The uniform interface every interpretation method implements.

use crate::error::InterpretError;
use crate::model::Model;
use crate::predictor::Predictor;

/// A configured interpretation method.
///
/// Methods are stateless: evaluating twice on the same predictor gives the
/// same output.
pub trait Method {
    /// The typed result this method produces.
    type Output;

    /// Short identifier used in logs and error context.
    fn name(&self) -> &'static str;

    /// Run the method against a predictor.
    ///
    /// # Errors
    ///
    /// Method-specific [`InterpretError`] variants for invalid settings,
    /// plus any prediction failure from the model.
    fn evaluate<M: Model>(&self, predictor: &Predictor<M>) -> Result<Self::Output, InterpretError>;
}
