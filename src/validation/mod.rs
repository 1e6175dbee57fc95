/*!
 * Validation of translated batches.
 *
 * - `validator`: line and batch checks against configured limits
 */

pub mod validator;

pub use validator::{SubtitleValidator, ValidationConfig};
