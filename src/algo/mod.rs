//! Mesh processing algorithms.
//!
//! - **Unsubdivision**: reverse one level of Catmull-Clark subdivision on a
//!   quad mesh, see [`unsubdivide`].
//! - **Progress**: the [`Progress`] callback shared by long-running passes.

mod progress;
pub mod unsubdivide;

pub use progress::Progress;
