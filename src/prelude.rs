//! ranklearn prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::{Float, ParamGuard};

#[doc(no_inline)]
pub use crate::omega::OmegaIndex;

#[doc(no_inline)]
pub use crate::model_selection::{GridScores, GridSearch};

#[doc(no_inline)]
pub use crate::svd::SvdSolver;
