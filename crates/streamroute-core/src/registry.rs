//! Component registry capability
//!
//! The session pushes routed props patches through this trait; how the
//! registry stores or renders components is its own business.

use anyhow::Result;

use crate::protocol::{ComponentId, PropsPatch};

/// Receives props patches addressed to components
pub trait ComponentRegistry: Send + Sync {
    /// Apply `patch` to the component `id`. Errors are logged by the caller
    /// and never stop the stream.
    fn set_props(&self, id: &ComponentId, patch: &PropsPatch) -> Result<()>;
}

impl<F> ComponentRegistry for F
where
    F: Fn(&ComponentId, &PropsPatch) -> Result<()> + Send + Sync,
{
    fn set_props(&self, id: &ComponentId, patch: &PropsPatch) -> Result<()> {
        self(id, patch)
    }
}
