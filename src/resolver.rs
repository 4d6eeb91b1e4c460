// Name to id resolution. Every lookup refetches the full listing and
// takes the first exact (case-sensitive) match in server order.

use crate::error::{CatalogError, Result};

/// A listed resource that can be addressed by name.
pub trait Named {
    /// Used in the "not found" message, e.g. "Analytic".
    const KIND: &'static str;

    fn name(&self) -> &str;
    fn id(&self) -> &str;
}

pub fn resolve_id<T, F>(list: F, name: &str) -> Result<String>
where
    T: Named,
    F: FnOnce() -> Result<Vec<T>>,
{
    list()?
        .iter()
        .find(|item| item.name() == name)
        .map(|item| item.id().to_string())
        .ok_or_else(|| CatalogError::NotFound {
            kind: T::KIND,
            name: name.to_string(),
        })
}
