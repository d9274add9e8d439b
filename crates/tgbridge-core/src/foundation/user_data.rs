//! Opaque per-subscription / per-call user data.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque value handed back to handlers and completions unchanged.
///
/// `UserData::none()` is the explicit "no data" value; it is what callers pass
/// when they have nothing to attach.
#[derive(Clone, Default)]
pub struct UserData(Option<Arc<dyn Any + Send + Sync>>);

impl UserData {
    /// No user data.
    pub fn none() -> Self {
        Self(None)
    }

    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Returns `true` if no value is attached.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the attached value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("UserData(..)"),
            None => f.write_str("UserData(None)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let data = UserData::new(String::from("greeting"));
        assert_eq!(data.downcast_ref::<String>().map(String::as_str), Some("greeting"));
        assert!(data.downcast_ref::<u32>().is_none());
        assert!(UserData::none().is_none());
        assert!(UserData::default().downcast_ref::<String>().is_none());
    }
}
