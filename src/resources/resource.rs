use std::fmt;
use std::sync::Arc;

/// Who is responsible for a resource's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Created by the container; stopped by its shutdown.
    Owned,
    /// Handed in by the caller; the container never starts or stops it.
    Supplied,
}

impl Ownership {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Ownership::Owned => "owned",
            Ownership::Supplied => "supplied",
        }
    }
}

/// A shared resource tagged with its [`Ownership`].
pub struct Resource<T: ?Sized> {
    value: Arc<T>,
    ownership: Ownership,
}

impl<T: ?Sized> Resource<T> {
    pub fn owned(value: Arc<T>) -> Self {
        Self {
            value,
            ownership: Ownership::Owned,
        }
    }

    pub fn supplied(value: Arc<T>) -> Self {
        Self {
            value,
            ownership: Ownership::Supplied,
        }
    }

    /// Wraps `value`, owned unless it came from the caller.
    pub(crate) fn from_option(supplied: Option<Arc<T>>, create: impl FnOnce() -> Arc<T>) -> Self {
        match supplied {
            Some(value) => Self::supplied(value),
            None => Self::owned(create()),
        }
    }

    #[inline]
    pub fn get(&self) -> &Arc<T> {
        &self.value
    }

    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }
}

impl<T: ?Sized> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            ownership: self.ownership,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("type", &std::any::type_name::<T>())
            .field("ownership", &self.ownership)
            .finish()
    }
}
