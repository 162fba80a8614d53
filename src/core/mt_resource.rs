use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` is how chunks travel between the host thread and the pipeline
/// worker: the world keeps one handle in its live map while the pipeline holds
/// another in its queues. It wraps an `Arc<RwLock<T>>`.
///
/// Unlike a bare `RwLock`, a poisoned lock is recovered rather than unwrapped.
/// A panic inside one pipeline stage must not take the host down with it the
/// next time the host touches the same chunk.
///
/// # Examples
///
/// ```
/// use voxel_stream::core::MtResource;
///
/// let counter = MtResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    /// The shared lock. Prefer [`MtResource::get`] and [`MtResource::get_mut`].
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard, recovering the value if a writer panicked.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a write guard, recovering the value if a writer panicked.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a non-owning handle to the same resource.
    pub fn downgrade(&self) -> MtHandle<T> {
        MtHandle {
            resource: Arc::downgrade(&self.resource),
        }
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

/// A weak counterpart of [`MtResource`].
///
/// Used for back-references that must never keep their target alive, such as a
/// chunk pointing at the world that owns it.
pub struct MtHandle<T: Send + Sync> {
    resource: Weak<RwLock<T>>,
}

impl<T: Send + Sync> MtHandle<T> {
    /// A handle that never upgrades.
    pub fn dangling() -> Self {
        Self {
            resource: Weak::new(),
        }
    }

    /// Attempts to recover a strong handle; `None` once the owner is gone.
    pub fn upgrade(&self) -> Option<MtResource<T>> {
        self.resource
            .upgrade()
            .map(|resource| MtResource { resource })
    }
}

impl<T: Send + Sync> Clone for MtHandle<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
