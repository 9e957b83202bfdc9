//! Specialized collection types

use std::collections::TryReserveError;

/// Default number of elements reserved by a fresh [`InstanceCache`]
pub const DEFAULT_INSTANCE_CACHE_SIZE: usize = 256;

/// Errors raised by the growable scratch collections
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The allocator refused to grow the backing storage
    #[error("Instance cache allocation of {requested} elements failed: {source}")]
    AllocationFailed {
        /// Capacity that was requested
        requested: usize,
        /// Underlying allocator error
        #[source]
        source: TryReserveError,
    },
}

/// Contiguous scratch buffer for per-instance data.
///
/// The logical size is reset every batch while the backing storage is kept
/// alive, so steady-state frames do not allocate. Capacity doubles when a push
/// finds the buffer full.
///
/// Slices handed out by [`InstanceCache::as_slice`] borrow the cache, so the
/// borrow checker rejects holding them across a growing push.
#[derive(Debug, Clone)]
pub struct InstanceCache<T: Copy> {
    data: Vec<T>,
    reserved: usize,
}

impl<T: Copy> InstanceCache<T> {
    /// Create a cache with `reserve` elements of backing storage
    pub fn new(reserve: usize) -> Result<Self, CacheError> {
        let mut cache = Self {
            data: Vec::new(),
            reserved: 0,
        };
        cache.reserve(reserve)?;
        Ok(cache)
    }

    /// Number of elements pushed since the last clear
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been pushed since the last clear
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements the backing storage holds before it must grow
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Current contents
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Resize the backing storage to exactly `reserve_count` elements.
    ///
    /// Shrinking below the current length drops the trailing elements.
    pub fn reserve(&mut self, reserve_count: usize) -> Result<(), CacheError> {
        if reserve_count < self.reserved {
            self.data.truncate(reserve_count);
            self.data.shrink_to(reserve_count);
        } else if reserve_count > self.reserved {
            let additional = reserve_count - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|source| CacheError::AllocationFailed {
                    requested: reserve_count,
                    source,
                })?;
            log::trace!("Instance cache grown from {} to {} elements", self.reserved, reserve_count);
        }
        self.reserved = reserve_count;
        Ok(())
    }

    /// Append a value, doubling the backing storage when full
    pub fn push(&mut self, value: T) -> Result<(), CacheError> {
        if self.data.len() == self.reserved {
            let grown = (self.reserved * 2).max(1);
            self.reserve(grown)?;
        }
        self.data.push(value);
        Ok(())
    }

    /// Reset the logical size without releasing storage
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: bytemuck::Pod> InstanceCache<T> {
    /// Raw bytes of the current contents, ready for upload as per-instance data
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T: Copy> Default for InstanceCache<T> {
    fn default() -> Self {
        Self {
            data: Vec::with_capacity(DEFAULT_INSTANCE_CACHE_SIZE),
            reserved: DEFAULT_INSTANCE_CACHE_SIZE,
        }
    }
}
