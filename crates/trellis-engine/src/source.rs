/// The external, possibly I/O-bound row store the engine reads from.
///
/// `includes` carries eager-load navigation paths from the mapping profile;
/// the source decides what they mean (an in-memory snapshot ignores them, a
/// remote store may translate them into join/prefetch hints). Failures
/// propagate to the caller unmodified — the engine performs no retries.
pub trait DataSource<E> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(&self, includes: &[String]) -> Result<Vec<E>, Self::Error>;
}

/// An in-memory snapshot source for tests and in-process hosts.
#[cfg(feature = "memory")]
pub struct MemorySource<E> {
    rows: Vec<E>,
}

#[cfg(feature = "memory")]
impl<E> MemorySource<E> {
    pub fn new(rows: Vec<E>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(feature = "memory")]
impl<E: Clone> DataSource<E> for MemorySource<E> {
    type Error = std::convert::Infallible;

    fn fetch(&self, _includes: &[String]) -> Result<Vec<E>, Self::Error> {
        Ok(self.rows.clone())
    }
}
