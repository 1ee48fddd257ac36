/// Receives progress notifications from the long-running install phases.
/// `add` announces work that will eventually be reported through `tick`.
pub trait Progress: Send + Sync {
    fn add(&self, _count: usize) {}
    fn tick(&self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {}
