//! Row-parallel iteration with or without rayon
//!
//! With the `parallel` feature this is `rayon::prelude`. Without it,
//! `into_par_iter()` is plain `into_iter()`, so per-row kernels compile
//! unchanged and run sequentially.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// `into_par_iter()` for any `IntoIterator`; the chain after it uses
    /// the standard `Iterator` methods.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
