//! Tier implementations.

/// One candidate implementation of the dispatched operation.
///
/// The baseline and accelerated implementations of a dispatcher must agree
/// on `Output` and `Error` and must be observably equivalent. The dispatcher
/// never compares their results.
pub trait Implementation<T: ?Sized> {
    type Output;
    type Error;

    fn run(&self, input: &T) -> Result<Self::Output, Self::Error>;
}

impl<T, R, E, F> Implementation<T> for F
where
    T: ?Sized,
    F: Fn(&T) -> Result<R, E>,
{
    type Output = R;
    type Error = E;

    fn run(&self, input: &T) -> Result<R, E> {
        self(input)
    }
}
