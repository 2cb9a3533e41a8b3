//! Period-over-period return series.

use crate::types::{PricePoint, ValuePoint};
use std::iter::FusedIterator;

/// A point in a series that carries a price or value.
pub trait Priced {
    fn price(&self) -> f64;
}

impl Priced for f64 {
    fn price(&self) -> f64 {
        *self
    }
}

impl Priced for PricePoint {
    fn price(&self) -> f64 {
        self.price
    }
}

impl Priced for ValuePoint {
    fn price(&self) -> f64 {
        self.value
    }
}

/// Lazy iterator of fractional returns `(p[i] - p[i-1]) / p[i-1]`.
///
/// Borrows the series, so it can be cloned or [`restart`](Returns::restart)ed
/// to walk the same returns again. Pairs whose earlier price is not positive
/// are skipped.
#[derive(Debug)]
pub struct Returns<'a, T> {
    series: &'a [T],
    next: usize,
}

impl<'a, T: Priced> Returns<'a, T> {
    pub fn new(series: &'a [T]) -> Self {
        Self { series, next: 1 }
    }

    /// Rewind to the first return.
    pub fn restart(&mut self) {
        self.next = 1;
    }
}

impl<T> Clone for Returns<'_, T> {
    fn clone(&self) -> Self {
        Self {
            series: self.series,
            next: self.next,
        }
    }
}

impl<T: Priced> Iterator for Returns<'_, T> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        while self.next < self.series.len() {
            let previous = self.series[self.next - 1].price();
            let current = self.series[self.next].price();
            self.next += 1;

            if previous > 0.0 {
                return Some((current - previous) / previous);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.series.len().saturating_sub(self.next)))
    }
}

impl<T: Priced> FusedIterator for Returns<'_, T> {}

/// Returns of a chronological price series. Empty for fewer than two points.
pub fn compute_returns<T: Priced>(series: &[T]) -> Returns<'_, T> {
    Returns::new(series)
}
