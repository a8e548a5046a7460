//! Reducers used by aggregators.

use crate::error::AggregateError;

/// Sum of all values, saturating at the `i64` bounds.
pub fn sum<I>(values: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    values.into_iter().fold(0_i64, i64::saturating_add)
}

/// Median of all values; the mean of the two middle ones for an even count.
///
/// # Errors
/// [`AggregateError::Empty`] when `values` yields nothing.
///
/// # Example
/// ```
/// use tradevisor::{median, AggregateError};
///
/// assert_eq!(median([3, 7, 5]), Ok(5.0));
/// assert_eq!(median([3, 7]), Ok(5.0));
/// assert_eq!(median(Vec::<i64>::new()), Err(AggregateError::Empty));
/// ```
pub fn median<I>(values: I) -> Result<f64, AggregateError>
where
    I: IntoIterator<Item = i64>,
{
    let mut sorted: Vec<i64> = values.into_iter().collect();
    if sorted.is_empty() {
        return Err(AggregateError::Empty);
    }
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid] as f64)
    } else {
        Ok((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(median([3, 7, 5]), Ok(5.0));
        assert_eq!(median([3, 7]), Ok(5.0));
        assert_eq!(median([4, 1, 2, 8]), Ok(3.0));
        assert_eq!(median([35]), Ok(35.0));
    }

    #[test]
    fn median_of_nothing_is_an_error() {
        assert_eq!(median(std::iter::empty()), Err(AggregateError::Empty));
    }

    #[test]
    fn sum_saturates() {
        assert_eq!(sum([10, 20, 5]), 35);
        assert_eq!(sum([i64::MAX, 1]), i64::MAX);
        assert_eq!(sum(std::iter::empty()), 0);
    }
}
