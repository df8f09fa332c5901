/*
Copyright 2021 Jakub Lewandowski

This file is part of Pseudo-Global Warming perturbation tool (PGW).

Pseudo-Global Warming perturbation tool (PGW) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Pseudo-Global Warming perturbation tool (PGW) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Pseudo-Global Warming perturbation tool (PGW). If not, see https://www.gnu.org/licenses/.
*/

//! Module containg methods for conducting
//! binary search (bisection) of the profile segment
//! enclosing searched value.

use crate::errors::SearchError;

/// Core bisection function, an implementation of binary search
/// returning the index of the first element not smaller than `x`
/// in an ascending array (or `array.len()` when there is none).
fn binary_search<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    if array.is_empty() {
        return Err(SearchError::EmptyArray);
    }

    let mut lo = 0;
    let mut hi = array.len();

    while lo < hi {
        let mid = (lo + hi) / 2;

        if array[mid] >= *x {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(lo)
}

/// Finds the index `i` of the segment `[array[i], array[i + 1]]`
/// of an ascending array which should be used to interpolate at `x`.
///
/// Values outside of the array are assigned to the edge segments,
/// so that the segment can be used for linear extrapolation.
pub fn find_segment<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    if array.len() < 2 {
        return Err(SearchError::TooShort);
    }

    let found_index = binary_search(array, x)?;

    Ok(found_index.saturating_sub(1).min(array.len() - 2))
}

#[cfg(test)]
mod tests {
    use super::find_segment;
    use crate::errors::SearchError;

    #[test]
    fn inside() {
        let array = [1.0, 2.0, 4.0, 8.0];

        assert_eq!(find_segment(&array, &1.5).unwrap(), 0);
        assert_eq!(find_segment(&array, &3.0).unwrap(), 1);
        assert_eq!(find_segment(&array, &7.9).unwrap(), 2);
    }

    #[test]
    fn on_nodes() {
        let array = [1.0, 2.0, 4.0, 8.0];

        assert_eq!(find_segment(&array, &1.0).unwrap(), 0);
        assert_eq!(find_segment(&array, &2.0).unwrap(), 0);
        assert_eq!(find_segment(&array, &8.0).unwrap(), 2);
    }

    #[test]
    fn outside() {
        let array = [1.0, 2.0, 4.0, 8.0];

        assert_eq!(find_segment(&array, &-10.0).unwrap(), 0);
        assert_eq!(find_segment(&array, &100.0).unwrap(), 2);
    }

    #[test]
    fn too_short() {
        assert!(matches!(
            find_segment(&[1.0], &1.0),
            Err(SearchError::TooShort)
        ));
        assert!(matches!(
            find_segment::<f64>(&[], &1.0),
            Err(SearchError::TooShort)
        ));
    }
}
