//! Per-axis `{min, extent, stride}` descriptors and the layout arithmetic built on them.

use serde::{Deserialize, Serialize};

use crate::error::{BufferError, BufferResult};

/// Describes one axis of a buffer. Strides are counted in elements, not bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub min: i64,
    pub extent: i64,
    pub stride: i64,
}

impl Dimension {
    pub const fn new(min: i64, extent: i64, stride: i64) -> Self {
        Dimension {
            min,
            extent,
            stride,
        }
    }

    /// Largest valid coordinate on this axis (`min - 1` for an empty axis).
    ///
    /// Clamped to the `i64` range for descriptors rejected at construction.
    pub fn max(&self) -> i64 {
        let max = i128::from(self.min) + i128::from(self.extent) - 1;
        max.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    pub fn contains(&self, coord: i64) -> bool {
        let offset = i128::from(coord) - i128::from(self.min);
        offset >= 0 && offset < i128::from(self.extent)
    }
}

/// Dense layout for `extents`: mins at zero, stride 1 on axis 0 and each later
/// stride the product of all earlier extents.
pub fn dense(extents: &[usize]) -> BufferResult<Vec<Dimension>> {
    let mut dims = Vec::with_capacity(extents.len());
    let mut stride: i64 = 1;
    for &extent in extents {
        let extent = i64::try_from(extent).map_err(|_| {
            BufferError::allocation(format!("extent {extent} does not fit a dimension"))
        })?;
        dims.push(Dimension::new(0, extent, stride));
        stride = stride
            .checked_mul(extent.max(1))
            .ok_or_else(|| BufferError::allocation(format!("stride overflow for {extents:?}")))?;
    }
    Ok(dims)
}

/// Rejects descriptors with a negative extent or whose last coordinate does
/// not fit an `i64`.
pub(crate) fn validate(dims: &[Dimension]) -> BufferResult<()> {
    for (axis, dim) in dims.iter().enumerate() {
        if dim.extent < 0 {
            return Err(BufferError::invalid_argument(format!(
                "dimension {axis} has negative extent {}",
                dim.extent
            )));
        }
        if dim.min.checked_add(dim.extent).is_none() {
            return Err(BufferError::invalid_argument(format!(
                "dimension {axis} with min {} and extent {} overflows i64",
                dim.min, dim.extent
            )));
        }
    }
    Ok(())
}

/// Number of elements addressed by `dims`, or `None` on overflow.
pub(crate) fn element_count(dims: &[Dimension]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, dim| {
        let extent = usize::try_from(dim.extent).ok()?;
        acc.checked_mul(extent)
    })
}

/// Element offsets, relative to the element at the mins, of the lowest and
/// highest addressed elements. Both are zero for an empty buffer.
pub(crate) fn offset_span(dims: &[Dimension]) -> Option<(i64, i64)> {
    if dims.iter().any(|dim| dim.extent == 0) {
        return Some((0, 0));
    }
    let mut low: i64 = 0;
    let mut high: i64 = 0;
    for dim in dims {
        let reach = (dim.extent - 1).checked_mul(dim.stride)?;
        if reach < 0 {
            low = low.checked_add(reach)?;
        } else {
            high = high.checked_add(reach)?;
        }
    }
    Some((low, high))
}

/// Element offset of `coords` relative to the element at the mins, or `None`
/// when a coordinate lies outside its axis or the rank does not match.
pub(crate) fn offset_of(dims: &[Dimension], coords: &[i64]) -> Option<i64> {
    if dims.len() != coords.len() {
        return None;
    }
    let mut offset: i64 = 0;
    for (dim, &coord) in dims.iter().zip(coords) {
        if !dim.contains(coord) {
            return None;
        }
        offset = offset.checked_add((coord - dim.min).checked_mul(dim.stride)?)?;
    }
    Some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_strides_grow_from_axis_zero() {
        let dims = dense(&[4, 3, 2]).unwrap();
        assert_eq!(
            dims,
            vec![
                Dimension::new(0, 4, 1),
                Dimension::new(0, 3, 4),
                Dimension::new(0, 2, 12),
            ]
        );
        assert_eq!(element_count(&dims), Some(24));
    }

    #[test]
    fn span_accounts_for_negative_strides() {
        let dims = [Dimension::new(0, 4, -1), Dimension::new(0, 3, 4)];
        assert_eq!(offset_span(&dims), Some((-3, 8)));
    }

    #[test]
    fn offsets_respect_mins() {
        let dims = [Dimension::new(10, 4, 1), Dimension::new(-2, 3, 4)];
        assert_eq!(offset_of(&dims, &[10, -2]), Some(0));
        assert_eq!(offset_of(&dims, &[13, 0]), Some(11));
        assert_eq!(offset_of(&dims, &[14, 0]), None);
        assert_eq!(offset_of(&dims, &[10]), None);
    }

    #[test]
    fn contains_handles_extreme_coordinates() {
        let dim = Dimension::new(-1, 2, 1);
        assert!(dim.contains(0));
        assert!(!dim.contains(i64::MAX));
        assert!(!dim.contains(i64::MIN));
        assert!(!Dimension::new(i64::MIN, 1, 1).contains(i64::MAX));
        assert_eq!(offset_of(&[dim], &[i64::MAX]), None);
    }

    #[test]
    fn overflowing_axis_is_rejected() {
        let err = validate(&[Dimension::new(i64::MAX - 1, 2, 1)]).unwrap_err();
        assert!(matches!(err, BufferError::InvalidArgument { .. }));
        assert!(validate(&[Dimension::new(i64::MAX - 1, 1, 1)]).is_ok());
        assert_eq!(Dimension::new(i64::MAX - 1, 2, 1).max(), i64::MAX);
    }

    #[test]
    fn negative_extent_is_rejected() {
        let err = validate(&[Dimension::new(0, -1, 1)]).unwrap_err();
        assert!(matches!(err, BufferError::InvalidArgument { .. }));
    }
}
