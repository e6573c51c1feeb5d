//! Flat geometry lists and their foreign packing.
//!
//! A [`GeometryList`] is the universal coordinate container of the kernel
//! boundary: three equal-length channels (x, y, values) with two reserved
//! sentinel doubles marking sub-sequence boundaries. The values channel is
//! multiplexed by operation (z-coordinates, per-edge quality scalars, or a
//! 0.0/1.0 inclusion mask) over one physical array; the named accessors
//! only differ in intent.
//!
//! Packing produces a [`PackedGeometry`]: three scoped foreign buffers plus
//! the native descriptor pointing at them. Validation happens before any
//! buffer is allocated, and the buffers are released when the guard drops,
//! on every exit path.

use meshkernel_sys::GeometryListNative;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::scoped::ScopedBuffer;

/// The two reserved sentinel doubles of the kernel boundary.
///
/// Fetched from the kernel once per [`crate::MeshKernel`] and applied
/// uniformly; operations never hard-code them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Separators {
    /// Missing value, and boundary between independent sub-sequences.
    pub geometry: f64,
    /// Boundary between the outer ring and inner ring(s) of one polygon.
    pub inner_outer: f64,
}

/// One closed polygon ring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Ring {
    /// Ring from coordinate pairs.
    #[must_use]
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self {
            x: points.iter().map(|p| p.0).collect(),
            y: points.iter().map(|p| p.1).collect(),
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the ring has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// A polygon: one outer ring and any number of inner (hole) rings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub outer: Ring,
    pub inner: Vec<Ring>,
}

impl Polygon {
    /// Polygon without holes.
    #[must_use]
    pub fn simple(outer: Ring) -> Self {
        Self {
            outer,
            inner: Vec::new(),
        }
    }
}

/// Ordered coordinate triples plus the two sentinel separators.
///
/// Invariant: the three channels always have equal length. Constructors
/// enforce it, together with finiteness of every entry, before anything is
/// allocated on the foreign side.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryList {
    x: Vec<f64>,
    y: Vec<f64>,
    values: Vec<f64>,
    separators: Separators,
}

impl GeometryList {
    /// List with no coordinates, used where the kernel accepts an empty
    /// polygon selection.
    #[must_use]
    pub fn empty(separators: Separators) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            values: Vec::new(),
            separators,
        }
    }

    /// List from x/y coordinates with a zeroed values channel.
    pub fn from_coordinates(x: Vec<f64>, y: Vec<f64>, separators: Separators) -> Result<Self> {
        let values = vec![0.0; x.len()];
        Self::with_values(x, y, values, separators)
    }

    /// List from all three channels.
    ///
    /// Rejects unequal channel lengths and non-finite entries with
    /// [`KernelError::InvalidInput`]; nothing is allocated on rejection.
    pub fn with_values(
        x: Vec<f64>,
        y: Vec<f64>,
        values: Vec<f64>,
        separators: Separators,
    ) -> Result<Self> {
        if x.len() != y.len() || x.len() != values.len() {
            return Err(KernelError::invalid_input(
                "geometry list",
                format!(
                    "channel lengths differ: x={}, y={}, values={}",
                    x.len(),
                    y.len(),
                    values.len()
                ),
            ));
        }
        for channel in [&x, &y, &values] {
            if let Some(bad) = channel.iter().find(|v| !v.is_finite()) {
                return Err(KernelError::invalid_input(
                    "geometry list",
                    format!("non-finite coordinate {bad}"),
                ));
            }
        }
        Ok(Self {
            x,
            y,
            values,
            separators,
        })
    }

    /// Single point, for nearest-edge style queries.
    pub fn from_point(x: f64, y: f64, separators: Separators) -> Result<Self> {
        Self::from_coordinates(vec![x], vec![y], separators)
    }

    /// Flatten polygons into one list: polygons joined by the geometry
    /// separator, the rings of one polygon joined by the inner-outer
    /// separator. The sentinel is written into all three channels.
    #[must_use]
    pub fn from_polygons(polygons: &[Polygon], separators: Separators) -> Self {
        let mut list = Self::empty(separators);
        for (p, polygon) in polygons.iter().enumerate() {
            if p > 0 {
                list.push_separator(separators.geometry);
            }
            list.push_ring(&polygon.outer);
            for ring in &polygon.inner {
                list.push_separator(separators.inner_outer);
                list.push_ring(ring);
            }
        }
        list
    }

    fn push_ring(&mut self, ring: &Ring) {
        self.x.extend_from_slice(&ring.x);
        self.y.extend_from_slice(&ring.y);
        self.values.extend(std::iter::repeat(0.0).take(ring.len()));
    }

    fn push_separator(&mut self, separator: f64) {
        self.x.push(separator);
        self.y.push(separator);
        self.values.push(separator);
    }

    /// Number of coordinate entries, separators included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The sentinel pair this list was built with.
    #[must_use]
    pub fn separators(&self) -> Separators {
        self.separators
    }

    /// X channel.
    #[must_use]
    pub fn x_coordinates(&self) -> &[f64] {
        &self.x
    }

    /// Y channel.
    #[must_use]
    pub fn y_coordinates(&self) -> &[f64] {
        &self.y
    }

    /// The raw values channel.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values channel read as z-coordinates.
    #[must_use]
    pub fn z_coordinates(&self) -> &[f64] {
        &self.values
    }

    /// Values channel read as per-edge orthogonality.
    #[must_use]
    pub fn orthogonality_values(&self) -> &[f64] {
        &self.values
    }

    /// Values channel read as per-edge smoothness.
    #[must_use]
    pub fn smoothness_values(&self) -> &[f64] {
        &self.values
    }

    /// Values channel read as a 0.0/1.0 inclusion mask.
    #[must_use]
    pub fn selection_mask(&self) -> &[f64] {
        &self.values
    }

    /// Indices whose mask entry is set.
    #[must_use]
    pub fn selected_indices(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == 1.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reconstruct polygon structure by splitting at the sentinels.
    ///
    /// The inverse of [`GeometryList::from_polygons`] for lists that carry
    /// polygon data.
    #[must_use]
    pub fn polygons(&self) -> Vec<Polygon> {
        let mut polygons = Vec::new();
        let mut current = Polygon::default();
        let mut ring = Ring::default();
        let mut seen_outer = false;

        let close_ring = |polygon: &mut Polygon, ring: &mut Ring, seen_outer: &mut bool| {
            let finished = std::mem::take(ring);
            if *seen_outer {
                polygon.inner.push(finished);
            } else {
                polygon.outer = finished;
                *seen_outer = true;
            }
        };

        for i in 0..self.x.len() {
            let x = self.x[i];
            if x == self.separators.geometry {
                close_ring(&mut current, &mut ring, &mut seen_outer);
                polygons.push(std::mem::take(&mut current));
                seen_outer = false;
            } else if x == self.separators.inner_outer {
                close_ring(&mut current, &mut ring, &mut seen_outer);
            } else {
                ring.x.push(x);
                ring.y.push(self.y[i]);
            }
        }
        if !ring.is_empty() || seen_outer {
            close_ring(&mut current, &mut ring, &mut seen_outer);
            polygons.push(current);
        }
        polygons
    }
}

/// A geometry list packed for the boundary: three scoped foreign buffers and
/// the native descriptor pointing into them.
///
/// The buffers live exactly as long as the guard; dropping it releases them
/// whether the native call succeeded, failed, or was never reached.
#[derive(Debug)]
pub(crate) struct PackedGeometry {
    x: ScopedBuffer<f64>,
    y: ScopedBuffer<f64>,
    values: ScopedBuffer<f64>,
    native: GeometryListNative,
    separators: Separators,
}

impl PackedGeometry {
    /// Pack an input list. Channel allocation only happens after the list
    /// has been validated by its constructor.
    pub fn pack(list: &GeometryList) -> Result<Self> {
        let x = ScopedBuffer::from_slice(list.x_coordinates())?;
        let y = ScopedBuffer::from_slice(list.y_coordinates())?;
        let values = ScopedBuffer::from_slice(list.values())?;
        Ok(Self::assemble(x, y, values, list.len(), list.separators()))
    }

    /// Zero-filled output slot of `capacity` entries.
    pub fn output(capacity: usize, separators: Separators) -> Result<Self> {
        let x = ScopedBuffer::zeroed(capacity)?;
        let y = ScopedBuffer::zeroed(capacity)?;
        let values = ScopedBuffer::zeroed(capacity)?;
        Ok(Self::assemble(x, y, values, capacity, separators))
    }

    fn assemble(
        mut x: ScopedBuffer<f64>,
        mut y: ScopedBuffer<f64>,
        mut values: ScopedBuffer<f64>,
        count: usize,
        separators: Separators,
    ) -> Self {
        let native = GeometryListNative {
            geometry_separator: separators.geometry,
            inner_outer_separator: separators.inner_outer,
            num_coordinates: count as i32,
            x_coordinates: x.as_mut_ptr(),
            y_coordinates: y.as_mut_ptr(),
            values: values.as_mut_ptr(),
        };
        Self {
            x,
            y,
            values,
            native,
            separators,
        }
    }

    /// Descriptor pointer for input parameters.
    pub fn native_ptr(&self) -> *const GeometryListNative {
        &self.native
    }

    /// Descriptor pointer for output parameters; the kernel may rewrite the
    /// count to the number of entries it produced.
    pub fn native_mut_ptr(&mut self) -> *mut GeometryListNative {
        &mut self.native
    }

    /// Entries currently declared by the descriptor.
    pub fn count(&self) -> usize {
        self.native.num_coordinates.max(0) as usize
    }

    /// Copy the buffers back into an owned list, honoring a count the kernel
    /// may have shrunk below the allocated capacity.
    pub fn unpack(&self) -> GeometryList {
        let count = self.count();
        GeometryList {
            x: self.x.to_vec_truncated(count),
            y: self.y.to_vec_truncated(count),
            values: self.values.to_vec_truncated(count),
            separators: self.separators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SEPS: Separators = Separators {
        geometry: -999.0,
        inner_outer: -998.0,
    };

    fn square(offset: f64, size: f64) -> Ring {
        Ring::from_points(&[
            (offset, offset),
            (offset + size, offset),
            (offset + size, offset + size),
            (offset, offset + size),
        ])
    }

    #[test]
    fn pack_unpack_round_trip() {
        let list = GeometryList::with_values(
            vec![0.0, 1.0, 2.0],
            vec![3.0, 4.0, 5.0],
            vec![6.0, 7.0, 8.0],
            SEPS,
        )
        .unwrap();

        let packed = PackedGeometry::pack(&list).unwrap();
        assert_eq!(packed.count(), 3);
        assert_eq!(packed.unpack(), list);
    }

    #[test]
    fn packed_descriptor_matches_declared_count() {
        let list =
            GeometryList::from_coordinates(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], SEPS)
                .unwrap();
        let packed = PackedGeometry::pack(&list).unwrap();
        let native = unsafe { *packed.native_ptr() };
        assert_eq!(native.num_coordinates, 3);
        assert!(!native.x_coordinates.is_null());
        assert!(!native.y_coordinates.is_null());
        assert!(!native.values.is_null());
    }

    #[test]
    fn unequal_channels_rejected() {
        let result = GeometryList::with_values(vec![0.0, 1.0], vec![0.0], vec![0.0, 0.0], SEPS);
        assert!(matches!(result, Err(KernelError::InvalidInput { .. })));
    }

    #[test]
    fn non_finite_coordinate_rejected() {
        let result = GeometryList::from_coordinates(vec![0.0, f64::NAN], vec![0.0, 1.0], SEPS);
        assert!(matches!(result, Err(KernelError::InvalidInput { .. })));
    }

    #[test]
    fn separator_written_to_all_channels() {
        let polygons = [
            Polygon::simple(square(0.0, 1.0)),
            Polygon::simple(square(5.0, 1.0)),
        ];
        let list = GeometryList::from_polygons(&polygons, SEPS);
        assert_eq!(list.len(), 9);
        assert_eq!(list.x_coordinates()[4], SEPS.geometry);
        assert_eq!(list.y_coordinates()[4], SEPS.geometry);
        assert_eq!(list.values()[4], SEPS.geometry);
    }

    #[test]
    fn donut_splits_into_two_rings() {
        let donut = Polygon {
            outer: square(0.0, 10.0),
            inner: vec![square(4.0, 2.0)],
        };
        let list = GeometryList::from_polygons(&[donut.clone()], SEPS);

        let polygons = list.polygons();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].inner.len(), 1);
        assert_eq!(polygons[0], donut);
    }

    #[test]
    fn multiple_polygons_round_trip() {
        let polygons = vec![
            Polygon {
                outer: square(0.0, 10.0),
                inner: vec![square(2.0, 1.0), square(6.0, 1.0)],
            },
            Polygon::simple(square(20.0, 5.0)),
        ];
        let list = GeometryList::from_polygons(&polygons, SEPS);
        assert_eq!(list.polygons(), polygons);
    }

    #[test]
    fn multiplexed_accessors_share_storage() {
        let list = GeometryList::with_values(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.5, 1.0],
            SEPS,
        )
        .unwrap();
        assert_eq!(list.z_coordinates(), list.values());
        assert_eq!(list.orthogonality_values(), list.values());
        assert_eq!(list.smoothness_values(), list.values());
        assert_eq!(list.selection_mask(), list.values());
        assert_eq!(list.selected_indices(), vec![1]);
    }

    #[test]
    fn output_slot_reports_kernel_shrunk_count() {
        let mut packed = PackedGeometry::output(10, SEPS).unwrap();
        // A kernel writing fewer entries than capacity rewrites the count.
        unsafe { (*packed.native_mut_ptr()).num_coordinates = 4 };
        let list = packed.unpack();
        assert_eq!(list.len(), 4);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pack_unpack_round_trips_any_finite_channels(
                x in prop::collection::vec(-1e9f64..1e9, 0..64)
            ) {
                let y: Vec<f64> = x.iter().map(|v| v + 0.5).collect();
                let values: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
                let list =
                    GeometryList::with_values(x, y, values, SEPS).unwrap();
                let packed = PackedGeometry::pack(&list).unwrap();
                prop_assert_eq!(packed.unpack(), list);
            }

            #[test]
            fn packed_count_always_equals_input_length(
                x in prop::collection::vec(-1e3f64..1e3, 0..64)
            ) {
                let list =
                    GeometryList::from_coordinates(x.clone(), x, SEPS).unwrap();
                let packed = PackedGeometry::pack(&list).unwrap();
                prop_assert_eq!(packed.count(), list.len());
            }
        }
    }
}
