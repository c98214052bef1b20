//! Restriction operators between global (L-vector) and per-element (E-vector) layouts.
//!
//! A global vector stores one value per unique degree of freedom. An element vector stores one
//! contiguous block per element, so values at DOFs shared by several elements are duplicated.
//! [`ElementRestriction`] maps between the two layouts in both directions and keeps both views of
//! the element-DOF incidence relation:
//!
//! - the *gather map*, which for every element slot stores the (oriented) global DOF, and
//! - the *incidence* (`offsets`/`indices`), which for every global DOF lists all (oriented)
//!   element slots that reference it.
//!
//! The batched CSR assembler in [`assembly`](crate::assembly) consumes both views.
use crate::dof::{apply_flip, SignedDof};
use crate::error::{check_len, AssemblyError};
use itertools::Itertools;
use nalgebra::{DVector, RealField};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

mod face;
mod l2;
mod lexicographic;

pub use face::*;
pub use l2::*;
pub use lexicographic::*;

/// The maximum number of element occurrences of a single global DOF.
///
/// The assembly passes keep the list of elements sharing a DOF in fixed-size stack buffers of
/// this length. Restrictions with DOFs shared by more occurrences are rejected at construction.
pub const MAX_DOF_SHARING: usize = 16;

/// Ordering of the components of vector-valued fields in a global vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorOrdering {
    /// Component `c` of DOF `i` is stored at `i + c * num_dofs`.
    ByNodes,
    /// Component `c` of DOF `i` is stored at `i * vdim + c`.
    ByVdim,
}

impl Default for VectorOrdering {
    fn default() -> Self {
        Self::ByNodes
    }
}

/// Vector dimension and component ordering shared by element and face restrictions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ComponentLayout {
    pub vdim: usize,
    pub ordering: VectorOrdering,
}

impl ComponentLayout {
    pub fn scalar() -> Self {
        Self {
            vdim: 1,
            ordering: VectorOrdering::ByNodes,
        }
    }

    pub fn try_new(vdim: usize, ordering: VectorOrdering) -> Result<Self, AssemblyError> {
        if vdim == 0 {
            return Err(AssemblyError::InvalidConnectivity(
                "vector dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self { vdim, ordering })
    }

    /// Index of component `component` of DOF `dof` in a global vector.
    #[inline]
    pub fn global_index(&self, num_dofs: usize, dof: usize, component: usize) -> usize {
        match self.ordering {
            VectorOrdering::ByNodes => dof + component * num_dofs,
            VectorOrdering::ByVdim => dof * self.vdim + component,
        }
    }

    /// Inverse of [`global_index`](Self::global_index), returns `(dof, component)`.
    #[inline]
    pub fn split_global_index(&self, num_dofs: usize, index: usize) -> (usize, usize) {
        match self.ordering {
            VectorOrdering::ByNodes => (index % num_dofs, index / num_dofs),
            VectorOrdering::ByVdim => (index / self.vdim, index % self.vdim),
        }
    }
}

/// The transposed view of a scatter map: for every global DOF, all oriented positions that
/// reference it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Incidence {
    pub offsets: Vec<usize>,
    pub indices: Vec<SignedDof>,
}

impl Incidence {
    /// Builds the incidence by counting sort. Occurrences of a DOF are ordered by position.
    pub fn from_positions(
        num_dofs: usize,
        positions: impl Clone + Iterator<Item = (usize, SignedDof)>,
    ) -> Result<Self, AssemblyError> {
        let mut counts = vec![0usize; num_dofs + 1];
        for (position, dof) in positions.clone() {
            if dof.index() >= num_dofs {
                return Err(AssemblyError::InvalidConnectivity(format!(
                    "position {} references DOF {}, but there are only {} DOFs",
                    position,
                    dof.index(),
                    num_dofs
                )));
            }
            counts[dof.index()] += 1;
        }

        let offsets = exclusive_prefix_sum(counts);
        let mut next = offsets.clone();
        let mut indices = vec![SignedDof::positive(usize::MAX); offsets[num_dofs]];
        for (position, dof) in positions {
            let slot = &mut next[dof.index()];
            indices[*slot] = dof.with_index(position);
            *slot += 1;
        }

        let incidence = Self { offsets, indices };
        incidence.check_sharing_bound()?;
        Ok(incidence)
    }

    pub fn check_sharing_bound(&self) -> Result<(), AssemblyError> {
        for (dof, (begin, end)) in self.offsets.iter().tuple_windows().enumerate() {
            let count = end - begin;
            if count > MAX_DOF_SHARING {
                return Err(AssemblyError::SharingBoundExceeded {
                    dof,
                    count,
                    max: MAX_DOF_SHARING,
                });
            }
        }
        Ok(())
    }

    /// Rejects connectivities in which an element references the same global DOF in more than
    /// one slot.
    pub fn check_distinct_within_elements(&self, dofs_per_element: usize) -> Result<(), AssemblyError> {
        for (dof, (&begin, &end)) in self.offsets.iter().tuple_windows().enumerate() {
            let occurrences = &self.indices[begin..end];
            for (i, first) in occurrences.iter().enumerate() {
                let element = first.index() / dofs_per_element;
                if let Some(second) = occurrences[i + 1..]
                    .iter()
                    .find(|other| other.index() / dofs_per_element == element)
                {
                    return Err(AssemblyError::InvalidConnectivity(format!(
                        "element {} references DOF {} in both slot {} and slot {}",
                        element,
                        dof,
                        first.index() % dofs_per_element,
                        second.index() % dofs_per_element
                    )));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn occurrences(&self, dof: usize) -> &[SignedDof] {
        &self.indices[self.offsets[dof]..self.offsets[dof + 1]]
    }
}

/// Converts counts into an exclusive prefix sum. The last entry must be a placeholder for the
/// total, which is written into it.
pub(crate) fn exclusive_prefix_sum(mut counts: Vec<usize>) -> Vec<usize> {
    let mut sum = 0;
    for entry in counts.iter_mut() {
        let count = *entry;
        *entry = sum;
        sum += count;
    }
    counts
}

/// Maps between global vectors and per-element vectors.
///
/// See the [module documentation](self) for the layout of the connectivity. Element vectors are
/// laid out with the element slot running fastest, then the vector component, then the element,
/// i.e. component `c` of slot `a` in element `e` is stored at
/// `a + dofs_per_element * (c + vdim * e)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRestriction {
    num_elements: usize,
    dofs_per_element: usize,
    num_dofs: usize,
    layout: ComponentLayout,
    gather_map: Vec<SignedDof>,
    incidence: Incidence,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TransposeMode {
    Signed,
    Unsigned,
    Assign,
}

impl ElementRestriction {
    /// Constructs a scalar restriction from its gather map, deriving the incidence structure.
    ///
    /// `gather_map[e * dofs_per_element + a]` is the oriented global DOF of local slot `a` in
    /// element `e`.
    pub fn try_from_gather_map(
        num_dofs: usize,
        dofs_per_element: usize,
        gather_map: Vec<SignedDof>,
    ) -> Result<Self, AssemblyError> {
        let num_elements = num_elements_for(dofs_per_element, gather_map.len())?;
        let incidence = Incidence::from_positions(num_dofs, gather_map.iter().copied().enumerate())?;
        incidence.check_distinct_within_elements(dofs_per_element)?;
        Ok(Self {
            num_elements,
            dofs_per_element,
            num_dofs,
            layout: ComponentLayout::scalar(),
            gather_map,
            incidence,
        })
    }

    /// Same as [`try_from_gather_map`](Self::try_from_gather_map), but with the gather map given
    /// in the packed encoding (see [`SignedDof::from_packed`]).
    pub fn try_from_packed_gather_map(
        num_dofs: usize,
        dofs_per_element: usize,
        packed_gather_map: &[i64],
    ) -> Result<Self, AssemblyError> {
        let gather_map = packed_gather_map
            .iter()
            .map(|&packed| SignedDof::from_packed(packed))
            .collect();
        Self::try_from_gather_map(num_dofs, dofs_per_element, gather_map)
    }

    /// Constructs a scalar restriction from a gather map and an externally computed incidence
    /// structure.
    ///
    /// The incidence is validated to be the exact inverse view of the gather map: every
    /// occurrence `indices[k]` with `offsets[g] <= k < offsets[g + 1]` must point to a gather
    /// map entry holding DOF `g` with the same orientation, and every gather map entry must be
    /// referenced exactly once.
    pub fn try_from_parts(
        num_dofs: usize,
        dofs_per_element: usize,
        gather_map: Vec<SignedDof>,
        offsets: Vec<usize>,
        indices: Vec<SignedDof>,
    ) -> Result<Self, AssemblyError> {
        let num_elements = num_elements_for(dofs_per_element, gather_map.len())?;
        check_len("incidence offsets", num_dofs + 1, offsets.len())?;
        check_len("incidence indices", gather_map.len(), indices.len())?;

        if offsets[0] != 0 {
            return Err(AssemblyError::InvalidConnectivity(
                "first incidence offset must be zero".to_string(),
            ));
        }
        if offsets.iter().tuple_windows().any(|(prev, next)| prev > next) {
            return Err(AssemblyError::InvalidConnectivity(
                "incidence offsets must be non-decreasing".to_string(),
            ));
        }
        check_len("last incidence offset", indices.len(), offsets[num_dofs])?;

        let mut referenced = vec![false; gather_map.len()];
        for (dof, (&begin, &end)) in offsets.iter().tuple_windows().enumerate() {
            for occurrence in &indices[begin..end] {
                let position = occurrence.index();
                let expected = occurrence.with_index(dof);
                match gather_map.get(position) {
                    Some(entry) if *entry == expected && !referenced[position] => referenced[position] = true,
                    _ => {
                        return Err(AssemblyError::InvalidConnectivity(format!(
                            "occurrence {:?} of DOF {} does not match the gather map",
                            occurrence, dof
                        )))
                    }
                }
            }
        }

        let incidence = Incidence { offsets, indices };
        incidence.check_sharing_bound()?;
        incidence.check_distinct_within_elements(dofs_per_element)?;
        Ok(Self {
            num_elements,
            dofs_per_element,
            num_dofs,
            layout: ComponentLayout::scalar(),
            gather_map,
            incidence,
        })
    }

    /// Turns the restriction into a restriction for a vector field with `vdim` components.
    pub fn with_vector_dimension(mut self, vdim: usize, ordering: VectorOrdering) -> Result<Self, AssemblyError> {
        self.layout = ComponentLayout::try_new(vdim, ordering)?;
        Ok(self)
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn dofs_per_element(&self) -> usize {
        self.dofs_per_element
    }

    /// The number of (scalar) global DOFs.
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn vdim(&self) -> usize {
        self.layout.vdim
    }

    pub fn ordering(&self) -> VectorOrdering {
        self.layout.ordering
    }

    /// Length of global vectors, `num_dofs * vdim`.
    pub fn global_size(&self) -> usize {
        self.num_dofs * self.layout.vdim
    }

    /// Length of element vectors, `num_elements * dofs_per_element * vdim`.
    pub fn element_size(&self) -> usize {
        self.gather_map.len() * self.layout.vdim
    }

    pub fn gather_map(&self) -> &[SignedDof] {
        &self.gather_map
    }

    pub fn offsets(&self) -> &[usize] {
        &self.incidence.offsets
    }

    /// Occurrences of all global DOFs, as oriented positions `element * dofs_per_element + slot`.
    pub fn indices(&self) -> &[SignedDof] {
        &self.incidence.indices
    }

    /// The oriented global DOFs of the given element.
    pub fn element_dofs(&self, element: usize) -> &[SignedDof] {
        let begin = element * self.dofs_per_element;
        &self.gather_map[begin..begin + self.dofs_per_element]
    }

    /// All oriented element positions referencing the given global DOF.
    pub fn occurrences(&self, dof: usize) -> &[SignedDof] {
        self.incidence.occurrences(dof)
    }

    /// The number of element occurrences of every global DOF.
    pub fn multiplicity(&self) -> Vec<usize> {
        self.incidence
            .offsets
            .iter()
            .tuple_windows()
            .map(|(begin, end)| end - begin)
            .collect()
    }

    /// The largest number of occurrences of a single global DOF.
    pub fn max_sharing(&self) -> usize {
        self.multiplicity().into_iter().max().unwrap_or(0)
    }

    /// Scatters a global vector into the element layout, negating values at flipped slots.
    pub fn to_element_layout<T: RealField>(&self, global: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut element = DVector::zeros(self.element_size());
        self.to_element_layout_into(global, element.as_mut_slice())?;
        Ok(element)
    }

    pub fn to_element_layout_into<T: RealField>(&self, global: &[T], element: &mut [T]) -> Result<(), AssemblyError> {
        check_len("global vector", self.global_size(), global.len())?;
        check_len("element vector", self.element_size(), element.len())?;
        if element.is_empty() {
            return Ok(());
        }

        let dofs_per_element = self.dofs_per_element;
        let layout = self.layout;
        element
            .par_chunks_mut(dofs_per_element * layout.vdim)
            .enumerate()
            .for_each(|(e, block)| {
                let element_dofs = &self.gather_map[e * dofs_per_element..(e + 1) * dofs_per_element];
                for c in 0..layout.vdim {
                    for (a, dof) in element_dofs.iter().enumerate() {
                        let value = global[layout.global_index(self.num_dofs, dof.index(), c)].clone();
                        block[a + dofs_per_element * c] = dof.apply(value);
                    }
                }
            });
        Ok(())
    }

    /// Sums the (sign-corrected) element contributions of every global DOF.
    ///
    /// This is the transpose of [`to_element_layout`](Self::to_element_layout).
    pub fn to_global_layout<T: RealField>(&self, element: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut global = DVector::zeros(self.global_size());
        self.to_global_layout_into(element, global.as_mut_slice())?;
        Ok(global)
    }

    pub fn to_global_layout_into<T: RealField>(&self, element: &[T], global: &mut [T]) -> Result<(), AssemblyError> {
        self.transpose_into(element, global, TransposeMode::Signed)
    }

    /// Like [`to_global_layout`](Self::to_global_layout), but ignores orientations.
    pub fn to_global_layout_unsigned<T: RealField>(&self, element: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut global = DVector::zeros(self.global_size());
        self.transpose_into(element, global.as_mut_slice(), TransposeMode::Unsigned)?;
        Ok(global)
    }

    /// Left inverse of [`to_element_layout`](Self::to_element_layout).
    ///
    /// Every global DOF takes the sign-corrected value of its last occurrence instead of the
    /// sum over all occurrences. DOFs without occurrences are set to zero.
    pub fn to_global_layout_assign<T: RealField>(&self, element: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut global = DVector::zeros(self.global_size());
        self.transpose_into(element, global.as_mut_slice(), TransposeMode::Assign)?;
        Ok(global)
    }

    fn transpose_into<T: RealField>(
        &self,
        element: &[T],
        global: &mut [T],
        mode: TransposeMode,
    ) -> Result<(), AssemblyError> {
        check_len("element vector", self.element_size(), element.len())?;
        check_len("global vector", self.global_size(), global.len())?;

        let dofs_per_element = self.dofs_per_element;
        let layout = self.layout;
        let num_dofs = self.num_dofs;
        global.par_iter_mut().enumerate().for_each(|(index, value)| {
            let (dof, c) = layout.split_global_index(num_dofs, index);
            let occurrences = self.incidence.occurrences(dof);
            let element_value = |occurrence: &SignedDof| {
                let position = occurrence.index();
                let (e, a) = (position / dofs_per_element, position % dofs_per_element);
                element[a + dofs_per_element * (c + layout.vdim * e)].clone()
            };
            *value = match mode {
                TransposeMode::Signed => occurrences
                    .iter()
                    .fold(T::zero(), |sum, occ| sum + occ.apply(element_value(occ))),
                TransposeMode::Unsigned => occurrences
                    .iter()
                    .fold(T::zero(), |sum, occ| sum + element_value(occ)),
                TransposeMode::Assign => occurrences
                    .last()
                    .map(|occ| apply_flip(occ.is_flipped(), element_value(occ)))
                    .unwrap_or_else(T::zero),
            };
        });
        Ok(())
    }
}

fn num_elements_for(dofs_per_element: usize, gather_map_len: usize) -> Result<usize, AssemblyError> {
    if dofs_per_element == 0 {
        if gather_map_len == 0 {
            Ok(0)
        } else {
            Err(AssemblyError::InvalidConnectivity(
                "non-empty gather map with zero DOFs per element".to_string(),
            ))
        }
    } else if gather_map_len % dofs_per_element != 0 {
        Err(AssemblyError::InvalidConnectivity(format!(
            "gather map length {} is not a multiple of {} DOFs per element",
            gather_map_len, dofs_per_element
        )))
    } else {
        Ok(gather_map_len / dofs_per_element)
    }
}
