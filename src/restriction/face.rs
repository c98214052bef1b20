use crate::dof::SignedDof;
use crate::error::{check_len, AssemblyError};
use crate::restriction::{reorder_face_dofs_lexicographic, ComponentLayout, Incidence, VectorOrdering};
use nalgebra::{DVector, RealField};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Selects which sides of a face appear in face vectors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceValues {
    /// Only the values of the primary adjacent element.
    Single,
    /// The values of both adjacent elements, primary side first.
    Double,
}

impl FaceValues {
    fn num_sides(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }
}

/// Maps between global vectors and per-face vectors.
///
/// Every face has a primary side and, unless it lies on the boundary, a secondary side. Each
/// side references `dofs_per_face` oriented global DOFs, already in lexicographic face order.
///
/// With [`FaceValues::Single`], component `c` of slot `a` on face `f` is stored at
/// `a + dofs_per_face * (c + vdim * f)`. With [`FaceValues::Double`] the sides of a face are
/// concatenated: side `s` is stored at `a + dofs_per_face * (c + vdim * (s + 2 * f))`, and a
/// missing secondary side reads as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceRestriction {
    num_faces: usize,
    dofs_per_face: usize,
    num_dofs: usize,
    layout: ComponentLayout,
    primary: Vec<SignedDof>,
    secondary: Vec<Option<SignedDof>>,
    // Positions refer to the double layout, (2 * face + side) * dofs_per_face + slot
    incidence: Incidence,
}

impl FaceRestriction {
    pub fn try_new(
        num_dofs: usize,
        dofs_per_face: usize,
        primary: Vec<SignedDof>,
        secondary: Vec<Option<SignedDof>>,
    ) -> Result<Self, AssemblyError> {
        check_len("secondary face DOFs", primary.len(), secondary.len())?;
        let num_faces = match dofs_per_face {
            0 if primary.is_empty() => 0,
            0 => {
                return Err(AssemblyError::InvalidConnectivity(
                    "non-empty face map with zero DOFs per face".to_string(),
                ))
            }
            n if primary.len() % n != 0 => {
                return Err(AssemblyError::InvalidConnectivity(format!(
                    "face map length {} is not a multiple of {} DOFs per face",
                    primary.len(),
                    n
                )))
            }
            n => primary.len() / n,
        };

        let double_position = |index: usize, side: usize| {
            let (face, slot) = (index / dofs_per_face, index % dofs_per_face);
            (2 * face + side) * dofs_per_face + slot
        };
        let positions = primary
            .iter()
            .enumerate()
            .map(move |(index, dof)| (double_position(index, 0), *dof))
            .chain(
                secondary
                    .iter()
                    .enumerate()
                    .filter_map(move |(index, dof)| dof.map(|dof| (double_position(index, 1), dof))),
            );
        let incidence = Incidence::from_positions(num_dofs, positions)?;

        Ok(Self {
            num_faces,
            dofs_per_face,
            num_dofs,
            layout: ComponentLayout::scalar(),
            primary,
            secondary,
            incidence,
        })
    }

    pub fn with_vector_dimension(mut self, vdim: usize, ordering: VectorOrdering) -> Result<Self, AssemblyError> {
        self.layout = ComponentLayout::try_new(vdim, ordering)?;
        Ok(self)
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    pub fn dofs_per_face(&self) -> usize {
        self.dofs_per_face
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn vdim(&self) -> usize {
        self.layout.vdim
    }

    pub fn global_size(&self) -> usize {
        self.num_dofs * self.layout.vdim
    }

    pub fn face_size(&self, values: FaceValues) -> usize {
        values.num_sides() * self.primary.len() * self.layout.vdim
    }

    pub fn primary_dofs(&self, face: usize) -> &[SignedDof] {
        &self.primary[face * self.dofs_per_face..(face + 1) * self.dofs_per_face]
    }

    pub fn secondary_dofs(&self, face: usize) -> &[Option<SignedDof>] {
        &self.secondary[face * self.dofs_per_face..(face + 1) * self.dofs_per_face]
    }

    /// Extracts face values from a global vector.
    pub fn to_face_layout<T: RealField>(&self, global: &[T], values: FaceValues) -> Result<DVector<T>, AssemblyError> {
        let mut face = DVector::zeros(self.face_size(values));
        self.to_face_layout_into(global, face.as_mut_slice(), values)?;
        Ok(face)
    }

    pub fn to_face_layout_into<T: RealField>(
        &self,
        global: &[T],
        face: &mut [T],
        values: FaceValues,
    ) -> Result<(), AssemblyError> {
        check_len("global vector", self.global_size(), global.len())?;
        check_len("face vector", self.face_size(values), face.len())?;
        if face.is_empty() {
            return Ok(());
        }

        let dofs = self.dofs_per_face;
        let layout = self.layout;
        let gather = |dof: &SignedDof, c: usize| {
            dof.apply(global[layout.global_index(self.num_dofs, dof.index(), c)].clone())
        };
        face.par_chunks_mut(values.num_sides() * dofs * layout.vdim)
            .enumerate()
            .for_each(|(f, block)| {
                for c in 0..layout.vdim {
                    for (a, dof) in self.primary_dofs(f).iter().enumerate() {
                        block[a + dofs * c] = gather(dof, c);
                    }
                    if values == FaceValues::Double {
                        for (a, dof) in self.secondary_dofs(f).iter().enumerate() {
                            block[a + dofs * (c + layout.vdim)] = dof
                                .as_ref()
                                .map(|dof| gather(dof, c))
                                .unwrap_or_else(T::zero);
                        }
                    }
                }
            });
        Ok(())
    }

    /// Sums the sign-corrected face contributions into a global vector.
    ///
    /// This is the transpose of [`to_face_layout`](Self::to_face_layout) for the same choice of
    /// `values`: with [`FaceValues::Single`], secondary sides do not contribute.
    pub fn to_global_layout<T: RealField>(&self, face: &[T], values: FaceValues) -> Result<DVector<T>, AssemblyError> {
        let mut global = DVector::zeros(self.global_size());
        self.to_global_layout_into(face, global.as_mut_slice(), values)?;
        Ok(global)
    }

    pub fn to_global_layout_into<T: RealField>(
        &self,
        face: &[T],
        global: &mut [T],
        values: FaceValues,
    ) -> Result<(), AssemblyError> {
        check_len("face vector", self.face_size(values), face.len())?;
        check_len("global vector", self.global_size(), global.len())?;

        let dofs = self.dofs_per_face;
        let layout = self.layout;
        let num_dofs = self.num_dofs;
        global.par_iter_mut().enumerate().for_each(|(index, value)| {
            let (dof, c) = layout.split_global_index(num_dofs, index);
            let mut sum = T::zero();
            for occurrence in self.incidence.occurrences(dof) {
                let position = occurrence.index();
                let (block, slot) = (position / dofs, position % dofs);
                let (f, side) = (block / 2, block % 2);
                let face_index = match values {
                    FaceValues::Single if side == 1 => continue,
                    FaceValues::Single => slot + dofs * (c + layout.vdim * f),
                    FaceValues::Double => slot + dofs * (c + layout.vdim * block),
                };
                sum += occurrence.apply(face[face_index].clone());
            }
            *value = sum;
        });
        Ok(())
    }
}

/// Incrementally builds a [`FaceRestriction`].
#[derive(Debug, Clone)]
pub struct FaceRestrictionBuilder {
    num_dofs: usize,
    dofs_per_face: usize,
    primary: Vec<SignedDof>,
    secondary: Vec<Option<SignedDof>>,
}

impl FaceRestrictionBuilder {
    pub fn new(num_dofs: usize, dofs_per_face: usize) -> Self {
        Self {
            num_dofs,
            dofs_per_face,
            primary: Vec::new(),
            secondary: Vec::new(),
        }
    }

    /// Adds a face whose DOFs are already in lexicographic order.
    pub fn add_face(
        &mut self,
        primary: &[SignedDof],
        secondary: Option<&[SignedDof]>,
    ) -> Result<&mut Self, AssemblyError> {
        check_len("primary face DOFs", self.dofs_per_face, primary.len())?;
        self.primary.extend_from_slice(primary);
        match secondary {
            Some(secondary) => {
                check_len("secondary face DOFs", self.dofs_per_face, secondary.len())?;
                self.secondary.extend(secondary.iter().copied().map(Some));
            }
            None => self
                .secondary
                .extend(std::iter::repeat(None).take(self.dofs_per_face)),
        }
        Ok(self)
    }

    /// Adds a face whose DOFs are given in the native numbering of the adjacent elements.
    ///
    /// Each side is given as `(face_id, dofs)`, where `face_id` is the local face index in the
    /// adjacent element. The DOFs are reordered lexicographically before they are stored.
    pub fn add_native_face(
        &mut self,
        dim: usize,
        size1d: usize,
        primary: (usize, &[SignedDof]),
        secondary: Option<(usize, &[SignedDof])>,
    ) -> Result<&mut Self, AssemblyError> {
        let primary = reorder_face_dofs_lexicographic(dim, primary.0, size1d, primary.1)?;
        let secondary = secondary
            .map(|(face_id, dofs)| reorder_face_dofs_lexicographic(dim, face_id, size1d, dofs))
            .transpose()?;
        self.add_face(&primary, secondary.as_deref())
    }

    pub fn build(self) -> Result<FaceRestriction, AssemblyError> {
        FaceRestriction::try_new(self.num_dofs, self.dofs_per_face, self.primary, self.secondary)
    }
}
