use crate::error::{check_len, AssemblyError};

/// Maps the native (mesh-local) index of a DOF on a face to its lexicographic index.
///
/// Faces of tensor-product elements are numbered as follows: segments have faces `0..2` with a
/// single DOF, quadrilaterals have faces `0..4` with `size1d` DOFs and hexahedra have faces
/// `0..6` with `size1d * size1d` DOFs. In 2D, faces 2 and 3 traverse their DOFs in reverse
/// lexicographic order. In 3D, faces 1, 2 and 5 are already lexicographic, faces 3 and 4 are
/// reversed along their first direction, and face 0 is reversed along its second direction.
pub fn to_lexicographic_face_index(
    dim: usize,
    face_id: usize,
    size1d: usize,
    index: usize,
) -> Result<usize, AssemblyError> {
    let num_faces = match dim {
        1 => 2,
        2 => 4,
        3 => 6,
        _ => return Err(AssemblyError::UnsupportedDimension(dim)),
    };
    if face_id >= num_faces {
        return Err(AssemblyError::InvalidFaceId { dim, face_id });
    }
    let face_size = size1d.pow(dim as u32 - 1);
    if index >= face_size {
        return Err(AssemblyError::InvalidConnectivity(format!(
            "face DOF index {} out of range for a face with {} DOFs",
            index, face_size
        )));
    }

    let lex_index = match dim {
        1 => 0,
        2 => match face_id {
            2 | 3 => size1d - 1 - index,
            _ => index,
        },
        _ => {
            let (i, j) = (index % size1d, index / size1d);
            match face_id {
                1 | 2 | 5 => i + j * size1d,
                3 | 4 => (size1d - 1 - i) + j * size1d,
                _ => i + (size1d - 1 - j) * size1d,
            }
        }
    };
    Ok(lex_index)
}

/// The full native-to-lexicographic permutation of a face, `perm[native] = lexicographic`.
pub fn face_lexicographic_permutation(dim: usize, face_id: usize, size1d: usize) -> Result<Vec<usize>, AssemblyError> {
    if !(1..=3).contains(&dim) {
        return Err(AssemblyError::UnsupportedDimension(dim));
    }
    let face_size = size1d.pow(dim as u32 - 1);
    (0..face_size)
        .map(|index| to_lexicographic_face_index(dim, face_id, size1d, index))
        .collect()
}

/// Reorders per-face data given in native order into lexicographic order.
pub fn reorder_face_dofs_lexicographic<T: Clone>(
    dim: usize,
    face_id: usize,
    size1d: usize,
    native: &[T],
) -> Result<Vec<T>, AssemblyError> {
    let permutation = face_lexicographic_permutation(dim, face_id, size1d)?;
    check_len("native face DOFs", permutation.len(), native.len())?;
    let mut lexicographic = native.to_vec();
    for (native_index, &lex_index) in permutation.iter().enumerate() {
        lexicographic[lex_index] = native[native_index].clone();
    }
    Ok(lexicographic)
}
