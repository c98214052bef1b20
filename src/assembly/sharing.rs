use crate::dof::SignedDof;
use crate::restriction::{ElementRestriction, MAX_DOF_SHARING};

/// An occurrence of a global DOF in an element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Occurrence {
    pub element: usize,
    /// The local slot in the element, with the orientation of the occurrence.
    pub slot: SignedDof,
}

impl Occurrence {
    const EMPTY: Self = Self {
        element: usize::MAX,
        slot: SignedDof::new(usize::MAX, false),
    };
}

/// The elements sharing a global DOF, stored on the stack.
///
/// The restriction guarantees that no DOF has more than [`MAX_DOF_SHARING`] occurrences.
#[derive(Debug, Clone)]
pub(crate) struct SharingList {
    len: usize,
    entries: [Occurrence; MAX_DOF_SHARING],
}

impl SharingList {
    pub fn gather(restriction: &ElementRestriction, dof: usize) -> Self {
        let occurrences = restriction.occurrences(dof);
        debug_assert!(occurrences.len() <= MAX_DOF_SHARING);
        let dofs_per_element = restriction.dofs_per_element();
        let mut entries = [Occurrence::EMPTY; MAX_DOF_SHARING];
        for (entry, occurrence) in entries.iter_mut().zip(occurrences) {
            let position = occurrence.index();
            *entry = Occurrence {
                element: position / dofs_per_element,
                slot: occurrence.with_index(position % dofs_per_element),
            };
        }
        Self {
            len: occurrences.len(),
            entries,
        }
    }

    pub fn as_slice(&self) -> &[Occurrence] {
        &self.entries[..self.len]
    }
}

/// The smallest element index that appears in both lists.
///
/// The element with this index is the unique owner of the deduplicated entry coupling the two
/// DOFs.
pub(crate) fn min_common_element(a: &SharingList, b: &SharingList) -> Option<usize> {
    let mut min_element = None;
    for occ_a in a.as_slice() {
        if min_element.map_or(false, |min| occ_a.element >= min) {
            continue;
        }
        if b.as_slice().iter().any(|occ_b| occ_b.element == occ_a.element) {
            min_element = Some(occ_a.element);
        }
    }
    min_element
}
