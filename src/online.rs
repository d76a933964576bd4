//! Small dense algebraic objects of the online stage.
//!
//! Reduced operators and solutions live in spaces spanned by a handful of basis functions. For
//! multi-field problems the reduced space is a concatenation of blocks, one per named component
//! (e.g. velocity, pressure, supremizer); [`OnlineSize`] describes that layout and
//! [`BasisComponents`] records which basis component each block corresponds to.
use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use rbnics_traits::LinearCombination;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Dimension of an online object along one axis.
///
/// Two blocked sizes are equal only if they list the same blocks in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OnlineSize {
    /// A single block of the given size.
    Monolithic(usize),
    /// Contiguous blocks, one per component, laid out in map order.
    Blocks(IndexMap<String, usize>),
}

impl PartialEq for OnlineSize {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OnlineSize::Monolithic(a), OnlineSize::Monolithic(b)) => a == b,
            (OnlineSize::Blocks(a), OnlineSize::Blocks(b)) => a.iter().eq(b.iter()),
            _ => false,
        }
    }
}

impl Eq for OnlineSize {}

impl From<usize> for OnlineSize {
    fn from(n: usize) -> Self {
        OnlineSize::Monolithic(n)
    }
}

impl OnlineSize {
    pub fn blocks<S: Into<String>>(sizes: impl IntoIterator<Item = (S, usize)>) -> Self {
        OnlineSize::Blocks(sizes.into_iter().map(|(name, n)| (name.into(), n)).collect())
    }

    /// Total number of entries along this axis.
    pub fn total(&self) -> usize {
        match self {
            OnlineSize::Monolithic(n) => *n,
            OnlineSize::Blocks(sizes) => sizes.values().sum(),
        }
    }

    pub fn as_blocks(&self) -> Option<&IndexMap<String, usize>> {
        match self {
            OnlineSize::Monolithic(_) => None,
            OnlineSize::Blocks(sizes) => Some(sizes),
        }
    }

    /// Index ranges of each block. A monolithic size has no named blocks.
    pub fn block_ranges(&self) -> IndexMap<String, Range<usize>> {
        let mut ranges = IndexMap::new();
        if let OnlineSize::Blocks(sizes) = self {
            let mut offset = 0;
            for (name, &n) in sizes {
                ranges.insert(name.clone(), offset..offset + n);
                offset += n;
            }
        }
        ranges
    }

    /// Selects the leading entries described by `request`.
    ///
    /// A monolithic request keeps the first `n` entries (of the only block, if blocked). A
    /// blocked request keeps the first `n_c` entries of every block `c`; blocks requested with
    /// size zero are dropped. Returns the selected indices together with the resulting size.
    ///
    /// # Panics
    ///
    /// Panics if the request asks for more entries than available, or for components that are
    /// not present.
    pub fn restriction(&self, request: &OnlineSize) -> (Vec<usize>, OnlineSize) {
        match (self, request) {
            (OnlineSize::Monolithic(n), OnlineSize::Monolithic(m)) => {
                assert!(m <= n, "Cannot restrict a dimension of size {n} to size {m}.");
                ((0..*m).collect(), OnlineSize::Monolithic(*m))
            }
            (OnlineSize::Blocks(sizes), OnlineSize::Monolithic(m)) => {
                assert_eq!(
                    sizes.len(),
                    1,
                    "An integer restriction of a blocked dimension requires exactly one block."
                );
                let (name, n) = sizes.first().expect("Exactly one block is present");
                assert!(m <= n, "Cannot restrict block {name} of size {n} to size {m}.");
                ((0..*m).collect(), OnlineSize::blocks([(name.clone(), *m)]))
            }
            (OnlineSize::Blocks(sizes), OnlineSize::Blocks(requested)) => {
                for name in requested.keys() {
                    assert!(sizes.contains_key(name), "Component {name} is not present.");
                }
                let mut indices = Vec::new();
                let mut restricted = IndexMap::new();
                for (name, range) in self.block_ranges() {
                    let m = requested.get(&name).copied().unwrap_or(0);
                    if m > 0 {
                        assert!(
                            m <= range.len(),
                            "Cannot restrict block {name} of size {} to size {m}.",
                            range.len()
                        );
                        indices.extend(range.start..range.start + m);
                        restricted.insert(name, m);
                    }
                }
                (indices, OnlineSize::Blocks(restricted))
            }
            (OnlineSize::Monolithic(_), OnlineSize::Blocks(_)) => {
                panic!("Cannot restrict a monolithic dimension by components.")
            }
        }
    }
}

/// Auxiliary maps relating the blocks of a reduced space to the basis components they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisComponents {
    index_to_name: BTreeMap<usize, String>,
    name_to_index: BTreeMap<String, usize>,
    name_to_length: BTreeMap<String, usize>,
}

impl BasisComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers basis component `index`, called `name`, spanned by `length` basis functions.
    pub fn insert(&mut self, index: usize, name: impl Into<String>, length: usize) {
        let name = name.into();
        self.index_to_name.insert(index, name.clone());
        self.name_to_index.insert(name.clone(), index);
        self.name_to_length.insert(name, length);
    }

    pub fn with(mut self, index: usize, name: impl Into<String>, length: usize) -> Self {
        self.insert(index, name, length);
        self
    }

    pub fn index_to_name(&self) -> &BTreeMap<usize, String> {
        &self.index_to_name
    }

    pub fn name_to_index(&self) -> &BTreeMap<String, usize> {
        &self.name_to_index
    }

    pub fn name_to_length(&self) -> &BTreeMap<String, usize> {
        &self.name_to_length
    }

    /// The bookkeeping of the components that are blocks of `size`. A monolithic size keeps
    /// everything.
    pub fn restricted_to(&self, size: &OnlineSize) -> BasisComponents {
        match size {
            OnlineSize::Monolithic(_) => self.clone(),
            OnlineSize::Blocks(blocks) => {
                let mut restricted = BasisComponents::new();
                let kept = self
                    .index_to_name
                    .iter()
                    .filter(|(_, name)| blocks.contains_key(name.as_str()));
                for (&index, name) in kept {
                    if let Some(&length) = self.name_to_length.get(name) {
                        restricted.insert(index, name.clone(), length);
                    }
                }
                restricted
            }
        }
    }

    /// Returns `true` if every entry of `self` is also an entry of `other`.
    pub fn is_restriction_of(&self, other: &BasisComponents) -> bool {
        fn contained<K: Ord, V: PartialEq>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> bool {
            a.iter().all(|(key, value)| b.get(key) == Some(value))
        }
        contained(&self.index_to_name, &other.index_to_name)
            && contained(&self.name_to_index, &other.name_to_index)
            && contained(&self.name_to_length, &other.name_to_length)
    }

    /// Returns `true` if `self` and `other` agree on every key they share.
    pub fn is_compatible_with(&self, other: &BasisComponents) -> bool {
        fn agree<K: Ord, V: PartialEq>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> bool {
            a.iter()
                .all(|(key, value)| b.get(key).map_or(true, |other_value| other_value == value))
        }
        agree(&self.index_to_name, &other.index_to_name)
            && agree(&self.name_to_index, &other.name_to_index)
            && agree(&self.name_to_length, &other.name_to_length)
    }
}

/// A dense reduced vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineVector {
    content: DVector<f64>,
    size: OnlineSize,
    components: Option<BasisComponents>,
}

impl OnlineVector {
    /// The zero vector of the given size.
    pub fn zeros(size: impl Into<OnlineSize>) -> Self {
        let size = size.into();
        Self {
            content: DVector::zeros(size.total()),
            size,
            components: None,
        }
    }

    pub fn from_vector(content: DVector<f64>) -> Self {
        let size = OnlineSize::Monolithic(content.len());
        Self {
            content,
            size,
            components: None,
        }
    }

    /// # Panics
    ///
    /// Panics if the total size does not match the length of `content`.
    pub fn from_vector_with_size(content: DVector<f64>, size: impl Into<OnlineSize>) -> Self {
        let size = size.into();
        assert_eq!(size.total(), content.len(), "Size must match the length of the vector.");
        Self {
            content,
            size,
            components: None,
        }
    }

    pub fn with_components(mut self, components: BasisComponents) -> Self {
        self.components = Some(components);
        self
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn size(&self) -> &OnlineSize {
        &self.size
    }

    /// # Panics
    ///
    /// Panics if the new size has a different total length.
    pub fn set_size(&mut self, size: OnlineSize) {
        assert_eq!(size.total(), self.content.len(), "Size must match the length of the vector.");
        self.size = size;
    }

    pub fn content(&self) -> &DVector<f64> {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DVector<f64> {
        &mut self.content
    }

    pub fn components(&self) -> Option<&BasisComponents> {
        self.components.as_ref()
    }

    pub fn set_components(&mut self, components: Option<BasisComponents>) {
        self.components = components;
    }

    /// The leading part of the vector described by `size` (see [`OnlineSize::restriction`]).
    pub fn restrict(&self, size: &OnlineSize) -> OnlineVector {
        let (indices, restricted_size) = self.size.restriction(size);
        OnlineVector {
            content: self.content.select_rows(&indices),
            components: self
                .components
                .as_ref()
                .map(|components| components.restricted_to(&restricted_size)),
            size: restricted_size,
        }
    }
}

impl LinearCombination for OnlineVector {
    fn scaled(&self, alpha: f64) -> Self {
        OnlineVector {
            content: &self.content * alpha,
            size: self.size.clone(),
            components: self.components.clone(),
        }
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.size, other.size, "Online vectors must have the same size.");
        self.content.add_scaled(alpha, &other.content);
    }
}

/// A dense reduced matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineMatrix {
    content: DMatrix<f64>,
    size: (OnlineSize, OnlineSize),
    components: (Option<BasisComponents>, Option<BasisComponents>),
}

impl OnlineMatrix {
    pub fn zeros(rows: impl Into<OnlineSize>, cols: impl Into<OnlineSize>) -> Self {
        let (rows, cols) = (rows.into(), cols.into());
        Self {
            content: DMatrix::zeros(rows.total(), cols.total()),
            size: (rows, cols),
            components: (None, None),
        }
    }

    pub fn from_matrix(content: DMatrix<f64>) -> Self {
        let size = (
            OnlineSize::Monolithic(content.nrows()),
            OnlineSize::Monolithic(content.ncols()),
        );
        Self {
            content,
            size,
            components: (None, None),
        }
    }

    /// # Panics
    ///
    /// Panics if the sizes do not match the shape of `content`.
    pub fn from_matrix_with_size(
        content: DMatrix<f64>,
        rows: impl Into<OnlineSize>,
        cols: impl Into<OnlineSize>,
    ) -> Self {
        let (rows, cols) = (rows.into(), cols.into());
        assert_eq!(rows.total(), content.nrows(), "Row size must match the matrix.");
        assert_eq!(cols.total(), content.ncols(), "Column size must match the matrix.");
        Self {
            content,
            size: (rows, cols),
            components: (None, None),
        }
    }

    pub fn with_components(mut self, rows: BasisComponents, cols: BasisComponents) -> Self {
        self.components = (Some(rows), Some(cols));
        self
    }

    pub fn nrows(&self) -> usize {
        self.content.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.content.ncols()
    }

    pub fn size(&self) -> &(OnlineSize, OnlineSize) {
        &self.size
    }

    pub fn content(&self) -> &DMatrix<f64> {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.content
    }

    pub fn components(&self) -> &(Option<BasisComponents>, Option<BasisComponents>) {
        &self.components
    }

    pub fn set_components(&mut self, components: (Option<BasisComponents>, Option<BasisComponents>)) {
        self.components = components;
    }

    /// The leading block described by `rows` and `cols` (see [`OnlineSize::restriction`]).
    pub fn restrict(&self, rows: &OnlineSize, cols: &OnlineSize) -> OnlineMatrix {
        let (row_indices, row_size) = self.size.0.restriction(rows);
        let (col_indices, col_size) = self.size.1.restriction(cols);
        OnlineMatrix {
            content: self
                .content
                .select_rows(&row_indices)
                .select_columns(&col_indices),
            components: (
                self.components.0.as_ref().map(|c| c.restricted_to(&row_size)),
                self.components.1.as_ref().map(|c| c.restricted_to(&col_size)),
            ),
            size: (row_size, col_size),
        }
    }
}

impl LinearCombination for OnlineMatrix {
    fn scaled(&self, alpha: f64) -> Self {
        OnlineMatrix {
            content: &self.content * alpha,
            size: self.size.clone(),
            components: self.components.clone(),
        }
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.size, other.size, "Online matrices must have the same size.");
        self.content.add_scaled(alpha, &other.content);
    }
}

/// A reduced solution: the coefficients of a function in a reduced basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineFunction {
    vector: OnlineVector,
}

impl OnlineFunction {
    pub fn zeros(size: impl Into<OnlineSize>) -> Self {
        Self {
            vector: OnlineVector::zeros(size),
        }
    }

    pub fn from_vector(vector: OnlineVector) -> Self {
        Self { vector }
    }

    pub fn vector(&self) -> &OnlineVector {
        &self.vector
    }

    pub fn vector_mut(&mut self) -> &mut OnlineVector {
        &mut self.vector
    }

    pub fn into_vector(self) -> OnlineVector {
        self.vector
    }
}
