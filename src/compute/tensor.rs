//! Dense gene tensors.
//!
//! A [`Population`] is a `(pop_size, genes_x, genes_y)` tensor and an
//! [`Individual`] a `(genes_x, genes_y)` matrix. Both are stored flat in
//! row-major order, so gene `(x, y)` of individual `i` lives at
//! `i * genes_x * genes_y + x * genes_y + y`.

use serde::{Deserialize, Serialize};

/// Shape of a single individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneShape {
    pub genes_x: usize,
    pub genes_y: usize,
}

impl GeneShape {
    pub fn new(genes_x: usize, genes_y: usize) -> Self {
        Self { genes_x, genes_y }
    }

    /// Genes per individual.
    #[inline]
    pub fn len(&self) -> usize {
        self.genes_x * self.genes_y
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of gene `(x, y)` inside one individual.
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        x * self.genes_y + y
    }
}

/// One candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    shape: GeneShape,
    genes: Vec<f32>,
}

impl Individual {
    /// Wrap row-major genes. Returns `None` if the length disagrees with the shape.
    pub fn from_genes(shape: GeneShape, genes: Vec<f32>) -> Option<Self> {
        (genes.len() == shape.len()).then_some(Self { shape, genes })
    }

    pub fn shape(&self) -> GeneShape {
        self.shape
    }

    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    /// Gene at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.genes[self.shape.offset(x, y)]
    }

    /// Row `x`, i.e. the `genes_y` values describing one placed object.
    pub fn row(&self, x: usize) -> &[f32] {
        let start = x * self.shape.genes_y;
        &self.genes[start..start + self.shape.genes_y]
    }

    /// Iterate over rows.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.genes.chunks_exact(self.shape.genes_y)
    }
}

/// The full batch of individuals evaluated together.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    pop_size: usize,
    shape: GeneShape,
    data: Vec<f32>,
}

impl Population {
    /// Build a population from flat row-major data.
    /// Returns `None` if the length disagrees with the dimensions.
    pub fn from_data(pop_size: usize, shape: GeneShape, data: Vec<f32>) -> Option<Self> {
        (data.len() == pop_size * shape.len()).then_some(Self {
            pop_size,
            shape,
            data,
        })
    }

    /// All-zero population.
    pub fn zeros(pop_size: usize, shape: GeneShape) -> Self {
        Self {
            pop_size,
            shape,
            data: vec![0.0; pop_size * shape.len()],
        }
    }

    #[inline]
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    #[inline]
    pub fn shape(&self) -> GeneShape {
        self.shape
    }

    /// `(pop_size, genes_x, genes_y)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.pop_size, self.shape.genes_x, self.shape.genes_y)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Genes of individual `i`.
    pub fn individual_genes(&self, i: usize) -> &[f32] {
        let len = self.shape.len();
        &self.data[i * len..(i + 1) * len]
    }

    /// Owned copy of individual `i`.
    pub fn individual(&self, i: usize) -> Individual {
        Individual {
            shape: self.shape,
            genes: self.individual_genes(i).to_vec(),
        }
    }

    /// Iterate over individuals as flat gene slices.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.shape.len())
    }

    /// Gene `(x, y)` of individual `i`.
    #[inline]
    pub fn get(&self, i: usize, x: usize, y: usize) -> f32 {
        self.data[i * self.shape.len() + self.shape.offset(x, y)]
    }
}
