// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Row-major `(rows, dim)` output of batch lookups.

use crate::error::{MembError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self { rows, dim, data: vec![0.0; rows * dim] }
    }

    pub fn from_vec(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * dim {
            return Err(MembError::DimensionMismatch { expected: rows * dim, found: data.len() });
        }
        Ok(Self { rows, dim, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Joins matrices with equal row counts side by side, in order.
    pub fn hconcat(parts: &[Matrix]) -> Result<Matrix> {
        let rows = parts.first().map_or(0, |m| m.rows);
        let dim = parts.iter().map(|m| m.dim).sum();
        let mut out = Matrix::zeros(rows, dim);
        for part in parts {
            if part.rows != rows {
                return Err(MembError::DimensionMismatch { expected: rows, found: part.rows });
            }
        }
        for r in 0..rows {
            let mut col = 0;
            let dst = out.row_mut(r);
            for part in parts {
                dst[col..col + part.dim].copy_from_slice(part.row(r));
                col += part.dim;
            }
        }
        Ok(out)
    }

    /// Element-wise mean of same-shaped matrices.
    pub fn mean(parts: &[Matrix]) -> Result<Matrix> {
        let Some(first) = parts.first() else {
            return Ok(Matrix::zeros(0, 0));
        };
        let mut out = Matrix::zeros(first.rows, first.dim);
        for part in parts {
            if part.rows != first.rows || part.dim != first.dim {
                return Err(MembError::DimensionMismatch {
                    expected: first.rows * first.dim,
                    found: part.rows * part.dim,
                });
            }
            for (acc, v) in out.data.iter_mut().zip(&part.data) {
                *acc += v;
            }
        }
        let n = parts.len() as f32;
        out.data.iter_mut().for_each(|v| *v /= n);
        Ok(out)
    }
}
