//! Feature encoding: numeric standardization and unknown-tolerant one-hot.

use serde::{Deserialize, Serialize};

/// Per-column standardization to zero mean and unit variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f64;

        let mut means = vec![0.0; cols];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n.max(1.0);
        }

        let mut stds = vec![0.0; cols];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n.max(1.0)).sqrt();
            // A constant column would otherwise divide by zero.
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        StandardScaler { means, stds }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// One-hot encoding over string categories. Categories are learned per
/// column at fit time; a category unseen during training encodes as an
/// all-zero block instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(rows: &[Vec<String>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut categories: Vec<Vec<String>> = vec![Vec::new(); cols];

        for row in rows {
            for (col, value) in categories.iter_mut().zip(row) {
                if !col.contains(value) {
                    col.push(value.clone());
                }
            }
        }
        for col in &mut categories {
            col.sort();
        }

        OneHotEncoder { categories }
    }

    /// Total width of the encoded representation.
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform(&self, row: &[String]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        for (col, value) in self.categories.iter().zip(row) {
            let hit = col.iter().position(|c| c == value);
            for i in 0..col.len() {
                out.push(if hit == Some(i) { 1.0 } else { 0.0 });
            }
        }
        out
    }
}
