//! Global heat map assembled from result words.

use std::io::Write;

use crate::emit::ResultWord;
use crate::error::{MeshError, Result};

/// Temperature bytes of the whole grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatMap {
    side: usize,
    bytes: Vec<u8>,
}

impl HeatMap {
    /// Assemble a `side x side` map from result words.
    ///
    /// Every position must be covered by exactly one word.
    pub fn from_words(side: usize, words: impl IntoIterator<Item = ResultWord>) -> Result<Self> {
        let mut bytes = vec![0u8; side * side];
        let mut seen = vec![false; side * side];
        let mut count = 0usize;

        for word in words {
            let (row, col) = (word.row() as usize, word.col() as usize);
            if row >= side || col >= side {
                return Err(MeshError::ResultMismatch(format!(
                    "{} lies outside a {}x{} grid",
                    word, side, side
                )));
            }
            let idx = row * side + col;
            if seen[idx] {
                return Err(MeshError::ResultMismatch(format!(
                    "duplicate result for ({}, {})",
                    row, col
                )));
            }
            seen[idx] = true;
            bytes[idx] = word.temperature();
            count += 1;
        }

        if count != side * side {
            return Err(MeshError::ResultMismatch(format!(
                "expected {} results, got {}",
                side * side,
                count
            )));
        }

        Ok(Self { side, bytes })
    }

    /// Wrap row-major bytes.
    pub fn from_bytes(side: usize, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != side * side {
            return Err(MeshError::ResultMismatch(format!(
                "expected {} bytes, got {}",
                side * side,
                bytes.len()
            )));
        }
        Ok(Self { side, bytes })
    }

    /// Grid side length.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Temperature byte at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not below [`HeatMap::side`].
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.bytes[row * self.side + col]
    }

    /// Row-major bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Positions where `self` and `other` differ, as `(row, col, ours, theirs)`.
    pub fn diff(&self, other: &HeatMap) -> Vec<(usize, usize, u8, u8)> {
        self.bytes
            .iter()
            .zip(&other.bytes)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, (&a, &b))| (i / self.side, i % self.side, a, b))
            .collect()
    }

    /// Mean temperature.
    pub fn mean(&self) -> f64 {
        if self.bytes.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.bytes.iter().map(|&b| u64::from(b)).sum();
        sum as f64 / self.bytes.len() as f64
    }

    /// Write a binary PPM (P6) image.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.side, self.side)?;
        let mut pixels = Vec::with_capacity(self.bytes.len() * 3);
        for &b in &self.bytes {
            pixels.extend_from_slice(&heat_color(b));
        }
        out.write_all(&pixels)?;
        out.flush()?;
        Ok(())
    }

    /// Write `row,col,temp` CSV with a header line.
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "row,col,temp")?;
        for row in 0..self.side {
            for col in 0..self.side {
                writeln!(out, "{},{},{}", row, col, self.get(row, col))?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Blue (cold) to red (hot) ramp through green.
fn heat_color(t: u8) -> [u8; 3] {
    let t = i32::from(t);
    let green = 255 - (2 * t - 255).abs();
    [t as u8, green as u8, (255 - t) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(side: u32) -> Vec<ResultWord> {
        let mut words = Vec::new();
        for row in 0..side {
            for col in 0..side {
                words.push(ResultWord::pack(row, col, (row * 10 + col) as u8));
            }
        }
        words
    }

    #[test]
    fn test_from_words_any_order() {
        let mut w = words(3);
        w.reverse();
        let map = HeatMap::from_words(3, w).unwrap();
        assert_eq!(map.get(2, 1), 21);
        assert_eq!(map.get(0, 0), 0);
    }

    #[test]
    fn test_from_words_rejects_bad_coverage() {
        let mut missing = words(3);
        missing.pop();
        assert!(matches!(HeatMap::from_words(3, missing), Err(MeshError::ResultMismatch(_))));

        let mut duplicate = words(3);
        duplicate[8] = duplicate[0];
        assert!(matches!(HeatMap::from_words(3, duplicate), Err(MeshError::ResultMismatch(_))));

        let mut outside = words(3);
        outside[4] = ResultWord::pack(3, 0, 0);
        assert!(matches!(HeatMap::from_words(3, outside), Err(MeshError::ResultMismatch(_))));
    }

    #[test]
    fn test_write_ppm() {
        let map = HeatMap::from_bytes(2, vec![0, 255, 128, 0]).unwrap();
        let mut out = Vec::new();
        map.write_ppm(&mut out).unwrap();

        let header = b"P6\n2 2\n255\n";
        assert!(out.starts_with(header));
        assert_eq!(out.len(), header.len() + 12);
        assert_eq!(&out[header.len()..header.len() + 3], &[0, 0, 255]);
        assert_eq!(&out[header.len() + 3..header.len() + 6], &[255, 0, 0]);
    }

    #[test]
    fn test_write_csv() {
        let map = HeatMap::from_bytes(2, vec![1, 2, 3, 4]).unwrap();
        let mut out = Vec::new();
        map.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "row,col,temp\n0,0,1\n0,1,2\n1,0,3\n1,1,4\n");
    }

    #[test]
    fn test_diff_and_mean() {
        let a = HeatMap::from_bytes(2, vec![10, 20, 30, 40]).unwrap();
        let b = HeatMap::from_bytes(2, vec![10, 21, 30, 40]).unwrap();
        assert_eq!(a.diff(&b), vec![(0, 1, 20, 21)]);
        assert!(a.diff(&a).is_empty());
        assert_eq!(a.mean(), 25.0);
    }
}
