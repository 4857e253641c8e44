//! Mesh configuration.
//!
//! Loaded with the `config` crate from an optional TOML file, layered under
//! environment variables prefixed with `HEATMESH_`. Nested keys use `__`:
//!
//! ```text
//! HEATMESH_ITERATIONS=10
//! HEATMESH_BOUNDARY__NORTH=200
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::emit::MAX_COORDINATE;
use crate::error::{MeshError, Result};
use crate::fixed::Fixed;
use crate::link::LinkConfig;
use crate::partition::MeshGeometry;
use crate::subgrid::BoundaryConditions;

const ENV_PREFIX: &str = "HEATMESH";

/// Configuration of a heat mesh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Number of cells `P`; a power of two with even log2.
    #[serde(default = "default_cells")]
    pub cells: u32,

    /// Maximum message length `W` in 32-bit words. Subgrids are `W - 1` wide.
    #[serde(default = "default_message_words")]
    pub message_words: usize,

    /// Iterations to run.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Frames buffered per link.
    #[serde(default = "default_link_capacity")]
    pub link_capacity: usize,

    /// Temperatures at the outer mesh edges.
    #[serde(default)]
    pub boundary: BoundaryConfig,
}

fn default_cells() -> u32 {
    64
}

fn default_message_words() -> usize {
    8
}

fn default_iterations() -> u32 {
    1000
}

fn default_link_capacity() -> usize {
    1
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            cells: default_cells(),
            message_words: default_message_words(),
            iterations: default_iterations(),
            link_capacity: default_link_capacity(),
            boundary: BoundaryConfig::default(),
        }
    }
}

/// Boundary temperatures in whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// North edge.
    #[serde(default = "default_hot")]
    pub north: i32,
    /// South edge.
    #[serde(default = "default_cold")]
    pub south: i32,
    /// East edge.
    #[serde(default = "default_cold")]
    pub east: i32,
    /// West edge.
    #[serde(default = "default_hot")]
    pub west: i32,
}

fn default_hot() -> i32 {
    255
}

fn default_cold() -> i32 {
    40
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            north: default_hot(),
            south: default_cold(),
            east: default_cold(),
            west: default_hot(),
        }
    }
}

impl BoundaryConfig {
    fn sides(&self) -> [(&'static str, i32); 4] {
        [
            ("north", self.north),
            ("south", self.south),
            ("east", self.east),
            ("west", self.west),
        ]
    }
}

impl MeshConfig {
    /// Load configuration from an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder.add_source(env_source()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a TOML string and the environment.
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Subgrid side length `S`.
    pub fn edge_len(&self) -> usize {
        self.message_words.saturating_sub(1)
    }

    /// Validated geometry.
    pub fn geometry(&self) -> Result<MeshGeometry> {
        MeshGeometry::new(self.cells)
    }

    /// Boundary temperatures as fixed-point values.
    pub fn boundary(&self) -> BoundaryConditions {
        BoundaryConditions {
            north: Fixed::from_int(self.boundary.north),
            south: Fixed::from_int(self.boundary.south),
            east: Fixed::from_int(self.boundary.east),
            west: Fixed::from_int(self.boundary.west),
        }
    }

    /// Link settings.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            capacity: self.link_capacity,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let geometry = self.geometry()?;

        if self.message_words < 2 {
            return Err(MeshError::InvalidMessageLength(self.message_words));
        }

        let global_side = (geometry.side() as usize)
            .checked_mul(self.edge_len())
            .ok_or(MeshError::CoordinateOverflow(self.edge_len()))?;
        if global_side > MAX_COORDINATE + 1 {
            return Err(MeshError::CoordinateOverflow(global_side));
        }

        if self.link_capacity == 0 {
            return Err(MeshError::InvalidConfig(
                "link_capacity must be greater than 0".to_string(),
            ));
        }

        for (side, value) in self.boundary.sides() {
            if i16::try_from(value).is_err() {
                return Err(MeshError::InvalidConfig(format!(
                    "boundary.{} = {} does not fit the integer part of Q16.16",
                    side, value
                )));
            }
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Configuration builder for programmatic configuration.
#[derive(Debug, Default)]
pub struct MeshConfigBuilder {
    config: MeshConfig,
}

impl MeshConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell count.
    pub fn cells(mut self, cells: u32) -> Self {
        self.config.cells = cells;
        self
    }

    /// Set the message length in words.
    pub fn message_words(mut self, words: usize) -> Self {
        self.config.message_words = words;
        self
    }

    /// Set the iteration count.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Set link capacity.
    pub fn link_capacity(mut self, capacity: usize) -> Self {
        self.config.link_capacity = capacity;
        self
    }

    /// Set boundary temperatures.
    pub fn boundary(mut self, boundary: BoundaryConfig) -> Self {
        self.config.boundary = boundary;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<MeshConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MeshConfig::default();
        assert_eq!(config.cells, 64);
        assert_eq!(config.message_words, 8);
        assert_eq!(config.edge_len(), 7);
        assert_eq!(config.iterations, 1000);
        assert_eq!(config.link_capacity, 1);
        assert_eq!(config.boundary(), BoundaryConditions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_str_fills_defaults() {
        let config = MeshConfig::load_from_str(
            r#"
            cells = 16
            iterations = 5

            [boundary]
            north = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.cells, 16);
        assert_eq!(config.iterations, 5);
        assert_eq!(config.message_words, 8);
        assert_eq!(config.boundary.north, 100);
        assert_eq!(config.boundary.west, 255);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "cells = 4\nmessage_words = 4\nlink_capacity = 3").unwrap();

        let config = MeshConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cells, 4);
        assert_eq!(config.edge_len(), 3);
        assert_eq!(config.link_config().capacity, 3);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = MeshConfig::load(Some(Path::new("/nonexistent/heatmesh.toml"))).unwrap_err();
        assert!(matches!(err, MeshError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let bad_cells = MeshConfigBuilder::new().cells(8).build();
        assert!(matches!(bad_cells, Err(MeshError::InvalidCellCount(8))));

        let short = MeshConfigBuilder::new().message_words(1).build();
        assert!(matches!(short, Err(MeshError::InvalidMessageLength(1))));

        // 64 x 64 cells of 64 values is 4096 wide, one more word overflows
        let fits = MeshConfigBuilder::new().cells(4096).message_words(65).build();
        assert!(fits.is_ok());
        let overflow = MeshConfigBuilder::new().cells(4096).message_words(66).build();
        assert!(matches!(overflow, Err(MeshError::CoordinateOverflow(4160))));

        let no_capacity = MeshConfigBuilder::new().link_capacity(0).build();
        assert!(matches!(no_capacity, Err(MeshError::InvalidConfig(_))));

        let too_hot = MeshConfigBuilder::new()
            .boundary(BoundaryConfig {
                north: 40_000,
                ..BoundaryConfig::default()
            })
            .build();
        assert!(matches!(too_hot, Err(MeshError::InvalidConfig(_))));
    }

    #[test]
    fn test_huge_message_length_is_rejected() {
        let result = MeshConfigBuilder::new().cells(4).message_words(usize::MAX).build();
        assert!(matches!(result, Err(MeshError::CoordinateOverflow(_))));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_wrapping_global_side_is_rejected() {
        // 2^15 cells per side times 2^49 values wraps to zero
        let result = MeshConfigBuilder::new()
            .cells(1 << 30)
            .message_words((1 << 49) + 1)
            .build();
        assert!(matches!(result, Err(MeshError::CoordinateOverflow(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[boundary]\nsouth = 30\neast = 30").unwrap();

        std::env::set_var("HEATMESH_BOUNDARY__SOUTH", "12");
        let config = MeshConfig::load(Some(file.path()));
        std::env::remove_var("HEATMESH_BOUNDARY__SOUTH");

        let config = config.unwrap();
        assert_eq!(config.boundary.south, 12);
        assert_eq!(config.boundary.east, 30);
        assert_eq!(config.boundary.north, 255);
    }
}
