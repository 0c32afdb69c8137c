//! Command-line argument parsing for the Tellus demo and tools.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tellus command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "tellus", about = "Tellus globe engine")]
pub struct CliArgs {
    /// Map projection (equirectangular, mercator, polar-north, polar-south).
    #[arg(long)]
    pub projection: Option<String>,

    /// Detail hint; negative subdivides sooner, positive later.
    #[arg(long, allow_hyphen_values = true)]
    pub detail_hint: Option<f64>,

    /// Number of levels in the tile pyramid.
    #[arg(long)]
    pub num_levels: Option<usize>,

    /// Tile grid width in cells.
    #[arg(long)]
    pub tile_width: Option<usize>,

    /// Tile grid height in cells.
    #[arg(long)]
    pub tile_height: Option<usize>,

    /// Vertical exaggeration applied to terrain heights.
    #[arg(long)]
    pub vertical_exaggeration: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of frames the demo flies before exiting.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref projection) = args.projection {
            self.globe.projection = projection.clone();
        }
        if let Some(hint) = args.detail_hint {
            self.terrain.detail_hint = hint;
        }
        if let Some(levels) = args.num_levels {
            self.terrain.num_levels = levels;
        }
        if let Some(width) = args.tile_width {
            self.terrain.tile_width = width;
        }
        if let Some(height) = args.tile_height {
            self.terrain.tile_height = height;
        }
        if let Some(exaggeration) = args.vertical_exaggeration {
            self.globe.vertical_exaggeration = exaggeration;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            projection: None,
            detail_hint: None,
            num_levels: None,
            tile_width: None,
            tile_height: None,
            vertical_exaggeration: None,
            log_level: None,
            frames: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            projection: Some("polar-north".to_string()),
            num_levels: Some(8),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.globe.projection, "polar-north");
        assert_eq!(config.terrain.num_levels, 8);
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.tile_width, 32);
        assert_eq!(config.terrain.detail_hint, 0.0);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_negative_detail_hint_parses() {
        let args = CliArgs::parse_from(["tellus", "--detail-hint", "-0.5"]);
        assert_eq!(args.detail_hint, Some(-0.5));
    }
}
