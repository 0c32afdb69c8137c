//! Headless demo that flies a descending orbit over the globe.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. Each frame builds a view snapshot, runs terrain selection, and
//! uploads newly built tile geometry into a GPU resource cache whose handles
//! are plain counters, exercising every public seam of the engine without a
//! GPU or a window.
//!
//! Run with `cargo run -p tellus-demo` for the default 120-frame flight.
//! Run with `cargo run -p tellus-demo -- --projection mercator --frames 60`
//! to override the projection and flight length.

use std::time::Instant;

use clap::Parser;
use glam::{DMat4, DVec3};
use tellus_cache::GpuResourceCache;
use tellus_config::{CliArgs, Config};
use tellus_coords::{Location, Sector};
use tellus_globe::{ElevationSource, FrameState, Globe};
use tellus_projections::GeographicProjection;
use tellus_terrain::TileController;
use tellus_tile::{LevelSet, TileKey};
use tracing::{debug, info, trace, warn};

const DEFAULT_FRAMES: u64 = 120;
const FOV_Y_DEGREES: f64 = 45.0;
const VIEWPORT_HEIGHT: f64 = 900.0;

/// Synthetic mountains from a closed-form height function, so the flight
/// sees relief without any elevation data on disk.
struct SyntheticElevationSource {
    amplitude: f64,
}

impl SyntheticElevationSource {
    fn height(&self, latitude: f64, longitude: f64) -> f64 {
        let lat = latitude.to_radians();
        let lon = longitude.to_radians();
        // Two octaves of interfering ridges.
        let coarse = (3.0 * lat).sin() * (4.0 * lon).cos();
        let fine = 0.25 * (11.0 * lat).cos() * (13.0 * lon).sin();
        self.amplitude * (coarse + fine).abs()
    }
}

impl ElevationSource for SyntheticElevationSource {
    fn timestamp(&self) -> u64 {
        // Closed-form heights never change.
        0
    }

    fn min_and_max_elevations_for_sector(&self, _sector: &Sector) -> Option<(f64, f64)> {
        Some((0.0, 1.25 * self.amplitude))
    }

    fn elevations_for_grid(
        &self,
        sector: &Sector,
        num_lat: usize,
        num_lon: usize,
        out: &mut [f64],
    ) -> bool {
        let delta_lat = sector.delta_latitude() / num_lat as f64;
        let delta_lon = sector.delta_longitude() / num_lon as f64;
        let mut index = 0;
        for lat_step in 0..=num_lat {
            let latitude = sector.min_latitude + lat_step as f64 * delta_lat;
            for lon_step in 0..=num_lon {
                let longitude = sector.min_longitude + lon_step as f64 * delta_lon;
                out[index] = self.height(latitude, longitude);
                index += 1;
            }
        }
        true
    }
}

/// Stand-in for a renderer vertex buffer.
#[derive(Debug)]
struct VertexBufferHandle(u64);

/// Eye position along the flight path at `t` in [0, 1]: one full eastward
/// revolution on a weaving latitude, descending from orbital height toward
/// the surface.
fn flight_position(t: f64, start_altitude: f64, end_altitude: f64) -> (f64, f64, f64) {
    let latitude = 55.0 * (2.0 * std::f64::consts::PI * t).sin();
    let longitude = -180.0 + 360.0 * t;
    let altitude = start_altitude * (end_altitude / start_altitude).powf(t);
    (latitude, longitude, altitude)
}

fn frame_state(globe: &Globe, latitude: f64, longitude: f64, altitude: f64) -> FrameState {
    let eye = globe.geographic_to_cartesian(latitude, longitude, altitude);
    let target = globe.geographic_to_cartesian(latitude, longitude, 0.0);
    let view = DMat4::look_at_rh(eye, target, DVec3::Y);
    let near = (0.1 * altitude).max(1.0);
    let far = altitude + 4.0 * globe.equatorial_radius;
    let projection =
        DMat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), 16.0 / 9.0, near, far);
    FrameState::new(globe, eye, projection * view, FOV_Y_DEGREES, VIEWPORT_HEIGHT)
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("tellus")
    });
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load config: {error}, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    tellus_log::init_logging(Some(&config_dir.join("logs")), cfg!(debug_assertions), Some(&config));
    info!("Tellus demo starting");

    let projection = GeographicProjection::from_name(&config.globe.projection).unwrap_or_else(|| {
        warn!(
            "unknown projection {:?}, falling back to equirectangular",
            config.globe.projection
        );
        GeographicProjection::Equirectangular
    });

    let mut globe = Globe::wgs84(projection);
    globe.set_elevation_source(Some(Box::new(SyntheticElevationSource { amplitude: 8000.0 })));
    info!(
        projection = projection.state_key(),
        radius = globe.equatorial_radius,
        "globe ready"
    );

    let levels = LevelSet::new(
        Sector::FULL_SPHERE,
        Location::new(
            config.terrain.first_level_delta_degrees,
            config.terrain.first_level_delta_degrees,
        ),
        config.terrain.num_levels,
        config.terrain.tile_width,
        config.terrain.tile_height,
    );
    let mut controller = TileController::with_levels(
        levels,
        1.1,
        config.cache.tile_cache_capacity,
        config.cache.tile_cache_low_water,
    );
    controller.set_detail_hint(config.terrain.detail_hint);

    let mut gpu_cache: GpuResourceCache<TileKey, VertexBufferHandle> = GpuResourceCache::new(
        config.cache.gpu_cache_capacity,
        config.cache.gpu_cache_low_water,
    );
    let mut next_handle: u64 = 1;

    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    let start_altitude = 1.2e7;
    let end_altitude = 2.0e5;

    let mut max_selected = 0usize;
    let mut deepest_level = 0usize;
    let mut uploads = 0u64;
    let mut released = 0u64;
    let started = Instant::now();

    for frame_number in 0..frames {
        let t = frame_number as f64 / frames.max(1) as f64;
        let (latitude, longitude, altitude) = flight_position(t, start_altitude, end_altitude);

        let mut frame = frame_state(&globe, latitude, longitude, altitude);
        frame.vertical_exaggeration = config.globe.vertical_exaggeration;

        let terrain = controller.select_tiles(&globe, &frame);
        max_selected = max_selected.max(terrain.len());

        // Upload geometry for newly selected tiles, releasing whatever the
        // budget displaces.
        let now = Instant::now();
        for selected in terrain.tiles() {
            deepest_level = deepest_level.max(selected.key.level);
            if !gpu_cache.should_retrieve(&selected.key, now) {
                continue;
            }
            gpu_cache.retrieval_begun(selected.key);
            match controller.tile(&selected.key).map(|tile| tile.size()) {
                Some(size) => {
                    gpu_cache.retrieval_completed(&selected.key);
                    let handle = VertexBufferHandle(next_handle);
                    next_handle += 1;
                    for (key, old) in gpu_cache.put_resource(selected.key, handle, size) {
                        trace!("released vertex buffer {} for tile {}", old.0, key);
                        released += 1;
                    }
                    uploads += 1;
                }
                None => gpu_cache.retrieval_failed(&selected.key, now),
            }
        }

        let under_eye = controller
            .surface_point(&terrain, latitude, longitude)
            .map(|point| globe.cartesian_to_geographic(point).altitude);
        debug!(
            frame = frame_number,
            altitude_m = altitude,
            tiles = terrain.len(),
            terrain_height_m = under_eye.unwrap_or(0.0),
            "frame"
        );
        if frame_number % 20 == 0 {
            info!(
                "frame {frame_number}: {} tiles at ({latitude:.1}, {longitude:.1}, {altitude:.0} m), \
                 gpu cache {}/{} bytes",
                terrain.len(),
                gpu_cache.used_capacity(),
                gpu_cache.capacity()
            );
        }
    }

    info!(
        "flight complete: {} frames in {:.2} s, peak {} tiles, deepest level {}",
        frames,
        started.elapsed().as_secs_f64(),
        max_selected,
        deepest_level
    );
    info!(
        "caches: tiles {}/{} bytes, gpu {} buffers {}/{} bytes ({} uploads, {} released)",
        controller.tile_cache().used_capacity(),
        controller.tile_cache().capacity(),
        gpu_cache.len(),
        gpu_cache.used_capacity(),
        gpu_cache.capacity(),
        uploads,
        released
    );
}
