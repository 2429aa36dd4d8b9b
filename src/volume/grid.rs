use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::info;

use super::{march_optical_thickness, phase_henyey_greenstein, Volume};
use crate::film::Color;
use crate::geometry::BBox;
use crate::linalg::{lerp, Point, Ray, Vector};
use crate::scene::SceneError;

/// A density field stored as a regular voxel grid, loaded from a Mitsuba
/// volume-grid file and sampled with trilinear interpolation.
pub struct GridVolume {
    sig_a: Color,
    sig_s: Color,
    emit: Color,
    phase_asymmetry: f32,
    density_scale: f32,
    region: BBox,
    nx: usize,
    ny: usize,
    nz: usize,
    grid: Vec<f32>,
}

impl GridVolume {
    pub fn new(
        sig_a: Color,
        sig_s: Color,
        emit: Color,
        phase_asymmetry: f32,
        vol_file: &Path,
        density_scale: f32,
    ) -> Result<Self, SceneError> {
        let (region, nx, ny, nz, grid) =
            load_vol_file(vol_file).map_err(|reason| SceneError::VolumeLoad {
                path: vol_file.to_path_buf(),
                reason,
            })?;
        info!(
            "grid volume {} is {}x{}x{} voxels over {}",
            vol_file.display(),
            nx,
            ny,
            nz,
            region
        );
        Ok(Self {
            sig_a,
            sig_s,
            emit,
            phase_asymmetry,
            density_scale,
            region,
            nx,
            ny,
            nz,
            grid,
        })
    }

    /// Builds the volume directly from grid data; the test seam around the
    /// file format.
    pub fn from_grid(
        sig_a: Color,
        sig_s: Color,
        emit: Color,
        phase_asymmetry: f32,
        region: BBox,
        dims: (usize, usize, usize),
        grid: Vec<f32>,
        density_scale: f32,
    ) -> Self {
        assert_eq!(grid.len(), dims.0 * dims.1 * dims.2);
        Self {
            sig_a,
            sig_s,
            emit,
            phase_asymmetry,
            density_scale,
            region,
            nx: dims.0,
            ny: dims.1,
            nz: dims.2,
            grid,
        }
    }

    fn grid_density(&self, x: i64, y: i64, z: i64) -> f32 {
        let x = x.clamp(0, self.nx as i64 - 1) as usize;
        let y = y.clamp(0, self.ny as i64 - 1) as usize;
        let z = z.clamp(0, self.nz as i64 - 1) as usize;
        self.grid[(z * self.ny + y) * self.nx + x] * self.density_scale
    }

    fn density(&self, p: Point) -> f32 {
        if !self.region.inside(p) {
            return 0.0;
        }
        // Voxel-space coordinates with samples at voxel centers
        let voxel = self.region.offset(p);
        let vx = voxel.x * self.nx as f32 - 0.5;
        let vy = voxel.y * self.ny as f32 - 0.5;
        let vz = voxel.z * self.nz as f32 - 0.5;
        let (ix, iy, iz) = (vx.floor() as i64, vy.floor() as i64, vz.floor() as i64);
        let (dx, dy, dz) = (vx - ix as f32, vy - iy as f32, vz - iz as f32);
        let d00 = lerp(dx, self.grid_density(ix, iy, iz), self.grid_density(ix + 1, iy, iz));
        let d10 = lerp(
            dx,
            self.grid_density(ix, iy + 1, iz),
            self.grid_density(ix + 1, iy + 1, iz),
        );
        let d01 = lerp(
            dx,
            self.grid_density(ix, iy, iz + 1),
            self.grid_density(ix + 1, iy, iz + 1),
        );
        let d11 = lerp(
            dx,
            self.grid_density(ix, iy + 1, iz + 1),
            self.grid_density(ix + 1, iy + 1, iz + 1),
        );
        lerp(dz, lerp(dy, d00, d10), lerp(dy, d01, d11))
    }
}

impl Volume for GridVolume {
    fn bound(&self) -> BBox {
        self.region
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        self.region.intersect(ray)
    }

    fn absorption(&self, p: Point, _v: Vector) -> Color {
        self.sig_a * self.density(p)
    }

    fn scattering(&self, p: Point, _v: Vector) -> Color {
        self.sig_s * self.density(p)
    }

    fn attenuation(&self, p: Point, _v: Vector) -> Color {
        (self.sig_a + self.sig_s) * self.density(p)
    }

    fn emission(&self, p: Point, _v: Vector) -> Color {
        self.emit * self.density(p)
    }

    fn optical_thickness(&self, ray: &Ray, step: f32, offset: f32) -> Color {
        march_optical_thickness(self, ray, step, offset)
    }

    fn phase(&self, _p: Point, w_i: Vector, w_o: Vector) -> f32 {
        phase_henyey_greenstein(w_i, w_o, self.phase_asymmetry)
    }
}

/// Parses the Mitsuba volume-grid format, version 3, float32, one channel:
/// `"VOL" u8(version) u32(encoding) u32(nx) u32(ny) u32(nz) u32(channels)
/// f32x3(min) f32x3(max) f32[nx·ny·nz]`.
fn load_vol_file(path: &Path) -> Result<(BBox, usize, usize, usize, Vec<f32>), String> {
    let mut buf = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut buf))
        .map_err(|e: io::Error| e.to_string())?;
    if buf.len() < 4 || &buf[0..3] != b"VOL" {
        return Err("not a Mitsuba volume file".into());
    }
    if buf[3] != 3 {
        return Err("only volume file version 3 is supported".into());
    }
    let mut cursor = 4usize;
    let read_u32 = |cursor: &mut usize| -> Result<u32, String> {
        let bytes: [u8; 4] = buf
            .get(*cursor..*cursor + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or("truncated volume file")?;
        *cursor += 4;
        Ok(u32::from_le_bytes(bytes))
    };
    let encoding = read_u32(&mut cursor)?;
    if encoding != 1 {
        return Err("only float32 volumes are supported".into());
    }
    let nx = read_u32(&mut cursor)? as usize;
    let ny = read_u32(&mut cursor)? as usize;
    let nz = read_u32(&mut cursor)? as usize;
    let channels = read_u32(&mut cursor)?;
    if channels != 1 {
        return Err("only single channel volumes are supported".into());
    }
    let read_f32 = |cursor: &mut usize| -> Result<f32, String> {
        let bytes: [u8; 4] = buf
            .get(*cursor..*cursor + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or("truncated volume file")?;
        *cursor += 4;
        Ok(f32::from_le_bytes(bytes))
    };
    let min = Point::new(read_f32(&mut cursor)?, read_f32(&mut cursor)?, read_f32(&mut cursor)?);
    let max = Point::new(read_f32(&mut cursor)?, read_f32(&mut cursor)?, read_f32(&mut cursor)?);
    let n = nx * ny * nz;
    let mut grid = Vec::with_capacity(n);
    for _ in 0..n {
        grid.push(read_f32(&mut cursor)?);
    }
    Ok((BBox::new(min, max), nx, ny, nz, grid))
}
