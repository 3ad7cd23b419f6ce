//! Geodetic to metric reprojection.
//!
//! All distances are measured in WGS84 / UTM zone 48N (EPSG:32648), which
//! covers Hanoi (central meridian 105°E). Forward and inverse transforms use
//! the Snyder series expansions of the transverse Mercator projection; they
//! round-trip to well under a millimetre inside the zone.

use geo::{Coord, MapCoords, Point};

use crate::models::GeoPoint;

/// WGS84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Zone used for every analysis in this crate
pub const HANOI_UTM_ZONE: u8 = 48;

/// Longitude offset from the central meridian beyond which distances are
/// no longer treated as meters (one neighbouring zone either side)
const MAX_MERIDIAN_OFFSET_DEG: f64 = 6.0;
/// UTM latitude limit
const MAX_LATITUDE_DEG: f64 = 84.0;

/// Transverse Mercator projection on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// EPSG code of the projected CRS
    pub epsg: u32,
    central_meridian: f64,
    scale: f64,
    false_easting: f64,
    false_northing: f64,
    a: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    /// UTM zone projection (1..=60)
    pub fn utm(zone: u8, north: bool) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;
        Self {
            epsg: if north { 32600 } else { 32700 } + zone as u32,
            central_meridian: central_meridian.to_radians(),
            scale: UTM_SCALE,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
            a: WGS84_A,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// The metric frame every distance in this crate is measured in
    pub fn hanoi() -> Self {
        Self::utm(HANOI_UTM_ZONE, true)
    }

    /// Meridian arc length from the equator to latitude `phi` (radians)
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Geodetic (x = lon, y = lat degrees) to projected (x = easting, y = northing meters)
    pub fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let phi = c.y.to_radians();
        let lam = c.x.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let cc = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lam - self.central_meridian);
        let a2 = a * a;

        let x = self.scale
            * n
            * (a + (1.0 - t + cc) * a2 * a / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * cc - 58.0 * self.ep2) * a2 * a2 * a / 120.0);
        let y = self.scale
            * (self.meridian_arc(phi)
                + n * tan_phi
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * cc + 4.0 * cc * cc) * a2 * a2 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * cc - 330.0 * self.ep2)
                            * a2
                            * a2
                            * a2
                            / 720.0));

        Coord {
            x: x + self.false_easting,
            y: y + self.false_northing,
        }
    }

    /// Projected meters back to geodetic degrees (x = lon, y = lat)
    pub fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let x = c.x - self.false_easting;
        let m = (c.y - self.false_northing) / self.scale;

        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let c1 = self.ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * self.scale);
        let d2 = d * d;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d2 * d2
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d2
                        * d2
                        * d2
                        / 720.0);
        let lam = self.central_meridian
            + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d2
                    * d2
                    * d
                    / 120.0)
                / cos1;

        Coord {
            x: lam.to_degrees(),
            y: phi.to_degrees(),
        }
    }

    pub fn project_point(&self, p: GeoPoint) -> Point<f64> {
        Point(self.forward(p.to_point().0))
    }

    pub fn unproject_point(&self, p: Point<f64>) -> GeoPoint {
        Point(self.inverse(p.0)).into()
    }

    /// Reproject any geodetic geometry into the metric frame
    pub fn project<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.forward(c))
    }

    /// Whether planar distances around `p` are meaningful in this frame
    pub fn covers(&self, p: GeoPoint) -> bool {
        if !p.is_valid() || p.lat.abs() > MAX_LATITUDE_DEG {
            return false;
        }
        let offset = p.lon - self.central_meridian.to_degrees();
        let offset = (offset + 540.0).rem_euclid(360.0) - 180.0;
        offset.abs() <= MAX_MERIDIAN_OFFSET_DEG
    }
}

impl Default for TransverseMercator {
    fn default() -> Self {
        Self::hanoi()
    }
}
