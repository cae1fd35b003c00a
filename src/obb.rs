extern crate glam;
use glam::{Mat4, Vec3A, Vec4};

use crate::{AABB, EXTENT_EPSILON};

/// Oriented bounding box fit to a point set by principal component analysis.
///
/// `ext` holds the half-extents along the three PCA axes; a negative `ext.x`
/// marks the invalid/empty fit. `transform` carries the basis vectors in its
/// upper-left 3x3 and the negated box midpoint in its translation column.
#[derive(Debug, Clone, Copy)]
pub struct OBB {
    pub ext: Vec3A,
    pub transform: Mat4,
}

impl OBB {
    /// The fit of an empty point set
    pub const INVALID: Self = OBB {
        ext: Vec3A::NEG_ONE,
        transform: Mat4::IDENTITY,
    };

    /// Fit an oriented box to `points` along the principal axes of their
    /// covariance. Near-planar or near-linear point sets may come out with a
    /// loose basis; the box stays conservative either way.
    pub fn fit_pca(points: &[Vec3A]) -> OBB {
        if points.is_empty() {
            return Self::INVALID;
        }

        let n = points.len() as f32;
        let centroid = points.iter().copied().sum::<Vec3A>() / n;

        let mut cov = [[0.0f32; 3]; 3];
        for point in points {
            let d = *point - centroid;
            let d = [d.x, d.y, d.z];
            for i in 0..3 {
                for j in 0..3 {
                    cov[i][j] += d[i] * d[j];
                }
            }
        }
        for row in cov.iter_mut() {
            for value in row.iter_mut() {
                *value /= n;
            }
        }

        let basis = jacobi_eigenvectors(cov);
        let axes = [
            Vec3A::new(basis[0][0], basis[1][0], basis[2][0]),
            Vec3A::new(basis[0][1], basis[1][1], basis[2][1]),
            Vec3A::new(basis[0][2], basis[1][2], basis[2][2]),
        ];

        let mut lo = Vec3A::splat(f32::INFINITY);
        let mut hi = Vec3A::splat(-f32::INFINITY);
        for point in points {
            let projected = Vec3A::new(
                point.dot(axes[0]),
                point.dot(axes[1]),
                point.dot(axes[2]),
            );
            lo = lo.min(projected);
            hi = hi.max(projected);
        }

        let ext = (hi - lo) * 0.5;
        let mid_local = (hi + lo) * 0.5;
        let mid = axes[0] * mid_local.x + axes[1] * mid_local.y + axes[2] * mid_local.z;

        OBB {
            ext,
            transform: Mat4::from_cols(
                Vec4::new(axes[0].x, axes[0].y, axes[0].z, 0.0),
                Vec4::new(axes[1].x, axes[1].y, axes[1].z, 0.0),
                Vec4::new(axes[2].x, axes[2].y, axes[2].z, 0.0),
                Vec4::new(-mid.x, -mid.y, -mid.z, 1.0),
            ),
        }
    }

    /// If the fit succeeded (all extents >= 0)
    #[inline]
    pub fn valid(&self) -> bool {
        self.ext.cmpge(Vec3A::ZERO).all()
    }

    /// Basis vector of the given column
    #[inline]
    pub fn axis(&self, i: usize) -> Vec3A {
        Vec3A::from(self.transform.col(i).truncate())
    }

    /// Box midpoint in world space (the translation column holds its negation)
    #[inline]
    pub fn center(&self) -> Vec3A {
        -Vec3A::from(self.transform.w_axis.truncate())
    }

    /// Conservative axis-aligned box over the 8 transformed corners
    pub fn aabb(&self) -> AABB {
        let center = self.center();
        let mut aabb = AABB::default();
        for corner in 0..8u32 {
            let signs = Vec3A::new(
                if corner & 1 == 0 { -1.0 } else { 1.0 },
                if corner & 2 == 0 { -1.0 } else { 1.0 },
                if corner & 4 == 0 { -1.0 } else { 1.0 },
            );
            let local = signs * self.ext;
            aabb.grow(
                center + self.axis(0) * local.x + self.axis(1) * local.y + self.axis(2) * local.z,
            );
        }
        aabb
    }

    /// Total surface area from the full extents, clamped like [`AABB::surface_area`]
    pub fn surface_area(&self) -> f32 {
        let e = (self.ext * 2.0).max(Vec3A::splat(EXTENT_EPSILON));
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }
}

const JACOBI_MAX_SWEEPS: usize = 16;
const JACOBI_CONVERGED: f32 = 1e-12;

/// Eigenvectors (as matrix columns) of a symmetric 3x3 matrix, by cyclic
/// Jacobi rotations. The input must be symmetric; the result columns are
/// orthonormal since they accumulate from plane rotations only.
fn jacobi_eigenvectors(mut a: [[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off < JACOBI_CONVERGED {
            break;
        }

        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            let apq = a[p][q];
            if apq.abs() < JACOBI_CONVERGED {
                continue;
            }

            let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            let mut rotation = [[0.0f32; 3]; 3];
            rotation[0][0] = 1.0;
            rotation[1][1] = 1.0;
            rotation[2][2] = 1.0;
            rotation[p][p] = c;
            rotation[q][q] = c;
            rotation[p][q] = s;
            rotation[q][p] = -s;

            a = mat_mul(&mat_transpose(&rotation), &mat_mul(&a, &rotation));
            v = mat_mul(&v, &rotation);
        }
    }

    v
}

fn mat_mul(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut out = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                out[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    out
}

fn mat_transpose(a: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut out = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[j][i];
        }
    }
    out
}
