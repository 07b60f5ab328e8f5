//! Constant-velocity Kalman filter over bounding-box state
//!
//! State vector: (cx, cy, a, h, vcx, vcy, va, vh) where (cx, cy) is the box
//! center, `a` the aspect ratio (w/h) and `h` the height. The measurement
//! observes (cx, cy, a, h).

use crate::bbox::{Bbox, MIN_SIZE_EPS};
use anyhow::Result;
use nalgebra::{DMatrix, DVector};

const DIM_X: usize = 8;
const DIM_Z: usize = 4;

/// Initial variance on observed state terms
const INIT_POS_VAR: f32 = 10.0;
/// Initial variance on unobserved velocity terms; large so the first few
/// updates dominate the prior
const INIT_VEL_VAR: f32 = 10_000.0;
/// Initial variance on the aspect terms, which move on a much smaller scale
const INIT_ASPECT_VAR: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    /// State vector
    x: DVector<f32>,
    /// State covariance
    p: DMatrix<f32>,
    /// State transition matrix
    f: DMatrix<f32>,
    /// Observation matrix
    h: DMatrix<f32>,
    /// Observation noise covariance
    r: DMatrix<f32>,
    /// Process noise covariance
    q: DMatrix<f32>,
}

impl KalmanFilter {
    /// Create a filter initialized from a first detection. Velocities start
    /// at zero with high uncertainty.
    pub fn new(bbox: &Bbox, meas_var: [f32; 4], proc_var: [f32; 8]) -> Self {
        let z = bbox.to_xyah();
        let x = DVector::from_vec(vec![z[0], z[1], z[2], z[3], 0.0, 0.0, 0.0, 0.0]);

        let p = DMatrix::from_diagonal(&DVector::from_vec(vec![
            INIT_POS_VAR,
            INIT_POS_VAR,
            INIT_ASPECT_VAR,
            INIT_POS_VAR,
            INIT_VEL_VAR,
            INIT_VEL_VAR,
            INIT_ASPECT_VAR,
            INIT_VEL_VAR,
        ]));

        // Constant velocity: observed terms advance by their derivatives,
        // derivatives persist.
        let mut f = DMatrix::identity(DIM_X, DIM_X);
        for i in 0..DIM_Z {
            f[(i, i + DIM_Z)] = 1.0;
        }

        let mut h = DMatrix::zeros(DIM_Z, DIM_X);
        for i in 0..DIM_Z {
            h[(i, i)] = 1.0;
        }

        Self {
            x,
            p,
            f,
            h,
            r: DMatrix::from_diagonal(&DVector::from_vec(meas_var.to_vec())),
            q: DMatrix::from_diagonal(&DVector::from_vec(proc_var.to_vec())),
        }
    }

    /// Advance state and covariance by one time step
    pub fn predict(&mut self) {
        // Keep predicted height positive; a height collapsing through zero
        // would corrupt the aspect/height geometry.
        if self.x[3] + self.x[7] <= MIN_SIZE_EPS {
            self.x[7] = 0.0;
        }

        self.x = &self.f * &self.x;
        self.p = &self.f * &self.p * self.f.transpose() + &self.q;
    }

    /// Gain-weighted correction with a measurement (cx, cy, a, h)
    pub fn update(&mut self, z: &[f32; 4]) -> Result<()> {
        let z = DVector::from_vec(z.to_vec());
        let y = z - &self.h * &self.x;

        let s = &self.h * &self.p * self.h.transpose() + &self.r;
        let s_inv = s
            .try_inverse()
            .ok_or_else(|| anyhow::anyhow!("singular innovation covariance"))?;
        let k = &self.p * self.h.transpose() * s_inv;

        self.x = &self.x + &k * &y;
        let i = DMatrix::identity(DIM_X, DIM_X);
        self.p = (i - &k * &self.h) * &self.p;

        Ok(())
    }

    /// Squared Mahalanobis distance between a measurement and the predicted
    /// measurement distribution. Returns infinity when the innovation
    /// covariance is degenerate, which rejects the pair at gating.
    pub fn gating_distance(&self, z: &[f32; 4]) -> f32 {
        let z = DVector::from_vec(z.to_vec());
        let y = z - &self.h * &self.x;
        let s = &self.h * &self.p * self.h.transpose() + &self.r;

        match s.try_inverse() {
            Some(s_inv) => {
                let v = &s_inv * &y;
                y.dot(&v)
            }
            None => f32::INFINITY,
        }
    }

    /// Current box estimate from the filter state
    pub fn bbox(&self) -> Bbox {
        Bbox::from_xyah(&[self.x[0], self.x[1], self.x[2], self.x[3]])
    }

    /// True if every state term is finite
    pub fn is_finite(&self) -> bool {
        self.x.iter().all(|v| v.is_finite()) && self.p.iter().all(|v| v.is_finite())
    }
}
