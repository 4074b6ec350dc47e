//! Worm body model.
//!
//! The worm is a chain of rigid segments joined by two-axis joints (horizontal yaw and
//! vertical pitch). Joints chase their target angles at a bounded speed. Locomotion
//! follows resistive force theory: every segment feels a drag force proportional to its
//! velocity, with different coefficients along and across the segment. In water all
//! segments feel drag; on land only segments resting on the ground feel friction.
//! Inertia is neglected, so at every substep the planar velocity and turning rate of the
//! body are the ones that make the total force and torque vanish.

use nalgebra::{vector, Matrix2, Matrix2x3, Matrix3, Rotation2, Vector2, Vector3};

use crate::config::simulation_config::SimulationConfig;

const SINGULAR_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Segment {
    /// Centre in the body frame, centred on the planar centre of mass.
    center: Vector3<f64>,
    /// Horizontal unit tangent in the body frame.
    tangent: Vector2<f64>,
    /// Height above the lowest segment.
    height: f64,
}

#[derive(Clone, Debug)]
pub struct Worm {
    yaw: Vec<f64>,
    pitch: Vec<f64>,
    position: Vector2<f64>,
    heading: f64,
    shape: Vec<Segment>,
    segment_length: f64,
    segment_radius: f64,
    max_yaw: f64,
    max_pitch: f64,
    joint_speed: f64,
    aquatic: bool,
    tangential_drag: f64,
    normal_drag: f64,
}

impl Worm {
    /// A straight worm at the origin, heading along +x.
    pub fn new(config: &SimulationConfig) -> Self {
        let (tangential_drag, normal_drag) = if config.aquatic {
            (config.water_tangential_drag, config.water_normal_drag)
        } else {
            (config.ground_tangential_friction, config.ground_normal_friction)
        };

        let mut worm = Worm {
            yaw: vec![0.0; config.num_joints],
            pitch: vec![0.0; config.num_joints],
            position: Vector2::zeros(),
            heading: 0.0,
            shape: Vec::new(),
            segment_length: config.segment_length,
            segment_radius: config.segment_radius,
            max_yaw: config.max_yaw,
            max_pitch: config.max_pitch,
            joint_speed: config.joint_speed,
            aquatic: config.aquatic,
            tangential_drag,
            normal_drag,
        };
        worm.shape = worm.body_shape();
        worm
    }

    /// Planar distance of the centre of mass from the start.
    pub fn displacement(&self) -> f64 {
        self.position.norm()
    }

    /// Normalised joint angles (yaw and pitch per joint) followed by one sensor per
    /// segment: ground contact on land, relative height in water.
    pub fn sensors(&self) -> Vec<f64> {
        let mut sensors = Vec::with_capacity(self.yaw.len() * 3 + 1);

        for (yaw, pitch) in self.yaw.iter().zip(&self.pitch) {
            sensors.push(normalise(*yaw, self.max_yaw));
            sensors.push(normalise(*pitch, self.max_pitch));
        }

        if self.aquatic {
            let mean_z = self.shape.iter().map(|s| s.center.z).sum::<f64>() / self.shape.len() as f64;
            sensors.extend(
                self.shape
                    .iter()
                    .map(|s| ((s.center.z - mean_z) / self.segment_length).clamp(-1.0, 1.0)),
            );
        } else {
            sensors.extend(self.shape.iter().map(|s| if self.in_contact(s) { 1.0 } else { 0.0 }));
        }

        sensors
    }

    /// Advance by `h` seconds with joint targets in [-1, 1], two per joint (yaw, pitch).
    pub fn step(&mut self, targets: &[f64], h: f64) {
        let max_delta = self.joint_speed * h;
        for j in 0..self.yaw.len() {
            let yaw_target = targets.get(2 * j).copied().unwrap_or(0.0).clamp(-1.0, 1.0) * self.max_yaw;
            let pitch_target = targets.get(2 * j + 1).copied().unwrap_or(0.0).clamp(-1.0, 1.0) * self.max_pitch;
            self.yaw[j] += (yaw_target - self.yaw[j]).clamp(-max_delta, max_delta);
            self.pitch[j] += (pitch_target - self.pitch[j]).clamp(-max_delta, max_delta);
        }

        let new_shape = self.body_shape();
        let old_shape = std::mem::replace(&mut self.shape, new_shape);
        let velocity = self.solve_body_velocity(&old_shape, h);

        self.position += velocity.xy() * h;
        self.heading += velocity.z * h;
    }

    /// World coordinates of every segment centre, head first.
    pub fn segment_positions(&self) -> Vec<Vector3<f64>> {
        let rotation = Rotation2::new(self.heading);
        self.shape
            .iter()
            .map(|s| {
                let planar = self.position + rotation * s.center.xy();
                let z = if self.aquatic { s.center.z } else { s.height + self.segment_radius };
                vector![planar.x, planar.y, z]
            })
            .collect()
    }

    fn in_contact(&self, segment: &Segment) -> bool {
        segment.height < self.segment_radius
    }

    fn body_shape(&self) -> Vec<Segment> {
        let mut segments = Vec::with_capacity(self.yaw.len() + 1);
        let (mut point, mut yaw, mut pitch) = (Vector3::<f64>::zeros(), 0.0f64, 0.0f64);

        for i in 0..=self.yaw.len() {
            if i > 0 {
                yaw += self.yaw[i - 1];
                pitch += self.pitch[i - 1];
            }
            let direction = vector![pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin()];
            let center = point - direction * (self.segment_length / 2.0);
            point -= direction * self.segment_length;
            segments.push(Segment {
                center,
                tangent: vector![yaw.cos(), yaw.sin()],
                height: 0.0,
            });
        }

        let n = segments.len() as f64;
        let mean = segments.iter().map(|s| s.center.xy()).sum::<Vector2<f64>>() / n;
        let min_z = segments.iter().map(|s| s.center.z).fold(f64::INFINITY, f64::min);
        for s in segments.iter_mut() {
            s.center.x -= mean.x;
            s.center.y -= mean.y;
            s.height = s.center.z - min_z;
        }

        segments
    }

    /// Planar velocity and turning rate `(vx, vy, omega)` that balance the drag forces
    /// while the body deforms from `old_shape` to the current shape over `h` seconds.
    ///
    /// A segment at body offset `r` moves with `J q + u`, where `q` is the body velocity,
    /// `J = [I | perp(r)]` and `u` its deformation velocity. Its drag is `-K (J q + u)` with
    /// `K = ct t t^T + cn (I - t t^T)`, so the balance is `sum(J^T K J) q = -sum(J^T K u)`.
    fn solve_body_velocity(&self, old_shape: &[Segment], h: f64) -> Vector3<f64> {
        let rotation = Rotation2::new(self.heading);
        let (ct, cn) = (self.tangential_drag, self.normal_drag);

        let mut m = Matrix3::zeros();
        let mut b = Vector3::zeros();

        for (new, old) in self.shape.iter().zip(old_shape) {
            if !self.aquatic && !self.in_contact(new) {
                continue;
            }

            let r = rotation * new.center.xy();
            let t = rotation * new.tangent;
            let u = rotation * ((new.center.xy() - old.center.xy()) / h);

            let tt = t * t.transpose();
            let k = tt * ct + (Matrix2::identity() - tt) * cn;
            let jacobian = Matrix2x3::new(1.0, 0.0, -r.y, 0.0, 1.0, r.x);

            m += jacobian.transpose() * k * jacobian;
            b -= jacobian.transpose() * (k * u);
        }

        solve_balance(&m, &b).unwrap_or_else(Vector3::zeros)
    }
}

fn normalise(angle: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        (angle / limit).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// `None` when the system is singular (e.g. nothing touches the ground).
fn solve_balance(m: &Matrix3<f64>, b: &Vector3<f64>) -> Option<Vector3<f64>> {
    let scale = m.norm();
    if scale == 0.0 || m.determinant().abs() < SINGULAR_EPS * scale.powi(3) {
        return None;
    }

    m.lu().solve(b)
}

#[cfg(test)]
mod worm_tests {
    use super::*;

    fn config(aquatic: bool) -> SimulationConfig {
        SimulationConfig {
            num_joints: 6,
            aquatic,
            ..SimulationConfig::default()
        }
    }

    /// Travelling wave of yaw targets along the body.
    fn wave(joints: usize, t: f64) -> Vec<f64> {
        (0..joints)
            .flat_map(|j| {
                let phase = 2.0 * std::f64::consts::PI * (t - j as f64 / joints as f64);
                [phase.sin(), 0.0]
            })
            .collect()
    }

    #[test]
    fn straight_worm_does_not_move() {
        let mut worm = Worm::new(&config(false));
        for _ in 0..100 {
            worm.step(&vec![0.0; 12], 0.005);
        }

        assert!(worm.displacement() < 1e-12);
    }

    #[test]
    fn sensor_count_matches_body() {
        let worm = Worm::new(&config(false));
        let sensors = worm.sensors();

        assert_eq!(sensors.len(), 6 * 3 + 1);
        assert!(sensors[12..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn joints_respect_speed_limit() {
        let cfg = config(false);
        let mut worm = Worm::new(&cfg);
        worm.step(&vec![1.0; 12], 0.01);

        let max_step = cfg.joint_speed * 0.01 / cfg.max_yaw;
        assert!(worm.sensors()[0] <= max_step + 1e-12);
    }

    #[test]
    fn travelling_wave_propels_worm() {
        for aquatic in [false, true] {
            let mut worm = Worm::new(&config(aquatic));
            let h = 0.005;
            let mut furthest: f64 = 0.0;
            for step in 0..2000 {
                worm.step(&wave(6, step as f64 * h), h);
                furthest = furthest.max(worm.displacement());
            }

            assert!(furthest > 0.01, "aquatic={} displacement={}", aquatic, furthest);
        }
    }

    #[test]
    fn lifted_segments_lose_contact() {
        let mut worm = Worm::new(&config(false));
        let mut targets = vec![0.0; 12];
        targets[1] = 1.0;
        for _ in 0..100 {
            worm.step(&targets, 0.01);
        }

        let contacts = &worm.sensors()[12..];
        assert!(contacts.iter().any(|&c| c == 0.0));
        assert!(contacts.iter().any(|&c| c == 1.0));
    }

    #[test]
    fn balance_solves_diagonal_system() {
        let m = Matrix3::from_diagonal(&vector![1.0, 2.0, 4.0]);
        let x = solve_balance(&m, &vector![1.0, 1.0, 1.0]).unwrap();

        assert!((x - vector![1.0, 0.5, 0.25]).norm() < 1e-12);
        assert_eq!(solve_balance(&Matrix3::zeros(), &vector![1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn resting_worm_keeps_its_pose() {
        let cfg = config(false);
        let mut worm = Worm::new(&cfg);
        let before = worm.segment_positions();
        worm.step(&vec![0.0; 12], 0.01);

        let after = worm.segment_positions();
        assert!(before.iter().zip(&after).all(|(a, b)| (a - b).norm() < 1e-12));
    }
}
