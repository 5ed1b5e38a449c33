use nalgebra::DVector;

use crate::polytope::Polytope;

/// Outcome of a billiard reflection: whether the trajectory settled inside
/// the polytope within the reflection budget, how many bounces it took, and
/// the resulting point (the unreflected end point, if the budget ran out).
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    pub converged: bool,
    pub num_reflections: u64,
    pub point: DVector<f64>,
}

/// Elastic-billiard reflection of a straight-line trajectory into a
/// polytope. Ported term-for-term from the reference Reflector: each bounce
/// subtracts twice the trajectory's projection onto the violated
/// constraint's normal, and the distance already travelled is accumulated
/// with Kahan summation so that many bounces don't erode the remaining
/// trajectory length through repeated rounding.
pub struct Reflector;

impl Reflector {
    pub const TOLERANCE: f64 = 1e-15;

    pub fn reflect_into_polytope(
        polytope: &Polytope,
        start_point: &DVector<f64>,
        end_point: &DVector<f64>,
        max_number_of_reflections: u64,
    ) -> ReflectionOutcome {
        let mut current_point = start_point.clone();
        let trajectory = end_point - start_point;

        let mut trajectory_length = trajectory.norm();
        let original_trajectory_length = trajectory_length;

        if trajectory_length == 0.0 {
            return ReflectionOutcome {
                converged: true,
                num_reflections: 0,
                point: current_point,
            };
        }

        let mut trajectory_direction = trajectory / trajectory_length;

        // Kahan summation accumulators for the cumulative travelled distance.
        let mut distance_travelled = 0.0_f64;
        let mut distance_travelled_error = 0.0_f64;

        let a = polytope.a();
        let mut slacks = polytope.slacks(start_point);
        let n = slacks.len();
        let mut active_constraints = vec![1.0_f64; n];

        let mut num_reflections: u64 = 0;
        loop {
            let a_dir = a.mul_vec(&trajectory_direction);
            let mut max_inverse_distance = -1.0_f64;
            for i in 0..n {
                let v = active_constraints[i] * (a_dir[i] / slacks[i]);
                let v = if v.is_finite() { v } else { -1.0 };
                if v > max_inverse_distance {
                    max_inverse_distance = v;
                }
            }
            let mut distance_to_border = 1.0 / max_inverse_distance;
            if distance_to_border < 0.0 {
                distance_to_border = f64::MAX;
            }

            if trajectory_length < distance_to_border {
                current_point += &trajectory_direction * trajectory_length;
                trajectory_length = 0.0;
            } else {
                num_reflections += 1;
                let y = distance_to_border - distance_travelled_error;
                let t = distance_travelled + y;
                distance_travelled_error = (t - distance_travelled) - y;
                distance_travelled = t;

                trajectory_length = original_trajectory_length - distance_travelled;
                current_point += &trajectory_direction * distance_to_border;
                slacks -= a.mul_vec(&trajectory_direction) * distance_to_border;

                for i in 0..n {
                    if slacks[i] <= Self::TOLERANCE {
                        active_constraints[i] = 0.0;
                        let row_i = a.row(i);
                        let denom = a.row_squared_norm(i);
                        let scale = 2.0 * trajectory_direction.dot(&row_i) / denom;
                        trajectory_direction -= scale * &row_i;
                    } else {
                        active_constraints[i] = 1.0;
                    }
                }
            }

            if !(trajectory_length > 0.0 && num_reflections < max_number_of_reflections) {
                break;
            }
        }

        if num_reflections < max_number_of_reflections {
            ReflectionOutcome {
                converged: true,
                num_reflections,
                point: current_point,
            }
        } else {
            ReflectionOutcome {
                converged: false,
                num_reflections,
                point: end_point.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polytope::PolytopeMatrix;
    use nalgebra::DMatrix;

    fn unit_square() -> Polytope {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        Polytope::new(PolytopeMatrix::Dense(a), b).unwrap()
    }

    #[test]
    fn trajectory_inside_polytope_is_unchanged() {
        let p = unit_square();
        let start = DVector::from_vec(vec![0.0, 0.0]);
        let end = DVector::from_vec(vec![0.5, 0.0]);
        let outcome = Reflector::reflect_into_polytope(&p, &start, &end, 1000);
        assert!(outcome.converged);
        assert_eq!(outcome.num_reflections, 0);
        assert!((outcome.point - end).norm() < 1e-12);
    }

    #[test]
    fn trajectory_reflects_off_single_wall() {
        let p = unit_square();
        let start = DVector::from_vec(vec![0.0, 0.0]);
        // Straight shot toward x=1 that overshoots by 0.5: must bounce back.
        let end = DVector::from_vec(vec![1.5, 0.0]);
        let outcome = Reflector::reflect_into_polytope(&p, &start, &end, 1000);
        assert!(outcome.converged);
        assert_eq!(outcome.num_reflections, 1);
        assert!((outcome.point[0] - 0.5).abs() < 1e-9);
        assert!(outcome.point[1].abs() < 1e-9);
    }

    #[test]
    fn reflection_budget_can_be_exceeded() {
        let p = unit_square();
        let start = DVector::from_vec(vec![0.0, 0.0]);
        let end = DVector::from_vec(vec![100.5, 0.0]);
        let outcome = Reflector::reflect_into_polytope(&p, &start, &end, 2);
        assert!(!outcome.converged);
        assert!((outcome.point - end).norm() < 1e-12);
    }
}
