//! Derivative-free minimisation (Nelder–Mead simplex).

use std::time::Instant;

use crate::forecast::utility::{mean, stddev};

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    IterationLimit,
    Deadline,
}

/// Best point found by [`NelderMead::minimize`].
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub stop: StopReason,
}

/// Nelder–Mead with the standard coefficients (reflection 1, expansion 2,
/// contraction 0.5, shrink 0.5).
#[derive(Debug, Clone)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Convergence threshold on the spread of function values and on the
    /// simplex diameter.
    pub tolerance: f64,
    pub initial_step: f64,
    pub deadline: Option<Instant>,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-8,
            initial_step: 0.1,
            deadline: None,
        }
    }
}

impl NelderMead {
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_nan() { f64::INFINITY } else { v }
        };

        if n == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                stop: StopReason::Converged,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let stop = loop {
            order(&mut simplex, &mut values);

            if self.converged(&simplex, &values) {
                break StopReason::Converged;
            }
            if iterations >= self.max_iterations {
                break StopReason::IterationLimit;
            }
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break StopReason::Deadline;
            }
            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let worst = simplex[n].clone();
            let (f_best, f_second_worst, f_worst) = (values[0], values[n - 1], values[n]);

            let reflected = along(&centroid, &worst, -1.0);
            let f_reflected = eval(&reflected);

            if f_reflected < f_best {
                let expanded = along(&centroid, &worst, -2.0);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < f_second_worst {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            let (contracted, accept_if_below) = if f_reflected < f_worst {
                (along(&centroid, &worst, -0.5), f_reflected)
            } else {
                (along(&centroid, &worst, 0.5), f_worst)
            };
            let f_contracted = eval(&contracted);
            if f_contracted < accept_if_below {
                simplex[n] = contracted;
                values[n] = f_contracted;
                continue;
            }

            // shrink towards the best vertex
            let best = simplex[0].clone();
            for i in 1..=n {
                simplex[i] = along(&best, &simplex[i], 0.5);
                values[i] = eval(&simplex[i]);
            }
        };

        Minimum {
            point: simplex.swap_remove(0),
            value: values[0],
            iterations,
            stop,
        }
    }

    fn converged(&self, simplex: &[Vec<f64>], values: &[f64]) -> bool {
        if values.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let spread = stddev(values, mean(values));
        let diameter = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        spread <= self.tolerance && diameter <= self.tolerance.sqrt()
    }
}

/// Sorts vertices by ascending function value.
fn order(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = idx.iter().map(|&i| simplex[i].clone()).collect();
    *values = idx.iter().map(|&i| values[i]).collect();
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let dim = points[0].len();
    let mut c = vec![0.0; dim];
    for p in points {
        for (ci, pi) in c.iter_mut().zip(p) {
            *ci += pi;
        }
    }
    let count = points.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= count);
    c
}

/// `origin + t * (target - origin)`.
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| o + t * (x - o))
        .collect()
}
