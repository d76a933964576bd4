//! Undersampling of time-dependent snapshot trajectories.
//!
//! A time-dependent truth solve produces one snapshot per time step. Before enriching a basis,
//! the trajectory can be restricted to a time window (e.g. to skip an initial transient) and
//! thinned to a coarser time step.

/// Same semantics as `numpy.isclose` with default tolerances.
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Index of the time step at time `t`, for a time step size `dt`.
fn time_index(t: f64, dt: f64) -> usize {
    let ratio = t / dt;
    let rounded = ratio.round();
    let index = if is_close(rounded, ratio) { rounded } else { ratio.floor() };
    index.max(0.0) as usize
}

/// Selects which time steps of a truth trajectory are used as snapshots.
///
/// By default every time step from the initial to the final time is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    t0: f64,
    dt: f64,
    t_final: f64,
    first_index: Option<usize>,
    delta_index: Option<usize>,
    last_index: Option<usize>,
}

impl TimeWindow {
    /// A window over the truth time discretization `t0, t0 + dt, ..., t_final`.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is not positive or `t_final < t0`.
    pub fn new(t0: f64, dt: f64, t_final: f64) -> Self {
        assert!(dt > 0.0, "Time step size must be positive.");
        assert!(t_final >= t0, "Final time must not precede the initial time.");
        Self {
            t0,
            dt,
            t_final,
            first_index: None,
            delta_index: None,
            last_index: None,
        }
    }

    /// Discards the time steps before `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` precedes the initial time of the truth problem.
    pub fn set_initial_time(&mut self, t: f64) {
        assert!(t >= self.t0, "Reduction initial time must not precede the truth initial time.");
        self.first_index = Some(time_index(t - self.t0, self.dt));
    }

    /// Keeps one time step every `dt`.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is not a multiple of the truth time step size.
    pub fn set_time_step_size(&mut self, dt: f64) {
        assert!(
            dt >= self.dt || is_close(dt, self.dt),
            "Reduction time step size must not be smaller than the truth time step size."
        );
        let delta_index = time_index(dt, self.dt);
        assert!(
            is_close(delta_index as f64 * self.dt, dt),
            "Reduction time step size should be a multiple of discretization time step size"
        );
        self.delta_index = Some(delta_index);
    }

    /// Discards the time steps after `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` exceeds the final time of the truth problem.
    pub fn set_final_time(&mut self, t: f64) {
        assert!(t <= self.t_final, "Reduction final time must not exceed the truth final time.");
        self.last_index = Some(time_index(t - self.t0, self.dt));
    }

    pub fn first_index(&self) -> usize {
        self.first_index.unwrap_or(0)
    }

    pub fn delta_index(&self) -> usize {
        self.delta_index.unwrap_or(1)
    }

    /// The last time step kept, if a final time was set.
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// The snapshots of `trajectory` inside the window, from the first to the last index
    /// (inclusive) with the configured stride.
    pub fn select<'a, T>(&self, trajectory: &'a [T]) -> impl Iterator<Item = &'a T> + 'a {
        let end = match self.last_index {
            Some(last) => (last + 1).min(trajectory.len()),
            None => trajectory.len(),
        };
        let start = self.first_index().min(end);
        trajectory[start..end].iter().step_by(self.delta_index())
    }
}
