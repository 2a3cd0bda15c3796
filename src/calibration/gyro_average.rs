//! Continuous gyroscope calibration.
//!
//! The gyro bias drifts slowly, so it is estimated from the average of all
//! samples over a long horizon (ten minutes by default). Storing every sample
//! is not an option, so samples are summed into a ring of windows instead.
//! Each window holds `horizon / (WINDOW_COUNT - 2)` samples; the spare windows
//! make sure the ring always spans at least the full horizon while the newest
//! window fills up. The average is a weighted mean of the window means, which
//! approximates a sliding window over the horizon.

/// Number of accumulation windows in the ring
pub const WINDOW_COUNT: usize = 16;
/// Default averaging horizon in seconds
pub const DEFAULT_HORIZON_SECONDS: u32 = 600;

/// Running sum of the samples that fell into one window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroAverageWindow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub samples: u32,
}

/// Streaming weighted average of gyroscope samples
#[derive(Debug, Clone)]
pub struct GyroAverager {
    windows: [GyroAverageWindow; WINDOW_COUNT],
    front: usize,
    sample_rate: u32,
    horizon_seconds: u32,
}

impl GyroAverager {
    /// Create an averager for a device pushing `sample_rate` samples per
    /// second, averaging over `horizon_seconds`
    pub fn new(sample_rate: u32, horizon_seconds: u32) -> Self {
        Self {
            windows: [GyroAverageWindow::default(); WINDOW_COUNT],
            front: 0,
            sample_rate,
            horizon_seconds,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn horizon_seconds(&self) -> u32 {
        self.horizon_seconds
    }

    /// Change the averaging horizon. Samples already collected are kept.
    pub fn set_horizon_seconds(&mut self, horizon_seconds: u32) {
        self.horizon_seconds = horizon_seconds;
    }

    /// Number of samples covering the whole horizon
    pub fn total_samples(&self) -> u32 {
        self.sample_rate.saturating_mul(self.horizon_seconds)
    }

    /// Number of samples a single window holds before it is retired
    pub fn window_capacity(&self) -> u32 {
        self.total_samples() / (WINDOW_COUNT as u32 - 2)
    }

    /// Index of the window currently being filled
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// Read-only view of the ring
    pub fn windows(&self) -> &[GyroAverageWindow; WINDOW_COUNT] {
        &self.windows
    }

    /// Add a sample to the front window, starting a new window first if the
    /// current one is full
    pub fn push(&mut self, x: f32, y: f32, z: f32) {
        if self.windows[self.front].samples >= self.window_capacity() {
            self.front = (self.front + WINDOW_COUNT - 1) % WINDOW_COUNT;
            self.windows[self.front] = GyroAverageWindow::default();
        }

        let window = &mut self.windows[self.front];
        window.samples += 1;
        window.x += x as f64;
        window.y += y as f64;
        window.z += z as f64;
    }

    /// Weighted average of the collected samples as `[x, y, z]`, or `None`
    /// if no samples have been pushed since the last reset.
    ///
    /// Windows are visited from the newest one outwards until the horizon is
    /// covered. A window that holds more samples than are still needed only
    /// contributes the needed share. Any other window is weighted by how full
    /// it is, so a window that just started counts for little.
    pub fn average(&self) -> Option<[f32; 3]> {
        let mut wanted = self.total_samples() as i64;
        let per_window = self.window_capacity() as f64;

        let mut weight = 0.0;
        let mut total = [0.0f64; 3];
        for i in 0..WINDOW_COUNT {
            if wanted <= 0 {
                break;
            }
            let window = &self.windows[(self.front + i) % WINDOW_COUNT];
            if window.samples == 0 {
                continue;
            }

            let samples = window.samples as f64;
            let this_weight = if wanted < window.samples as i64 {
                let w = wanted as f64 / samples;
                wanted = 0;
                w
            } else {
                wanted -= window.samples as i64;
                if per_window > 0.0 {
                    samples / per_window
                } else {
                    1.0
                }
            };

            total[0] += (window.x / samples) * this_weight;
            total[1] += (window.y / samples) * this_weight;
            total[2] += (window.z / samples) * this_weight;
            weight += this_weight;
        }

        if weight > 0.0 {
            Some(total.map(|t| (t / weight) as f32))
        } else {
            None
        }
    }

    /// Discard every collected sample
    pub fn reset(&mut self) {
        self.windows = [GyroAverageWindow::default(); WINDOW_COUNT];
        self.front = 0;
    }
}
