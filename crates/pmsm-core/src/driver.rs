use crate::sim::Simulation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub frame_rate: f64,
    /// Pace frames against the wall clock instead of running back-to-back.
    pub realtime: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            realtime: false,
        }
    }
}

impl DriverConfig {
    pub fn frame_time(&self) -> Duration {
        if self.frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Clone, Default, Debug)]
pub struct RunStats {
    pub frames_executed: u64,
    pub frames_late: u64,
    pub max_lag_us: u64,
}

/// Steps a `Simulation` sequentially; each step runs to completion before
/// the next one starts.
pub struct FrameDriver<S: Simulation> {
    sim: S,
    config: DriverConfig,
    stats: RunStats,
}

impl<S: Simulation> FrameDriver<S> {
    pub fn new(sim: S, config: DriverConfig) -> Self {
        Self {
            sim,
            config,
            stats: RunStats::default(),
        }
    }

    /// Runs until `frames` have executed (or forever when `None`) or `stop`
    /// is raised. `on_frame` sees the simulation after each step and may
    /// reconfigure it before the next one.
    pub fn run<F>(&mut self, frames: Option<u64>, stop: &AtomicBool, mut on_frame: F)
    where
        F: FnMut(u64, &mut S),
    {
        let frame_time = self.config.frame_time();
        let mut next_frame = Instant::now();
        let mut frame = 0u64;

        while !stop.load(Ordering::Relaxed) && frames.map_or(true, |limit| frame < limit) {
            if self.config.realtime {
                let now = Instant::now();
                if now < next_frame {
                    thread::sleep(next_frame - now);
                } else if frame > 0 {
                    let lag = now.duration_since(next_frame);
                    if lag > frame_time {
                        self.stats.frames_late += 1;
                    }
                    self.stats.max_lag_us = self.stats.max_lag_us.max(lag.as_micros() as u64);
                }
            }

            self.sim.step(self.config.frame_rate);
            on_frame(frame, &mut self.sim);

            self.stats.frames_executed += 1;
            frame += 1;
            next_frame += frame_time;
        }
    }

    pub fn simulation(&self) -> &S {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_inner(self) -> S {
        self.sim
    }
}
