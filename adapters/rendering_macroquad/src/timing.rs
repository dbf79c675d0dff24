//! Once-per-second frame timing summaries printed with `--show-fps`.

use std::{collections::VecDeque, fmt, time::Duration};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const TRAILING_WINDOW: Duration = Duration::from_secs(10);

/// Wall-clock cost of one presented frame, split by stage.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FrameSample {
    pub(crate) frame: Duration,
    pub(crate) simulation: Duration,
    pub(crate) scene: Duration,
    pub(crate) render: Duration,
}

#[derive(Debug, Default)]
struct Totals {
    frames: u32,
    frame: Duration,
    simulation: Duration,
    scene: Duration,
    render: Duration,
}

impl Totals {
    fn add(&mut self, sample: FrameSample) {
        self.frames = self.frames.saturating_add(1);
        self.frame += sample.frame;
        self.simulation += sample.simulation;
        self.scene += sample.scene;
        self.render += sample.render;
    }
}

/// Frame rates and mean stage costs over the last reporting interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TimingSummary {
    pub(crate) fps: f32,
    pub(crate) trailing_fps: f32,
    pub(crate) simulation: Duration,
    pub(crate) scene: Duration,
    pub(crate) render: Duration,
}

impl fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = |duration: Duration| duration.as_secs_f64() * 1_000.0;
        write!(
            f,
            "fps {:.1} (10 s: {:.1}) | simulation {:.2} ms | scene {:.2} ms | render {:.2} ms",
            self.fps,
            self.trailing_fps,
            millis(self.simulation),
            millis(self.scene),
            millis(self.render),
        )
    }
}

/// Accumulates frame samples and summarises them every second.
#[derive(Debug, Default)]
pub(crate) struct FrameTimings {
    interval: Totals,
    trailing: VecDeque<Duration>,
    trailing_total: Duration,
}

impl FrameTimings {
    /// Records a frame; yields a summary once a full interval has elapsed.
    pub(crate) fn record(&mut self, sample: FrameSample) -> Option<TimingSummary> {
        self.interval.add(sample);
        self.trailing.push_back(sample.frame);
        self.trailing_total += sample.frame;
        while self.trailing_total > TRAILING_WINDOW {
            let Some(oldest) = self.trailing.pop_front() else {
                break;
            };
            self.trailing_total = self.trailing_total.saturating_sub(oldest);
        }

        if self.interval.frame < REPORT_INTERVAL {
            return None;
        }
        let interval = std::mem::take(&mut self.interval);
        let frames = interval.frames.max(1);
        let fps = frames as f32 / interval.frame.as_secs_f32();
        let trailing_fps = if self.trailing_total.is_zero() {
            fps
        } else {
            self.trailing.len() as f32 / self.trailing_total.as_secs_f32()
        };
        Some(TimingSummary {
            fps,
            trailing_fps,
            simulation: interval.simulation / frames,
            scene: interval.scene / frames,
            render: interval.render / frames,
        })
    }
}
