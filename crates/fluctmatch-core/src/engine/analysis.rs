use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::frame::Frame;
use tracing::debug;

/// Selects frames `start, start + step, ...` up to (excluding) `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub stop: Option<usize>,
    pub step: usize,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }
}

impl FrameRange {
    pub fn new(start: usize, stop: Option<usize>, step: usize) -> Result<Self, EngineError> {
        if step == 0 {
            return Err(EngineError::InvalidStep(step));
        }
        Ok(Self { start, stop, step })
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start
            && self.stop.is_none_or(|stop| index < stop)
            && (index - self.start) % self.step == 0
    }

    /// Number of frames selected from a trajectory of `n_frames` frames.
    pub fn n_selected(&self, n_frames: usize) -> usize {
        let end = self.stop.map_or(n_frames, |stop| stop.min(n_frames));
        if end <= self.start {
            return 0;
        }
        (end - self.start).div_ceil(self.step)
    }
}

/// A per-frame trajectory analysis.
///
/// `single_frame` is called once per selected frame, in trajectory order;
/// `conclude` turns the accumulated state into the result.
pub trait FrameAnalysis {
    type Output;

    /// Number of atoms every frame must contain.
    fn n_atoms(&self) -> usize;

    fn single_frame(&mut self, frame: &Frame);

    fn conclude(self) -> Self::Output;
}

/// Runs two analyses over the same frames.
impl<A: FrameAnalysis, B: FrameAnalysis> FrameAnalysis for (A, B) {
    type Output = (A::Output, B::Output);

    fn n_atoms(&self) -> usize {
        self.0.n_atoms()
    }

    fn single_frame(&mut self, frame: &Frame) {
        self.0.single_frame(frame);
        self.1.single_frame(frame);
    }

    fn conclude(self) -> Self::Output {
        (self.0.conclude(), self.1.conclude())
    }
}

/// Drives `analysis` over the frames selected by `range`.
///
/// Frames past `stop` are never read. Frame errors and atom-count mismatches
/// abort the run.
pub fn run_analysis<A, I, E>(
    mut analysis: A,
    frames: I,
    range: &FrameRange,
    reporter: &ProgressReporter,
) -> Result<A::Output, EngineError>
where
    A: FrameAnalysis,
    I: IntoIterator<Item = Result<Frame, E>>,
    EngineError: From<E>,
{
    let frames = frames.into_iter();
    if let Some(n_frames) = frames.size_hint().1 {
        reporter.report(Progress::TaskStart {
            total_steps: range.n_selected(n_frames) as u64,
        });
    }

    let mut processed = 0usize;
    for (index, frame) in frames.enumerate() {
        if range.stop.is_some_and(|stop| index >= stop) {
            break;
        }
        let frame = frame?;
        if !range.contains(index) {
            continue;
        }
        if frame.n_atoms() != analysis.n_atoms() {
            return Err(EngineError::AtomCount {
                expected: analysis.n_atoms(),
                found: frame.n_atoms(),
            });
        }
        analysis.single_frame(&frame);
        processed += 1;
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    if processed == 0 {
        return Err(EngineError::NoFrames);
    }
    debug!(frames = processed, "Frame analysis finished");
    Ok(analysis.conclude())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::convert::Infallible;

    struct FrameCounter {
        seen: Vec<f64>,
    }

    impl FrameAnalysis for FrameCounter {
        type Output = Vec<f64>;

        fn n_atoms(&self) -> usize {
            1
        }

        fn single_frame(&mut self, frame: &Frame) {
            self.seen.push(frame.positions[0].x);
        }

        fn conclude(self) -> Vec<f64> {
            self.seen
        }
    }

    fn frames(n: usize) -> Vec<Result<Frame, Infallible>> {
        (0..n)
            .map(|i| Ok(Frame::new(vec![Point3::new(i as f64, 0.0, 0.0)])))
            .collect()
    }

    #[test]
    fn range_selects_start_stop_and_step() {
        let range = FrameRange::new(1, Some(8), 3).unwrap();
        let seen = run_analysis(
            FrameCounter { seen: vec![] },
            frames(10),
            &range,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(seen, vec![1.0, 4.0, 7.0]);
        assert_eq!(range.n_selected(10), 3);
        assert_eq!(range.n_selected(5), 2);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            FrameRange::new(0, None, 0),
            Err(EngineError::InvalidStep(0))
        ));
    }

    #[test]
    fn empty_selection_is_an_error() {
        let range = FrameRange::new(20, None, 1).unwrap();
        let result = run_analysis(
            FrameCounter { seen: vec![] },
            frames(5),
            &range,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::NoFrames)));
    }

    #[test]
    fn atom_count_mismatch_is_an_error() {
        let bad: Vec<Result<Frame, Infallible>> = vec![Ok(Frame::new(vec![Point3::origin(); 2]))];
        let result = run_analysis(
            FrameCounter { seen: vec![] },
            bad,
            &FrameRange::default(),
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::AtomCount {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn paired_analyses_see_the_same_frames() {
        let pair = (FrameCounter { seen: vec![] }, FrameCounter { seen: vec![] });
        let range = FrameRange::new(0, Some(4), 2).unwrap();
        let (a, b) = run_analysis(pair, frames(6), &range, &ProgressReporter::new()).unwrap();
        assert_eq!(a, vec![0.0, 2.0]);
        assert_eq!(a, b);
    }
}
