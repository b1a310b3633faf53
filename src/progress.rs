//! Synthetic progress narration.
//!
//! Nothing here observes the model. Percent is a function of elapsed time
//! since `start`, decelerating as it climbs, and never reaches 100 until the
//! stream is reported complete.

use std::collections::BTreeSet;
use std::time::Duration;

/// Highest percent reachable while a request is still running.
pub const MAX_RUNNING_PERCENT: f64 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkingStep {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub insights: &'static [&'static str],
}

pub const STEPS: [ThinkingStep; 4] = [
    ThinkingStep {
        id: "analyze",
        title: "Analyzing your request",
        description: "Extracting key requirements and design goals",
        insights: &[
            "Identifying page structure based on content needs",
            "Determining appropriate color scheme from request",
            "Considering target audience and purpose",
            "Extracting brand personality elements",
        ],
    },
    ThinkingStep {
        id: "plan",
        title: "Planning layout structure",
        description: "Organizing content for optimal user experience",
        insights: &[
            "Arranging sections based on information hierarchy",
            "Creating logical navigation flow",
            "Planning responsive layout strategy",
            "Positioning content for balanced visual weight",
        ],
    },
    ThinkingStep {
        id: "design",
        title: "Designing visual elements",
        description: "Creating cohesive aesthetic and interactions",
        insights: &[
            "Selecting typography for readability and style",
            "Creating visual hierarchy through spacing and size",
            "Designing UI components with consistent styling",
            "Adding subtle animations and transitions",
        ],
    },
    ThinkingStep {
        id: "code",
        title: "Writing clean code",
        description: "Implementing designs with semantic HTML and CSS",
        insights: &[
            "Using semantic HTML elements for accessibility",
            "Writing efficient CSS with modern techniques",
            "Implementing responsive design patterns",
            "Organizing code for maintainability",
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarratorState {
    Idle,
    Running,
    Completing,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressState {
    pub percent: f64,
    pub current_step: usize,
    pub completed_steps: BTreeSet<usize>,
}

#[derive(Debug, Clone)]
pub struct ProgressNarrator {
    state: NarratorState,
    tick: Duration,
    insight_period: Duration,
    progress: ProgressState,
    ticks_applied: u64,
    insight_ticks: u64,
    insight_epoch: u64,
}

impl ProgressNarrator {
    pub fn new(tick: Duration, insight_period: Duration) -> Self {
        let floor = Duration::from_millis(1);
        Self {
            state: NarratorState::Idle,
            tick: tick.max(floor),
            insight_period: insight_period.max(floor),
            progress: ProgressState::default(),
            ticks_applied: 0,
            insight_ticks: 0,
            insight_epoch: 0,
        }
    }

    pub fn state(&self) -> NarratorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != NarratorState::Idle
    }

    pub fn snapshot(&self) -> &ProgressState {
        &self.progress
    }

    pub fn percent(&self) -> f64 {
        self.progress.percent
    }

    pub fn step(&self) -> &'static ThinkingStep {
        &STEPS[self.progress.current_step]
    }

    pub fn insight(&self) -> &'static str {
        let insights = self.step().insights;
        let n = self.insight_ticks.saturating_sub(self.insight_epoch) as usize;
        insights[n % insights.len()]
    }

    /// Idle → Running, from zero.
    pub fn start(&mut self) {
        self.reset();
        self.state = NarratorState::Running;
    }

    /// Catch up with the time elapsed since `start`.
    ///
    /// Returns whether anything visible changed. An `elapsed` earlier than a
    /// previous one is a no-op.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if self.state != NarratorState::Running {
            return false;
        }

        let before = (self.progress.clone(), self.insight());

        let due = ticks_in(elapsed, self.insight_period);
        if due > self.insight_ticks {
            self.insight_ticks = due;
        }

        let due = ticks_in(elapsed, self.tick);
        let mut percent = self.progress.percent;
        while self.ticks_applied < due {
            self.ticks_applied += 1;
            percent = next_percent(percent);
        }
        self.observe(percent);

        before != (self.progress.clone(), self.insight())
    }

    /// Feed an externally computed percent sample.
    ///
    /// Samples can arrive out of order; neither percent nor the active step
    /// ever moves backwards.
    pub fn observe(&mut self, sample: f64) {
        if self.state != NarratorState::Running || !sample.is_finite() {
            return;
        }
        let sample = sample.clamp(0.0, MAX_RUNNING_PERCENT);
        self.progress.percent = self.progress.percent.max(sample);
        self.move_to_bucket(sample);
    }

    /// Running → Completing: percent is forced to 100 and every step is done.
    pub fn complete(&mut self) {
        if self.state == NarratorState::Idle {
            return;
        }
        self.state = NarratorState::Completing;
        self.progress.percent = 100.0;
        self.progress.current_step = STEPS.len() - 1;
        self.progress.completed_steps = (0..STEPS.len()).collect();
    }

    /// Back to Idle; progress and step indices are discarded.
    pub fn finish(&mut self) {
        self.reset();
    }

    /// One line for plain terminals.
    pub fn status_line(&self) -> String {
        let step = self.step();
        format!(
            "[{:>3.0}%] {}/{} {}: {}",
            self.progress.percent.floor(),
            self.progress.current_step + 1,
            STEPS.len(),
            step.title,
            self.insight()
        )
    }

    fn move_to_bucket(&mut self, percent: f64) {
        let target = step_for_percent(percent);
        if target <= self.progress.current_step {
            return;
        }
        self.progress.completed_steps.extend(0..target);
        self.progress.current_step = target;
        self.insight_epoch = self.insight_ticks;
    }

    fn reset(&mut self) {
        self.state = NarratorState::Idle;
        self.progress = ProgressState::default();
        self.ticks_applied = 0;
        self.insight_ticks = 0;
        self.insight_epoch = 0;
    }
}

/// Equal-width buckets, one per step.
pub fn step_for_percent(percent: f64) -> usize {
    let width = 100.0 / STEPS.len() as f64;
    let idx = (percent.max(1.0) / width).floor() as usize;
    idx.min(STEPS.len() - 1)
}

fn next_percent(p: f64) -> f64 {
    let inc = if p < 25.0 {
        5.0
    } else if p < 50.0 {
        3.0
    } else if p < 75.0 {
        2.0
    } else if p < 90.0 {
        1.0
    } else {
        (100.0 - p) / 10.0
    };
    (p + inc).min(MAX_RUNNING_PERCENT)
}

fn ticks_in(elapsed: Duration, period: Duration) -> u64 {
    (elapsed.as_nanos() / period.as_nanos()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrator() -> ProgressNarrator {
        ProgressNarrator::new(Duration::from_millis(100), Duration::from_millis(1000))
    }

    #[test]
    fn starts_idle_and_ignores_time() {
        let mut n = narrator();
        assert_eq!(n.state(), NarratorState::Idle);
        assert!(!n.advance(Duration::from_secs(10)));
        assert_eq!(n.percent(), 0.0);
    }

    #[test]
    fn percent_and_step_never_decrease() {
        let mut n = narrator();
        n.start();
        let mut last = n.snapshot().clone();
        for ms in (0..60_000).step_by(37) {
            n.advance(Duration::from_millis(ms));
            let cur = n.snapshot();
            assert!(cur.percent >= last.percent);
            assert!(cur.current_step >= last.current_step);
            assert!(cur.percent <= MAX_RUNNING_PERCENT);
            last = cur.clone();
        }
        assert!(last.percent > 95.0);
        assert_eq!(last.current_step, 3);
    }

    #[test]
    fn increments_decelerate() {
        assert_eq!(next_percent(0.0), 5.0);
        assert_eq!(next_percent(30.0), 33.0);
        assert_eq!(next_percent(60.0), 62.0);
        assert_eq!(next_percent(80.0), 81.0);
        assert!((next_percent(90.0) - 91.0).abs() < 1e-9);
        assert_eq!(next_percent(98.9), MAX_RUNNING_PERCENT);
    }

    #[test]
    fn never_reaches_100_while_running() {
        let mut n = narrator();
        n.start();
        n.advance(Duration::from_secs(3600));
        assert_eq!(n.percent(), MAX_RUNNING_PERCENT);
        assert_eq!(n.state(), NarratorState::Running);
    }

    #[test]
    fn completion_forces_100() {
        let mut n = narrator();
        n.start();
        n.advance(Duration::from_millis(300));
        assert_eq!(n.percent(), 15.0);
        n.complete();
        assert_eq!(n.state(), NarratorState::Completing);
        assert_eq!(n.percent(), 100.0);
        assert_eq!(n.snapshot().current_step, 3);
        assert_eq!(n.snapshot().completed_steps.len(), 4);
        // No more ticking once completing.
        assert!(!n.advance(Duration::from_secs(5)));
        n.finish();
        assert_eq!(n.state(), NarratorState::Idle);
        assert_eq!(n.snapshot(), &ProgressState::default());
    }

    #[test]
    fn steps_visited_in_order_despite_jitter() {
        let mut n = narrator();
        n.start();
        let mut visited = vec![n.snapshot().current_step];
        for ms in (0..8_000).step_by(50) {
            n.advance(Duration::from_millis(ms));
            // A late sample from before the last bucket change.
            n.observe(n.percent() - 30.0);
            let step = n.snapshot().current_step;
            assert!(step >= *visited.last().unwrap());
            if step != *visited.last().unwrap() {
                visited.push(step);
            }
        }
        assert!(n.percent() > 90.0);
        assert_eq!(visited, vec![0, 1, 2, 3]);
    }

    #[test]
    fn ticks_continue_from_observed_percent() {
        let mut n = ProgressNarrator::new(Duration::from_millis(100), Duration::from_secs(3));
        n.start();
        n.observe(60.0);
        assert!(n.advance(Duration::from_millis(100)));
        assert_eq!(n.percent(), 62.0);
        assert_eq!(n.snapshot().current_step, 2);
        assert!(!n.advance(Duration::from_millis(50)));
    }

    #[test]
    fn lower_sample_does_not_regress() {
        let mut n = narrator();
        n.start();
        n.observe(60.0);
        assert_eq!(n.snapshot().current_step, 2);
        assert_eq!(n.snapshot().completed_steps, BTreeSet::from([0, 1]));
        n.observe(10.0);
        assert_eq!(n.snapshot().current_step, 2);
        assert_eq!(n.percent(), 60.0);
    }

    #[test]
    fn insights_cycle_and_reset_on_step_change() {
        let mut n = ProgressNarrator::new(Duration::from_secs(100), Duration::from_millis(1000));
        n.start();
        let insights = STEPS[0].insights;
        assert_eq!(n.insight(), insights[0]);
        n.advance(Duration::from_millis(1000));
        assert_eq!(n.insight(), insights[1]);
        n.advance(Duration::from_millis(4000));
        assert_eq!(n.insight(), insights[0]);

        n.observe(30.0);
        assert_eq!(n.insight(), STEPS[1].insights[0]);
        n.advance(Duration::from_millis(5000));
        assert_eq!(n.insight(), STEPS[1].insights[1]);
    }

    #[test]
    fn bucket_mapping() {
        assert_eq!(step_for_percent(0.0), 0);
        assert_eq!(step_for_percent(24.9), 0);
        assert_eq!(step_for_percent(25.0), 1);
        assert_eq!(step_for_percent(50.0), 2);
        assert_eq!(step_for_percent(75.0), 3);
        assert_eq!(step_for_percent(100.0), 3);
    }

    #[test]
    fn status_line_mentions_step_and_insight() {
        let mut n = narrator();
        n.start();
        n.advance(Duration::from_millis(500));
        assert_eq!(
            n.status_line(),
            "[ 25%] 2/4 Planning layout structure: Arranging sections based on information hierarchy"
        );
    }
}
