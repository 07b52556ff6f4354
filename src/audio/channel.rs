use crate::audio::filters::{OnePoleFilter, OnePoleMode};
use crate::audio::sounds::SoundId;
use crate::audio::transients::{TransientKind, TransientVoice};
use crate::audio::{sec_to_samples, AudioProcessor, StereoAudioGenerator};

/// Outcome of tearing a channel down. Double disposal is a normal, named
/// result: a timed teardown can race an explicit stop, and both must win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeOutcome {
    Disposed,
    AlreadyDisposed,
}

/// A recurring transient task owned by its channel. On firing it spawns one
/// burst and reschedules itself with a fresh random gap, but only while the
/// channel is alive; disposal cancels the whole pending list.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledTask {
    pub due: u64,
    pub kind: TransientKind,
    pub min_gap: f32,
    pub max_gap: f32,
}

impl ScheduledTask {
    pub fn new(due: u64, kind: TransientKind, min_gap: f32, max_gap: f32) -> Self {
        Self {
            due,
            kind,
            min_gap,
            max_gap,
        }
    }
}

/// One currently-playing ambient sound: the gain stage every sample passes
/// through, the looped bed generator, in-flight transient voices, and the
/// pending task list. All mutable state of a sound lives here; builders
/// keep nothing of their own.
pub struct Channel {
    id: SoundId,
    gain: f32,
    // Applied gain trails the target through a one-pole so starts and
    // volume moves do not click.
    gain_smoother: OnePoleFilter,
    alive: bool,
    bed: Box<dyn StereoAudioGenerator>,
    voices: Vec<TransientVoice>,
    pending: Vec<ScheduledTask>,
    rng: fastrand::Rng,
    sample_rate: f32,
}

const GAIN_SMOOTHING_HZ: f32 = 10.0;

impl Channel {
    pub fn new(
        id: SoundId,
        gain: f32,
        bed: Box<dyn StereoAudioGenerator>,
        sample_rate: f32,
    ) -> Self {
        Self {
            id,
            gain: gain.clamp(0.0, 1.0),
            gain_smoother: OnePoleFilter::new(GAIN_SMOOTHING_HZ, OnePoleMode::Lowpass, sample_rate),
            alive: true,
            bed,
            voices: Vec::new(),
            pending: Vec::new(),
            rng: fastrand::Rng::new(),
            sample_rate,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn schedule(&mut self, task: ScheduledTask) {
        self.pending.push(task);
    }

    #[cfg(test)]
    pub(crate) fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    /// Fire every task that has come due. A task firing after disposal (it
    /// was queued before the channel died) must neither spawn a voice nor
    /// reschedule itself; the alive check is that guard.
    fn fire_due_tasks(&mut self, now: u64) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due > now {
                i += 1;
                continue;
            }
            let task = self.pending.swap_remove(i);
            if !self.alive {
                continue;
            }
            self.voices
                .push(TransientVoice::new(task.kind, self.sample_rate, &mut self.rng));
            let gap = task.min_gap + self.rng.f32() * (task.max_gap - task.min_gap);
            self.pending.push(ScheduledTask {
                due: now + sec_to_samples(gap, self.sample_rate).max(1),
                ..task
            });
            // swap_remove moved an unexamined task into slot i; revisit it
        }
    }

    /// Render one frame at engine clock `now`, post-gain.
    pub fn next_frame(&mut self, now: u64) -> (f32, f32) {
        if !self.alive {
            return (0.0, 0.0);
        }

        self.fire_due_tasks(now);

        let (mut left, mut right) = self.bed.next_sample();
        for voice in &mut self.voices {
            let (l, r) = voice.next_frame();
            left += l;
            right += r;
        }
        self.voices.retain(|v| !v.is_finished());

        let gain = self.gain_smoother.process(self.gain);
        (left * gain, right * gain)
    }

    /// Tear the channel down: mark it dead, cancel every pending task, and
    /// drop every owned voice. Disposal is the only cancellation mechanism
    /// for a channel's tasks.
    pub fn dispose(&mut self) -> DisposeOutcome {
        if !self.alive {
            return DisposeOutcome::AlreadyDisposed;
        }
        self.alive = false;
        self.pending.clear();
        self.voices.clear();
        DisposeOutcome::Disposed
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.gain_smoother.set_sample_rate(sample_rate);
        self.bed.set_sample_rate(sample_rate);
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StereoAudioGenerator;

    struct Silence;

    impl StereoAudioGenerator for Silence {
        fn next_sample(&mut self) -> (f32, f32) {
            (0.0, 0.0)
        }
        fn set_sample_rate(&mut self, _sample_rate: f32) {}
    }

    fn test_channel() -> Channel {
        Channel::new(SoundId::Forest, 0.5, Box::new(Silence), 1000.0)
    }

    struct Unity;

    impl StereoAudioGenerator for Unity {
        fn next_sample(&mut self) -> (f32, f32) {
            (1.0, 1.0)
        }
        fn set_sample_rate(&mut self, _sample_rate: f32) {}
    }

    #[test]
    fn test_gain_changes_are_smoothed() {
        let mut channel = Channel::new(SoundId::Rain, 1.0, Box::new(Unity), 1000.0);

        let (first, _) = channel.next_frame(0);
        assert!(first < 0.5, "gain should ramp in, first frame was {}", first);
        for now in 1..2000 {
            channel.next_frame(now);
        }
        let (settled, _) = channel.next_frame(2000);
        assert!(settled > 0.95, "gain should settle at its target, got {}", settled);

        channel.set_gain(0.0);
        let (after_cut, _) = channel.next_frame(2001);
        assert!(
            after_cut > 0.5,
            "a volume cut must not land in a single frame, got {}",
            after_cut
        );
        let mut last = after_cut;
        for now in 2002..4000 {
            let (l, _) = channel.next_frame(now);
            assert!(l <= last + 1e-6, "decay toward the new target must be monotonic");
            last = l;
        }
        assert!(last < 0.01, "gain should reach the new target, got {}", last);
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut channel = test_channel();
        channel.set_gain(1.5);
        assert_eq!(channel.gain(), 1.0);
        channel.set_gain(-1.0);
        assert_eq!(channel.gain(), 0.0);
    }

    #[test]
    fn test_task_fires_and_reschedules_while_alive() {
        let mut channel = test_channel();
        channel.schedule(ScheduledTask::new(10, TransientKind::Chirp, 0.05, 0.1));

        // Before the due point nothing happens
        for now in 0..10 {
            channel.next_frame(now);
        }
        assert_eq!(channel.pending_tasks(), 1);

        let (l, r) = channel.next_frame(10);
        // Voice spawned (audible over the silent bed) and task rescheduled
        let _ = (l, r);
        assert_eq!(channel.pending_tasks(), 1, "task should reschedule itself");
        let mut heard = false;
        for now in 11..600 {
            let (l, r) = channel.next_frame(now);
            if l.abs() > 0.0 || r.abs() > 0.0 {
                heard = true;
            }
        }
        assert!(heard, "a fired task should produce audible transient output");
    }

    #[test]
    fn test_dispose_cancels_pending_tasks() {
        let mut channel = test_channel();
        channel.schedule(ScheduledTask::new(5, TransientKind::Drip, 0.1, 0.2));
        channel.schedule(ScheduledTask::new(8, TransientKind::Drip, 0.1, 0.2));

        assert_eq!(channel.dispose(), DisposeOutcome::Disposed);
        assert!(!channel.is_alive());
        assert_eq!(channel.pending_tasks(), 0, "disposal cancels every pending task");

        // A frame after disposal stays silent and spawns nothing
        let (l, r) = channel.next_frame(100);
        assert_eq!((l, r), (0.0, 0.0));
        assert_eq!(channel.pending_tasks(), 0);
    }

    #[test]
    fn test_double_dispose_is_a_named_outcome() {
        let mut channel = test_channel();
        assert_eq!(channel.dispose(), DisposeOutcome::Disposed);
        assert_eq!(channel.dispose(), DisposeOutcome::AlreadyDisposed);
    }
}
