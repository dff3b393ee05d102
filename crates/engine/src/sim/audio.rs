use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    MovingToPosition,
    TargetConfirmed,
}

impl AudioCue {
    pub fn phrase(self) -> &'static str {
        match self {
            AudioCue::MovingToPosition => "moving to position",
            AudioCue::TargetConfirmed => "target confirmed",
        }
    }
}

/// Plays cues handed over by the universe. Implementations must not block
/// the tick.
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Discards every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutedAudio;

impl AudioSink for MutedAudio {
    fn play(&mut self, _cue: AudioCue) {}
}

#[derive(Debug, Default)]
pub struct AudioQueue {
    pending: VecDeque<AudioCue>,
}

impl AudioQueue {
    pub fn enqueue(&mut self, cue: AudioCue) {
        self.pending.push_back(cue);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hands every queued cue to `sink` in arrival order.
    pub fn drain_into(&mut self, sink: &mut dyn AudioSink) -> usize {
        let drained = self.pending.len();
        for cue in self.pending.drain(..) {
            sink.play(cue);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<AudioCue>);

    impl AudioSink for Recorder {
        fn play(&mut self, cue: AudioCue) {
            self.0.push(cue);
        }
    }

    #[test]
    fn drain_preserves_order_and_empties_queue() {
        let mut queue = AudioQueue::default();
        queue.enqueue(AudioCue::TargetConfirmed);
        queue.enqueue(AudioCue::MovingToPosition);
        let mut recorder = Recorder::default();

        assert_eq!(queue.drain_into(&mut recorder), 2);
        assert_eq!(
            recorder.0,
            vec![AudioCue::TargetConfirmed, AudioCue::MovingToPosition]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn phrases_match_cues() {
        assert_eq!(AudioCue::MovingToPosition.phrase(), "moving to position");
        assert_eq!(AudioCue::TargetConfirmed.phrase(), "target confirmed");
    }
}
