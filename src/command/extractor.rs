//! Picks the motion command a transcript asks for
//!
//! The speaker's last word matters: of all trigger phrases found in the
//! transcript, the one starting furthest to the right decides the command.
//! Matches starting at the same offset go to the longer phrase, then to the
//! higher-priority command (Stop > Back > Forward > Left > Right).

use tracing::trace;

use super::motion::PrimitiveCommand;
use super::vocabulary::Vocabulary;

/// A trigger phrase located in a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    command: PrimitiveCommand,
    start: usize,
    len: usize,
}

impl Match {
    /// True if `self` should replace `best`
    fn beats(&self, best: &Match) -> bool {
        (self.start, self.len, self.command.priority())
            > (best.start, best.len, best.command.priority())
    }
}

/// Find the command owning the right-most trigger phrase, if any
pub fn extract(transcript: &str, vocabulary: &Vocabulary) -> Option<PrimitiveCommand> {
    let mut best: Option<Match> = None;

    for (command, phrases) in vocabulary.lookup() {
        for phrase in phrases.iter().filter(|p| !p.is_empty()) {
            let Some(start) = transcript.rfind(phrase) else {
                continue;
            };

            let candidate = Match {
                command: *command,
                start,
                len: phrase.len(),
            };

            if best.map_or(true, |b| candidate.beats(&b)) {
                trace!(%command, phrase, start, "trigger matched");
                best = Some(candidate);
            }
        }
    }

    best.map(|m| m.command)
}
