use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use xorshift::{Rng, SeedableRng, Xorshift128};

/// The voices the daily commentary rotates through.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StylePreset {
    Standard,
    PooterStyle,
    JeromeStyle,
}

impl StylePreset {
    pub const ALL: [StylePreset; 3] = [
        StylePreset::Standard,
        StylePreset::PooterStyle,
        StylePreset::JeromeStyle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StylePreset::Standard => "standard",
            StylePreset::PooterStyle => "pooter",
            StylePreset::JeromeStyle => "jerome",
        }
    }

    /// Build the generation prompt for this voice around the numbered
    /// `events_text` list.
    pub fn prompt(&self, events_text: &str) -> String {
        match self {
            StylePreset::PooterStyle => format!(
                "You are Charles Pooter from \"Diary of a Nobody\", recording notable \
                 historical events with characteristic earnestness and blind spots.\n\n\
                 Historical events for today:\n{events_text}\n\
                 Write a diary entry covering these events (200-300 words total). \
                 Introduce today's observations with Pooter earnestness, comment on each \
                 event with slight misunderstandings of its importance, comparisons to \
                 mundane personal matters and mild concerns about propriety, then digress \
                 into a domestic matter that seems equally important to world history.\n\n\
                 Style: formal Victorian language, unintentionally comic, self-important \
                 about trivia.\n\n\
                 Begin: \"\u{1F4DC} **On This Day in History**\n\nI observe with interest \
                 that several momentous events occurred on this date...\""
            ),
            StylePreset::JeromeStyle => format!(
                "You are writing in the style of Jerome K. Jerome from \"Three Men in a \
                 Boat\" - observational, meandering, self-deprecating.\n\n\
                 Historical events for today:\n{events_text}\n\
                 Requirements:\n\
                 - Open with \"\u{1F4DC} **On This Day in History**\"\n\
                 - Present each historical fact briefly (1-2 sentences each)\n\
                 - Between events, add humorous digressions and tangential observations\n\
                 - Include self-deprecating observations about modern life\n\
                 - End with an understated, meandering conclusion\n\n\
                 Style: conversational, dry wit, tendency to ramble. Length: 250-350 \
                 words. Voice: educated but unpretentious, gently mocking.\n\n\
                 CRITICAL: base your entry ONLY on these verified historical facts. Do \
                 NOT add invented historical details."
            ),
            StylePreset::Standard => format!(
                "You are creating daily \"On This Day in History\" content for a chat \
                 server. Your style combines Victorian British humour (Jerome K. Jerome \
                 and George Grossmith) with modern chat formatting.\n\n\
                 Historical events for today:\n{events_text}\n\
                 Requirements:\n\
                 - Open with \"\u{1F4DC} **On This Day in History**\"\n\
                 - Present each historical fact (1-2 sentences each)\n\
                 - After each fact, add brief Victorian-style commentary\n\
                 - Work in self-deprecating comparisons to modern times, mundane \
                   digressions, faux-outrage at historical figures and the odd terrible \
                   Victorian pun\n\n\
                 Style: dry, understated, conversational but with Victorian sensibility. \
                 Tone: gently mocking, observational, deadpan. Length: 300-400 words.\n\n\
                 Avoid modern slang, excessive exclamation marks and obvious sarcasm \
                 markers.\n\n\
                 CRITICAL: base your entry ONLY on these verified historical facts. Your \
                 creativity belongs in the COMMENTARY and STYLE, not in fabricating \
                 additional historical information."
            ),
        }
    }
}

/// Uniform-random rotation over the presets. Repeats are allowed; the only
/// guarantee is that every draw is one of the three voices.
pub struct StyleSelector {
    rng: Mutex<Xorshift128>,
}

impl std::fmt::Debug for StyleSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleSelector").finish_non_exhaustive()
    }
}

impl StyleSelector {
    pub fn new() -> Self {
        let unix_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::with_seed(unix_time.as_nanos() as u64)
    }

    /// Seeded construction so tests can pin the rotation.
    pub fn with_seed(seed: u64) -> Self {
        let states = [seed, seed ^ 0x9e37_79b9_7f4a_7c15];
        let rng: Xorshift128 = SeedableRng::from_seed(&states[..]);
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn next(&self) -> StylePreset {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        StylePreset::ALL[(rng.next_u64() as usize) % StylePreset::ALL.len()]
    }
}

impl Default for StyleSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_selectors_agree() {
        let a = StyleSelector::with_seed(17);
        let b = StyleSelector::with_seed(17);
        for _ in 0..32 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn rotation_reaches_every_preset() {
        let selector = StyleSelector::with_seed(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..300 {
            seen.insert(selector.next());
        }
        assert_eq!(seen.len(), StylePreset::ALL.len());
    }

    #[test]
    fn prompts_embed_the_events() {
        let events = "1. In 1493, something happened\n";
        for preset in StylePreset::ALL {
            assert!(preset.prompt(events).contains("In 1493"));
        }
    }
}
