//! Splits a story into narrated segments, giving each character a voice and
//! each line a tone guessed from its wording.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Voices handed out to the narrator first, then to characters in order of appearance.
pub const STORY_VOICES: [&str; 5] = ["david", "zira", "heera", "mark", "ravi"];
pub const NARRATOR: &str = "Narrator";
const NEUTRAL: &str = "neutral";

/// Emotion words and the tone they map to. Earlier entries win when a line
/// contains several.
const EMOTION_TONES: &[(&str, &str)] = &[
    ("cheerful", "cheerful"),
    ("happy", "cheerful"),
    ("excited", "cheerful"),
    ("playful", "cheerful"),
    ("joy", "cheerful"),
    ("laugh", "cheerful"),
    ("smile", "cheerful"),
    ("sad", "sad"),
    ("cry", "sad"),
    ("weep", "sad"),
    ("sorrow", "sad"),
    ("tear", "sad"),
    ("angry", "angry"),
    ("mad", "angry"),
    ("furious", "angry"),
    ("rage", "angry"),
    ("shout", "angry"),
    ("calm", "calm"),
    ("peaceful", "calm"),
    ("quiet", "calm"),
    ("whisper", "calm"),
    ("serene", "calm"),
    ("nervous", "suspenseful"),
    ("scared", "suspenseful"),
    ("afraid", "suspenseful"),
    ("worry", "suspenseful"),
    ("anxious", "suspenseful"),
    ("suspenseful", "suspenseful"),
    ("confident", "confident"),
    ("proud", "confident"),
    ("strong", "confident"),
    ("brave", "confident"),
    ("bold", "confident"),
    ("inspiring", "confident"),
];

/// Delivery cues checked when no emotion word matched.
const DELIVERY_CUES: &[(&[&str], &str)] = &[
    (&["!", "exclaimed", "shouted", "yelled"], "angry"),
    (&["whispered", "murmured", "softly"], "calm"),
    (&["wondered", "mysterious", "strange"], "suspenseful"),
];

lazy_static! {
    /// `Name (emotion): line`, optionally quoted.
    static ref SCRIPT_LINE: Regex =
        Regex::new(r#"^(\w+)\s*\(([^)]+)\):\s*["']?([^"']*)["']?"#).unwrap();
    static ref QUOTED: Regex = Regex::new(r#""([^"]*)""#).unwrap();
    static ref SPEAKER: Regex = Regex::new(
        r"(\w+)\s+said|said\s+(\w+)|(\w+)\s+asked|asked\s+(\w+)|(\w+)\s+replied|replied\s+(\w+)"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorySegment {
    pub text: String,
    pub voice: &'static str,
    pub tone: &'static str,
    pub character: String,
    pub emotion: Option<&'static str>,
    pub is_dialogue: bool,
}

/// Hands out voices to characters as they first speak.
struct Cast {
    voices: HashMap<String, &'static str>,
    next: usize,
}

impl Cast {
    fn new() -> Self {
        Self {
            voices: HashMap::new(),
            next: 1,
        }
    }

    fn voice_for(&mut self, character: &str) -> &'static str {
        if let Some(voice) = self.voices.get(character) {
            return *voice;
        }
        let voice = STORY_VOICES[self.next % STORY_VOICES.len()];
        self.next += 1;
        self.voices.insert(character.to_string(), voice);
        voice
    }

    /// A fresh `Character N` for an unattributed quote.
    fn unnamed(&self) -> String {
        let known = self
            .voices
            .keys()
            .filter(|name| name.starts_with("Character"))
            .count();
        format!("Character {}", known + 1)
    }
}

/// One segment per non-empty line of `text`.
pub fn analyze_story(text: &str) -> Vec<StorySegment> {
    let mut cast = Cast::new();
    let mut segments = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut voice = STORY_VOICES[0];
        let mut tone = NEUTRAL;
        let mut character = NARRATOR.to_string();
        let mut is_dialogue = false;
        let mut spoken = line.to_string();

        if let Some(caps) = SCRIPT_LINE.captures(line) {
            character = title_case(&caps[1]);
            voice = cast.voice_for(&character);
            is_dialogue = true;
            tone = emotion_tone(caps[2].trim());
            spoken = caps[3].trim().to_string();
        } else if QUOTED.is_match(line) {
            is_dialogue = true;
            let lowered = line.to_lowercase();
            character = match SPEAKER.captures(&lowered) {
                Some(caps) => caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .next()
                    .map(|m| title_case(m.as_str()))
                    .unwrap_or_else(|| cast.unnamed()),
                None => cast.unnamed(),
            };
            voice = cast.voice_for(&character);
        }

        if spoken.is_empty() {
            continue;
        }

        if tone == NEUTRAL {
            tone = detect_tone(&spoken);
        }
        if !spoken.ends_with(['.', '!', '?']) {
            spoken.push('.');
        }

        segments.push(StorySegment {
            text: spoken,
            voice,
            tone,
            character,
            emotion: (tone != NEUTRAL).then_some(tone),
            is_dialogue,
        });
    }

    segments
}

/// Distinct voices and tones of `segments`, sorted.
pub fn voices_and_tones(segments: &[StorySegment]) -> (Vec<&'static str>, Vec<&'static str>) {
    let voices: BTreeSet<_> = segments.iter().map(|s| s.voice).collect();
    let tones: BTreeSet<_> = segments.iter().map(|s| s.tone).collect();
    (voices.into_iter().collect(), tones.into_iter().collect())
}

fn emotion_tone(hint: &str) -> &'static str {
    let hint = hint.to_lowercase();
    EMOTION_TONES
        .iter()
        .find(|(emotion, _)| *emotion == hint)
        .map_or(NEUTRAL, |&(_, tone)| tone)
}

fn detect_tone(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    if let Some(&(_, tone)) = EMOTION_TONES.iter().find(|(emotion, _)| lowered.contains(emotion)) {
        return tone;
    }
    DELIVERY_CUES
        .iter()
        .find(|(cues, _)| cues.iter().any(|cue| lowered.contains(cue)))
        .map_or(NEUTRAL, |&(_, tone)| tone)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
