use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Phrase {
    pub id: &'static str,
    pub text: &'static str,
    pub translation: &'static str,
}

pub static PHRASES: Lazy<Vec<Phrase>> = Lazy::new(|| {
    [
        ("p1", "Guten Morgen", "Good morning"),
        ("p2", "Wie geht es dir", "How are you"),
        ("p3", "Ich lerne Deutsch", "I am learning German"),
        ("p4", "Koennen Sie mir helfen", "Can you help me"),
        ("p5", "Die Rechnung bitte", "The bill, please"),
        ("p6", "Wo ist der Bahnhof", "Where is the train station"),
    ]
    .into_iter()
    .map(|(id, text, translation)| Phrase {
        id,
        text,
        translation,
    })
    .collect()
});

pub fn find_phrase(id: &str) -> Option<&'static Phrase> {
    PHRASES.iter().find(|phrase| phrase.id == id)
}

/// Lowercases and keeps only ASCII letters and single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// 1.0 for identical strings, 0.0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let longest = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationScore {
    pub score: u32,
    pub expected: String,
    pub heard: String,
    pub feedback: &'static str,
}

pub fn feedback_for(score: u32) -> &'static str {
    match score {
        85.. => "Excellent pronunciation!",
        70..=84 => "Great! Just a little more clarity.",
        50..=69 => "Not bad. Try slowing down a bit.",
        _ => "Keep practicing. Focus on each word.",
    }
}

pub fn score_pronunciation(expected: &str, transcript: &str) -> PronunciationScore {
    let expected = normalize(expected);
    let heard = normalize(transcript);
    let score = (similarity(&heard, &expected) * 100.0).round() as u32;

    PronunciationScore {
        score,
        feedback: feedback_for(score),
        expected,
        heard,
    }
}
