use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

use crate::difficulty::Difficulty;

static CORPUS_DIR: Dir = include_dir!("src/corpus");

/// A practice text belonging to one difficulty tier
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct TextSample {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub category: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub samples: Vec<TextSample>,
}

impl Corpus {
    /// The corpus bundled with the binary
    pub fn embedded() -> Self {
        read_corpus_from_file("samples.json").unwrap_or_else(|e| {
            log::error!("embedded corpus unreadable: {e}");
            Corpus {
                name: "empty".to_string(),
                samples: Vec::new(),
            }
        })
    }
}

fn read_corpus_from_file(file_name: &str) -> Result<Corpus, Box<dyn Error>> {
    let file = CORPUS_DIR
        .get_file(file_name)
        .ok_or_else(|| format!("corpus file not found: {file_name}"))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or("unable to interpret corpus file as a string")?;

    Ok(from_str(file_as_str)?)
}

/// Supplies the target text for a session
pub trait TextProvider {
    fn random_text(&self, difficulty: Difficulty) -> TextSample;
}

/// Picks uniformly among the embedded samples of a tier
#[derive(Debug, Clone)]
pub struct StaticTextProvider {
    corpus: Corpus,
}

impl StaticTextProvider {
    pub fn new() -> Self {
        Self {
            corpus: Corpus::embedded(),
        }
    }

    pub fn with_corpus(corpus: Corpus) -> Self {
        Self { corpus }
    }

    pub fn texts_for(&self, difficulty: Difficulty) -> Vec<TextSample> {
        self.corpus
            .samples
            .iter()
            .filter(|s| s.difficulty == difficulty)
            .cloned()
            .collect()
    }
}

impl Default for StaticTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProvider for StaticTextProvider {
    fn random_text(&self, difficulty: Difficulty) -> TextSample {
        let samples = self.texts_for(difficulty);
        let rng = &mut rand::thread_rng();
        match samples.choose(rng) {
            Some(sample) => sample.clone(),
            None => {
                log::warn!("no samples for {difficulty} difficulty, using fallback text");
                fallback_sample(difficulty)
            }
        }
    }
}

/// Always returns the same text; used for `--prompt`
#[derive(Debug, Clone)]
pub struct FixedTextProvider {
    text: String,
}

impl FixedTextProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextProvider for FixedTextProvider {
    fn random_text(&self, difficulty: Difficulty) -> TextSample {
        TextSample {
            id: "custom".to_string(),
            text: self.text.clone(),
            difficulty,
            category: "Custom".to_string(),
        }
    }
}

fn fallback_sample(difficulty: Difficulty) -> TextSample {
    TextSample {
        id: format!("{}-fallback", difficulty.as_str()),
        text: "The quick brown fox jumps over the lazy dog.".to_string(),
        difficulty,
        category: "Classic".to_string(),
    }
}
