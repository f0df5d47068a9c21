//! Scripted generator for tests.

use super::ContentGenerator;
use super::types::{ExerciseRequest, GeneratedExercise};
use crate::language::Language;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers from a script when one is queued, otherwise with a well-formed
/// exercise built from the request.
#[derive(Default)]
pub struct FakeContentGenerator {
    exercise_script: Mutex<VecDeque<Result<GeneratedExercise, String>>>,
    levels: Mutex<HashMap<String, i64>>,
    new_words: Mutex<VecDeque<String>>,
    bootstrap: Mutex<Option<HashMap<String, Vec<String>>>>,
    requests: Mutex<Vec<ExerciseRequest>>,
    pub exercise_calls: AtomicUsize,
    pub level_calls: AtomicUsize,
    pub bootstrap_calls: AtomicUsize,
}

impl FakeContentGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exercise(&self, response: GeneratedExercise) {
        self.exercise_script.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_failure(&self, message: &str) {
        self.exercise_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn set_level(&self, word: &str, level: i64) {
        self.levels.lock().unwrap().insert(word.to_string(), level);
    }

    pub fn push_new_word(&self, word: &str) {
        self.new_words.lock().unwrap().push_back(word.to_string());
    }

    pub fn set_bootstrap(&self, words: HashMap<String, Vec<String>>) {
        *self.bootstrap.lock().unwrap() = Some(words);
    }

    pub fn requests(&self) -> Vec<ExerciseRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn exercise_calls(&self) -> usize {
        self.exercise_calls.load(Ordering::SeqCst)
    }

    /// A generator answer that passes validation for `words`.
    pub fn well_formed(words: &[String]) -> GeneratedExercise {
        let blanks = vec!["___"; words.len()].join(" ");
        let answer = words.join(" / ");
        GeneratedExercise {
            word_values: words.to_vec(),
            initial_strings: vec![format!("Hoy {blanks} en casa.")],
            middle_strings: vec!["Choose the correct word:".to_string()],
            final_strings: vec![
                "a) algo".to_string(),
                format!("b) {answer}"),
                "c) nada".to_string(),
                "d) otro".to_string(),
            ],
            criteria: json!("b"),
        }
    }
}

#[async_trait]
impl ContentGenerator for FakeContentGenerator {
    async fn generate_exercise(&self, request: &ExerciseRequest) -> Result<GeneratedExercise> {
        self.exercise_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self.exercise_script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Self::well_formed(&request.word_values)),
        }
    }

    async fn estimate_word_level(&self, word: &str, _language: Language) -> Result<i64> {
        self.level_calls.fetch_add(1, Ordering::SeqCst);
        self.levels
            .lock()
            .unwrap()
            .get(word)
            .copied()
            .ok_or_else(|| anyhow!("no level scripted for {word}"))
    }

    async fn suggest_new_word(&self, _language: Language, _existing: &[String]) -> Result<String> {
        self.new_words
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no new word scripted"))
    }

    async fn bootstrap_vocabulary(&self, _language: Language) -> Result<HashMap<String, Vec<String>>> {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        self.bootstrap
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("bootstrap unavailable"))
    }
}
