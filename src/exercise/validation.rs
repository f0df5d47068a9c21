//! Shape checks for generator output.
//!
//! Anything that fails here is treated like a failed generation call and
//! retried; nothing malformed is ever stored.

use super::types::ExerciseFields;
use crate::error::{AppError, AppResult};
use crate::generator::types::GeneratedExercise;

use regex::Regex;
use serde_json::Value;

pub const MIN_OPTIONS: usize = 3;
pub const MAX_OPTIONS: usize = 5;
pub const MAX_LEAD_IN_CHARS: usize = 300;
pub const MAX_INSTRUCTION_CHARS: usize = 200;
pub const MAX_OPTION_CHARS: usize = 120;

const BLANK_PATTERN: &str = r"_{3,}";
const LETTER_PATTERN: &str = r"^\s*([a-zA-Z])\s*[\).:]?\s*$";

/// Validates a generator answer for an exercise over `expected_words` (one
/// entry per blank) and normalises it into stored fields.
pub fn validate_generated(
    raw: &GeneratedExercise,
    expected_words: &[String],
) -> AppResult<ExerciseFields> {
    if raw.word_values.is_empty() {
        return Err(AppError::validation("word_values missing"));
    }
    let returned: Vec<String> = raw.word_values.iter().map(|w| w.trim().to_lowercase()).collect();
    for word in expected_words {
        if !returned.contains(&word.trim().to_lowercase()) {
            return Err(AppError::validation(format!("word_values does not mention {word}")));
        }
    }

    let lead_in = single_line(&raw.initial_strings, "initial_strings")?;
    check_length(&lead_in, MAX_LEAD_IN_CHARS, "lead-in")?;
    let blanks = count_blanks(&lead_in)?;
    if blanks != expected_words.len() {
        return Err(AppError::validation(format!(
            "lead-in has {} blanks, expected {}",
            blanks,
            expected_words.len()
        )));
    }

    let instruction = single_line(&raw.middle_strings, "middle_strings")?;
    check_length(&instruction, MAX_INSTRUCTION_CHARS, "instruction")?;

    let options: Vec<String> = raw.final_strings.iter().map(|o| o.trim().to_string()).collect();
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(AppError::validation(format!(
            "expected {}..={} options, got {}",
            MIN_OPTIONS,
            MAX_OPTIONS,
            options.len()
        )));
    }
    for option in &options {
        check_length(option, MAX_OPTION_CHARS, "option")?;
    }

    let correct_index = normalize_criteria(&raw.criteria, options.len())?;

    Ok(ExerciseFields {
        lead_in,
        instruction,
        options,
        correct_index,
    })
}

/// Maps every criteria shape the generator has been seen to produce onto a
/// zero-based option index: `2`, `"c"`, `"c)"`, `["c"]`.
pub fn normalize_criteria(criteria: &Value, option_count: usize) -> AppResult<usize> {
    let index = match criteria {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| AppError::validation(format!("criteria {n} is not an index")))?,
        Value::String(s) => letter_index(s)?,
        Value::Array(items) => match items.as_slice() {
            [single] => return normalize_criteria(single, option_count),
            _ => {
                return Err(AppError::validation(format!(
                    "criteria list must hold one answer, got {}",
                    items.len()
                )));
            }
        },
        other => return Err(AppError::validation(format!("unusable criteria: {other}"))),
    };

    if index >= option_count {
        return Err(AppError::validation(format!(
            "criteria {index} out of range for {option_count} options"
        )));
    }
    Ok(index)
}

fn letter_index(raw: &str) -> AppResult<usize> {
    let re = Regex::new(LETTER_PATTERN).map_err(|e| AppError::validation(e.to_string()))?;
    let letter = re
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .ok_or_else(|| AppError::validation(format!("criteria {raw:?} is not an option letter")))?;

    Ok((letter.to_ascii_lowercase() as u8 - b'a') as usize)
}

pub fn count_blanks(text: &str) -> AppResult<usize> {
    let re = Regex::new(BLANK_PATTERN).map_err(|e| AppError::validation(e.to_string()))?;
    Ok(re.find_iter(text).count())
}

fn single_line(lines: &[String], field: &str) -> AppResult<String> {
    lines
        .first()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| AppError::validation(format!("{field} missing")))
}

fn check_length(text: &str, max_chars: usize, what: &str) -> AppResult<()> {
    let chars = text.chars().count();
    if chars == 0 || chars > max_chars {
        return Err(AppError::validation(format!(
            "{what} must be 1..={max_chars} characters, got {chars}"
        )));
    }
    Ok(())
}
