/*!
 * Tests for validation of translated batches
 */

use subtrans::document::{SubtitleBatch, SubtitleLine};
use subtrans::errors::{BatchError, ValidationError};
use subtrans::validation::{SubtitleValidator, ValidationConfig};

fn line(number: usize, text: &str) -> SubtitleLine {
    let start = number as u64 * 2_000;
    SubtitleLine::new(number, start, start + 1_500, text)
}

fn batch_with(originals: &[(usize, &str)], translated: &[(usize, &str)]) -> SubtitleBatch {
    let mut batch = SubtitleBatch::new(1, 1, originals.iter().map(|(n, text)| line(*n, text)).collect());
    for (number, text) in translated {
        batch.set_translated_line(line(*number, text));
    }
    batch
}

#[test]
fn test_validator_validateBatch_withOneOfTwoTranslated_shouldReportOneUntranslatedError() {
    let mut batch = batch_with(&[(1, "Hello"), (2, "World")], &[(1, "Bonjour")]);

    let errors = SubtitleValidator::default().validate_batch(&mut batch);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), "untranslated_lines");
    assert_eq!(errors[0].lines(), &[2]);
}

#[test]
fn test_validator_validateBatch_withNoTranslations_shouldReportExactlyOneError() {
    let mut batch = batch_with(&[(1, "Hello"), (2, "World")], &[]);

    let errors = SubtitleValidator::default().validate_batch(&mut batch);

    assert_eq!(errors, vec![ValidationError::UntranslatedLines { lines: Vec::new() }]);
    assert_eq!(batch.errors.len(), 1);
}

#[test]
fn test_validator_validateBatch_withCleanTranslation_shouldClearOldValidationErrors() {
    let mut batch = batch_with(&[(1, "Hello")], &[(1, "Bonjour")]);
    batch.errors.push(BatchError::Validation(ValidationError::UntranslatedLines { lines: vec![1] }));

    let errors = SubtitleValidator::default().validate_batch(&mut batch);

    assert!(errors.is_empty());
    assert!(batch.errors.is_empty());
}

#[test]
fn test_validator_validateBatch_withStrayTranslation_shouldReportUnmatched() {
    let mut batch = batch_with(&[(1, "Hello")], &[(1, "Bonjour"), (7, "Perdu")]);

    let errors = SubtitleValidator::default().validate_batch(&mut batch);

    assert_eq!(errors, vec![ValidationError::UnmatchedLines { lines: vec![7] }]);
}

#[test]
fn test_validator_validateTranslations_withLimitsDisabled_shouldAcceptLongLines() {
    let validator = SubtitleValidator::new(ValidationConfig {
        max_characters: None,
        max_newlines: None,
    });
    let long = "word ".repeat(60);
    let lines = vec![line(1, &long), line(2, "a\nb\nc\nd")];

    assert!(validator.validate_translations(&lines).is_empty());
}

#[test]
fn test_validator_validateTranslations_shouldCountCharactersNotBytes() {
    let validator = SubtitleValidator::new(ValidationConfig {
        max_characters: Some(5),
        max_newlines: None,
    });
    let lines = vec![line(1, "éééé"), line(2, "ééééééé")];

    let errors = validator.validate_translations(&lines);

    assert_eq!(
        errors,
        vec![ValidationError::LineTooLong {
            lines: vec![2],
            max_characters: 5
        }]
    );
}

#[test]
fn test_validationConfig_deserialize_withNull_shouldDisableLimit() {
    let config: ValidationConfig = serde_json::from_str(r#"{ "max_characters": null }"#).unwrap();

    assert_eq!(config.max_characters, None);
    assert_eq!(config.max_newlines, Some(2));
}
