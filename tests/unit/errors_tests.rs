/*!
 * Tests for error types and conversions
 */

use subtrans::errors::{AppError, BatchError, ProviderError, SubtitleError, TranslationError, ValidationError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_providerError_isRetryable_shouldMatchNetworkFailures() {
    assert!(ProviderError::Timeout("slow".to_string()).is_retryable());
    assert!(ProviderError::ConnectionError("refused".to_string()).is_retryable());
    assert!(ProviderError::RateLimitExceeded("wait".to_string()).is_retryable());
    assert!(
        ProviderError::ApiError {
            status_code: 503,
            message: "busy".to_string()
        }
        .is_retryable()
    );

    assert!(!ProviderError::ParseError("garbage".to_string()).is_retryable());
    assert!(!ProviderError::AuthenticationError("bad key".to_string()).is_retryable());
    assert!(
        !ProviderError::ApiError {
            status_code: 400,
            message: "bad request".to_string()
        }
        .is_retryable()
    );
}

#[test]
fn test_translationError_fromProviderError_shouldClassify() {
    let transient: TranslationError = ProviderError::Timeout("slow".to_string()).into();
    let fatal: TranslationError = ProviderError::ParseError("garbage".to_string()).into();

    assert!(transient.is_transient());
    assert!(!transient.is_fatal());
    assert!(fatal.is_fatal());
    assert!(fatal.to_string().contains("garbage"));
}

#[test]
fn test_translationError_fromSubtitleError_shouldBeFatal() {
    let error: TranslationError = SubtitleError::BatchNotFound { scene: 2, batch: 3 }.into();

    assert!(error.is_fatal());
    assert_eq!(error.to_string(), "Subtitle error: Batch (2,3) does not exist");
    assert!(TranslationError::Aborted.is_aborted());
}

#[test]
fn test_validationError_serialize_shouldTagKind() {
    let error = ValidationError::LineTooLong {
        lines: vec![4, 9],
        max_characters: 40,
    };

    let json = serde_json::to_value(&error).unwrap();

    assert_eq!(json["kind"], "line_too_long");
    assert_eq!(json["lines"], serde_json::json!([4, 9]));
    assert_eq!(error.kind(), "line_too_long");
    assert_eq!(serde_json::from_value::<ValidationError>(json).unwrap(), error);
}

#[test]
fn test_validationError_display_shouldListLines() {
    let error = ValidationError::UntranslatedLines { lines: vec![3, 5] };
    assert_eq!(error.to_string(), "Untranslated lines: 3, 5");
}

#[test]
fn test_batchError_asValidation_shouldOnlyMatchValidation() {
    let validation = BatchError::from(ValidationError::EmptyLines { lines: vec![1] });
    let translation = BatchError::Translation("refused".to_string());

    assert!(validation.as_validation().is_some());
    assert!(translation.as_validation().is_none());
    assert_eq!(translation.to_string(), "refused");
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");

    let error = AppError::from(io);

    assert!(matches!(error, AppError::File(_)));
    assert!(error.to_string().starts_with("File error"));
}
