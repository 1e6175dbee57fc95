/*!
 * Tests for the provider registry and the mock client
 */

use std::sync::Arc;

use subtrans::app_config::ProviderConfig;
use subtrans::document::SubtitleLine;
use subtrans::errors::TranslationError;
use subtrans::providers::ProviderRegistry;
use subtrans::providers::mock::{MockBehavior, MockClient};
use subtrans::translation::{AbortHandle, BatchContext, TranslationClient, TranslationParser};

fn prompt_lines() -> Vec<SubtitleLine> {
    vec![
        SubtitleLine::new(1, 0, 1_000, "Bonjour"),
        SubtitleLine::new(2, 1_000, 2_000, "Merci"),
    ]
}

#[test]
fn test_providerRegistry_register_shouldAddCustomProvider() {
    let mut registry = ProviderRegistry::with_defaults();
    registry.register("scripted", |settings| {
        Ok(Arc::new(MockClient::with_settings(
            MockBehavior::Scripted(vec!["#1\nHi".to_string()]),
            settings.clone(),
        )) as Arc<dyn TranslationClient>)
    });

    let mut settings = ProviderConfig::new("scripted");
    settings.model = "fixed".to_string();
    let client = registry.create(&settings).unwrap();

    assert_eq!(registry.names(), vec!["mock", "ollama", "scripted"]);
    assert_eq!(client.settings().model, "fixed");
}

#[test]
fn test_providerRegistry_create_withOllamaSettings_shouldBuildClient() {
    let registry = ProviderRegistry::with_defaults();

    let client = registry.create(&ProviderConfig::new("ollama")).unwrap();

    assert_eq!(client.name(), "ollama");
    assert!(client.supports_streaming());
}

#[test]
fn test_providerRegistry_create_withBadOllamaEndpoint_shouldFail() {
    let registry = ProviderRegistry::with_defaults();
    let mut settings = ProviderConfig::new("ollama");
    settings.endpoint = "not a url".to_string();

    let error = registry.create(&settings).err().unwrap();

    assert!(matches!(error, TranslationError::Fatal(_)));
}

#[tokio::test]
async fn test_mockClient_echo_shouldProduceParsableResponse() {
    let client = MockClient::new(MockBehavior::Echo);
    let prompt = client
        .build_prompt("Translate", &prompt_lines(), &BatchContext::default())
        .unwrap();

    let translation = client
        .request_translation(prompt, 0.0, &AbortHandle::new(), None)
        .await
        .unwrap()
        .unwrap();
    let parsed = TranslationParser::new().parse(&translation.text).unwrap();

    assert_eq!(client.request_count(), 1);
    assert_eq!(parsed.lines[1].text, "[translated] Merci");
    assert_eq!(parsed.summary.as_deref(), Some("Lines 1 to 2"));
    assert!(translation.prompt_tokens.is_some());
}

#[test]
fn test_mockClient_requestTranslation_whenAborted_shouldNotSend() {
    let client = MockClient::new(MockBehavior::Echo);
    let prompt = client
        .build_prompt("Translate", &prompt_lines(), &BatchContext::default())
        .unwrap();
    let abort = AbortHandle::new();
    abort.abort();

    let result = tokio_test::block_on(async { client.request_translation(prompt, 0.0, &abort, None).await });

    assert!(result.unwrap().is_none());
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_mockClient_failThenSucceed_shouldFailTransientlyFirst() {
    let client = MockClient::new(MockBehavior::FailThenSucceed { failures: 1 });
    let prompt = client
        .build_prompt("Translate", &prompt_lines(), &BatchContext::default())
        .unwrap();
    let abort = AbortHandle::new();

    let first = client.request_translation(prompt.clone(), 0.0, &abort, None).await;
    let second = client.request_translation(prompt, 0.0, &abort, None).await;

    assert!(first.unwrap_err().is_transient());
    assert!(second.unwrap().is_some());
    assert_eq!(client.prompts().len(), 2);
}
