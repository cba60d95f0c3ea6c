use pulseboard_ai::ProviderChain;
use pulseboard_core::PulseboardConfig;

fn config_without_secrets() -> PulseboardConfig {
    let mut config = PulseboardConfig::default();
    config.cloudflare.account_id = None;
    config.cloudflare.api_token = None;
    config.ollama.binary = "pulseboard-no-such-ollama-binary".to_string();
    config
}

#[tokio::test]
async fn missing_cloudflare_secrets_stop_the_default_chain() {
    let chain = ProviderChain::from_config(&config_without_secrets()).unwrap();
    assert_eq!(chain.provider_names(), vec!["cloudflare", "ollama"]);

    let err = chain.generate("Summarise June traffic").await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("CLOUDFLARE_ACCOUNT_ID"));
    assert!(err.to_string().contains("CLOUDFLARE_API_TOKEN"));
}

#[tokio::test]
async fn local_only_chain_reports_missing_ollama() {
    let mut config = config_without_secrets();
    config.ai.providers = vec!["ollama".to_string()];

    let chain = ProviderChain::from_config(&config).unwrap();
    let err = chain.generate("Summarise June traffic").await.unwrap_err();

    assert!(!err.is_configuration());
    assert_eq!(
        err.to_string(),
        "All AI services failed. ollama: Ollama is not installed or not in PATH"
    );
}

#[test]
fn unknown_provider_in_config_is_rejected() {
    let mut config = PulseboardConfig::default();
    config.ai.providers = vec!["cloudflare".to_string(), "openai".to_string()];

    match ProviderChain::from_config(&config) {
        Err(err) => assert!(err.is_configuration()),
        Ok(_) => panic!("openai is not a supported provider"),
    }
}
