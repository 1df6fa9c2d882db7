use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use relay_core::config::{Config, DEFAULT_MAX_TOKENS};

const PROVIDERS: &[(&str, &str)] = &[("anthropic", "Anthropic"), ("openai", "OpenAI")];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn models_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "openai" => &["gpt-4o", "gpt-4o-mini", "gpt-4.1"],
        _ => &[
            "claude-3-7-sonnet-latest",
            "claude-3-5-haiku-latest",
            "claude-sonnet-4-0",
        ],
    }
}

fn setup_provider() -> Result<&'static str> {
    let labels: Vec<&str> = PROVIDERS.iter().map(|(_, label)| *label).collect();

    let selection = Select::new()
        .with_prompt("Select your model provider")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].0)
}

fn setup_api_key(provider_label: &str) -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", provider_label))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn setup_model(provider: &str) -> Result<String> {
    let models = models_for(provider);

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

pub fn run_onboard() -> Result<Config> {
    println!("  {}", style("Welcome to Relay!").white().bold());
    println!(
        "  {}",
        style("This wizard stores your model credentials for chat sessions.").dim()
    );

    print_step(1, 3, "Provider");
    let provider = setup_provider()?;
    let label = PROVIDERS
        .iter()
        .find(|(id, _)| *id == provider)
        .map(|(_, label)| *label)
        .unwrap_or(provider);

    print_step(2, 3, "API Key Setup");
    let api_key = setup_api_key(label)?;

    print_step(3, 3, "Model Selection");
    let model = setup_model(provider)?;

    let config = Config {
        provider: Some(provider.to_string()),
        api_key,
        model,
        max_tokens: DEFAULT_MAX_TOKENS,
        ..Default::default()
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(relay_core::config::get_config_path().display()).cyan()
    );
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("relay chat").cyan().bold()
    );
    println!();

    Ok(config)
}
