//! `memgarden providers`: list known text, image and media providers.

use memgarden_providers::router::{DEFAULT_MEDIA_ANALYZER, build_from_config, default_base_url};

use super::{Overrides, load_config};

pub fn run(overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    let router = build_from_config(&config);
    let text_default = overrides.provider.as_deref().unwrap_or(&config.default_provider);

    println!("🤖 Memory Garden Providers");
    println!("==========================");
    println!();
    println!("  Text:");
    for name in router.list() {
        let Some(provider) = router.get(name) else {
            continue;
        };
        let marker = if name == text_default { "*" } else { " " };
        let url = config
            .provider(name)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));
        println!("  {marker} {name:<14} {:<40} {}", provider.default_model(), url);
    }

    println!();
    println!("  Images:");
    for name in router.list_images() {
        let marker = if name == config.default_image_provider { "*" } else { " " };
        println!("  {marker} {name}");
    }

    println!();
    println!("  Media analysis:");
    for name in router.list_media() {
        let marker = if name == DEFAULT_MEDIA_ANALYZER { "*" } else { " " };
        println!("  {marker} {name}");
    }

    println!();
    println!("  Environment variables:");
    println!("    GOOGLE_AI_API_KEY, OPENAI_API_KEY, HUGGINGFACE_API_KEY, GETIMG_API_KEY");
    println!("    MEMGARDEN_PROVIDER, MEMGARDEN_MODEL, MEMGARDEN_PERSONALITY_FILE");

    Ok(())
}
