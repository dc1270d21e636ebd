//! CLI for CharViz - character images from a reference photo.

use charviz::image::providers::{GeminiClient, GeminiImageModel};
use charviz::{
    compose_prompt, FormInput, GenerativeModel, Orchestrator, Quality, ReferenceImage,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charviz")]
#[command(about = "Generate character images from a reference photo via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate three character variants from a reference image
    Generate(GenerateArgs),

    /// Print the composed prompt without calling the API
    Prompt(PromptArgs),

    /// Check that the API key and model are usable
    Check(ClientArgs),
}

#[derive(Args)]
struct PromptArgs {
    /// Character description
    #[arg(short, long)]
    character: String,

    /// Scene description
    #[arg(short, long, default_value = "")]
    scene: String,

    /// Ask for the subject on a transparent or studio background
    #[arg(long)]
    remove_background: bool,

    /// How closely to follow the reference image (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value_t = 100)]
    influence: u8,

    /// Ignore the reference image's likeness entirely
    #[arg(long, conflicts_with = "influence")]
    no_influence: bool,

    /// Output quality tier
    #[arg(short, long, value_enum, default_value = "high")]
    quality: QualityArg,
}

#[derive(Args)]
struct GenerateArgs {
    /// Reference image(s); only the first is used for generation
    #[arg(short, long = "image", required = true)]
    images: Vec<PathBuf>,

    /// Directory to write character_N images into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    prompt: PromptArgs,

    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Args)]
struct ClientArgs {
    /// Image model to use
    #[arg(long, value_enum, default_value = "flash-image-preview")]
    model: ImageModelArg,

    /// Per-request timeout in seconds (no timeout by default)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    Standard,
    High,
    Ultra,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Standard => Quality::Standard,
            QualityArg::High => Quality::High,
            QualityArg::Ultra => Quality::Ultra,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageModelArg {
    FlashImagePreview,
    FlashImage,
    ProImage,
}

impl From<ImageModelArg> for GeminiImageModel {
    fn from(arg: ImageModelArg) -> Self {
        match arg {
            ImageModelArg::FlashImagePreview => GeminiImageModel::FlashImagePreview,
            ImageModelArg::FlashImage => GeminiImageModel::FlashImage,
            ImageModelArg::ProImage => GeminiImageModel::ProImage,
        }
    }
}

impl PromptArgs {
    fn to_form(&self) -> FormInput {
        let form = FormInput::new()
            .with_character(&self.character)
            .with_scene(&self.scene)
            .with_remove_background(self.remove_background)
            .with_quality(self.quality.into());
        if self.no_influence {
            form.without_influence()
        } else {
            form.with_influence(self.influence)
        }
    }
}

impl ClientArgs {
    fn build_client(&self) -> charviz::Result<GeminiClient> {
        let mut builder = GeminiClient::builder().image_model(self.model.into());
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("charviz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Prompt(args) => print_prompt(&args, cli.json)?,
        Commands::Check(args) => check(&args, cli.json).await?,
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    // Fail on configuration before reading any files
    let client = args.client.build_client()?;

    let mut form = args.prompt.to_form();
    for path in &args.images {
        form = form.with_image(ReferenceImage::from_path(path)?);
    }
    form.validate()?;

    std::fs::create_dir_all(&args.output_dir)?;

    let orchestrator = Orchestrator::new(client);
    let images = orchestrator.generate_images(&form).await?;

    let mut saved = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        saved.push(image.save(&args.output_dir, i)?);
    }

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "requested": charviz::VARIANT_COUNT,
            "produced": images.len(),
            "quality": form.quality,
            "images": images
                .iter()
                .zip(&saved)
                .map(|(image, path)| serde_json::json!({
                    "id": image.id,
                    "mime_type": image.payload.mime_type,
                    "output": path.display().to_string(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated {} of {} images via {}:",
            images.len(),
            charviz::VARIANT_COUNT,
            orchestrator.model().name()
        );
        for path in &saved {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

fn print_prompt(args: &PromptArgs, json_output: bool) -> anyhow::Result<()> {
    let form = args.to_form();
    let prompt = compose_prompt(&form.character_desc, &form.scene_desc, &form);

    if json_output {
        let result = serde_json::json!({
            "prompt": prompt,
            "needs_translation": charviz::is_vietnamese(&form.character_desc)
                || charviz::is_vietnamese(&form.scene_desc),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{prompt}");
    }
    Ok(())
}

async fn check(args: &ClientArgs, json_output: bool) -> anyhow::Result<()> {
    let client = args.build_client()?;
    let model = client.image_model().as_str();
    let result = client.health_check().await;

    if json_output {
        let report = serde_json::json!({
            "provider": client.name(),
            "model": model,
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &result {
            Ok(()) => println!("✓ {} ({}) is reachable", client.name(), model),
            Err(e) => println!("✗ {} ({}): {}", client.name(), model, e),
        }
    }

    result?;
    Ok(())
}
