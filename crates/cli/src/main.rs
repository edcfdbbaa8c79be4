use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use closet_model::{
    ClothingItem, Coordinates, Gender, ImagePayload, Inspiration, ItemClassification,
    OutfitSuggestion, PreferencesPatch, UserPreferences,
};
use colored::Colorize;
use persistence::Identity;
use server::{AppConfig, ClosetService, Plan, SuggestOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Closet - wardrobe catalog and outfit ideas
#[derive(Parser)]
#[command(name = "closet")]
#[command(about = "Catalog your clothes and get outfit suggestions", long_about = None)]
struct Cli {
    /// Directory for guest closet data (overrides CLOSET_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog items
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Classify a photo without storing it
    Tag {
        /// Image file to classify
        path: PathBuf,
    },

    /// Remove the background from a photo
    RemoveBg {
        /// Image file to clean up
        path: PathBuf,

        /// Where to write the result
        #[arg(long)]
        out: PathBuf,
    },

    /// Suggest an outfit
    Suggest {
        /// Latitude for the weather lookup
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude for the weather lookup
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Occasion to dress for
        #[arg(long)]
        occasion: Option<String>,

        /// Do not send the closet, ask for a general suggestion
        #[arg(long)]
        no_catalog: bool,

        /// Save the suggestion as an inspiration
        #[arg(long)]
        save: bool,
    },

    /// List saved inspirations
    Inspirations,

    /// Show or update style preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Print a checkout link for a plan
    Checkout {
        /// Plan to buy (monthly or yearly)
        #[arg(long)]
        plan: Plan,

        /// Reference id passed through to the payment provider
        #[arg(long)]
        reference: String,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List catalog items
    List,
    /// Add a clothing photo to the catalog
    Add { path: PathBuf },
    /// Remove an item by id
    Remove { id: String },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Show the stored preferences
    Show,
    /// Update some preferences, leaving the rest unchanged
    Set(PrefsArgs),
}

#[derive(Args)]
struct PrefsArgs {
    /// male, female or other
    #[arg(long)]
    gender: Option<Gender>,

    /// Comma-separated style keywords
    #[arg(long, value_delimiter = ',')]
    styles: Option<Vec<String>>,

    /// Comma-separated favorite colors
    #[arg(long, value_delimiter = ',')]
    colors: Option<Vec<String>>,

    /// Comma-separated occasions
    #[arg(long, value_delimiter = ',')]
    occasions: Option<Vec<String>>,

    #[arg(long)]
    top_size: Option<String>,

    #[arg(long)]
    bottom_size: Option<String>,

    #[arg(long)]
    shoe_size: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let data_dir = config.data_dir.clone();

    let service = ClosetService::from_config(config)?;
    service.switch_identity(Identity::Guest).await?;
    tracing::debug!(data_dir = %data_dir.display(), "Guest closet loaded");

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Items { action } => handle_items(&service, action).await?,
        Commands::Tag { path } => handle_tag(&service, &path).await?,
        Commands::RemoveBg { path, out } => handle_remove_bg(&service, &path, &out).await?,
        Commands::Suggest {
            lat,
            lon,
            occasion,
            no_catalog,
            save,
        } => {
            let coordinates = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
            let options = SuggestOptions {
                coordinates,
                occasion,
                use_catalog: !no_catalog,
            };
            handle_suggest(&service, options, save).await?
        }
        Commands::Inspirations => print_inspirations(&service.list_inspirations()),
        Commands::Prefs { action } => handle_prefs(&service, action).await?,
        Commands::Checkout { plan, reference } => {
            let url = service.checkout_url(plan, &reference)?;
            println!("{}", url);
        }
    }

    Ok(())
}

/// Read an image file into a data-URL payload
async fn read_image(path: &Path) -> Result<ImagePayload> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        other => bail!("Unsupported image type {:?} for {}", other, path.display()),
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImagePayload::from_bytes(mime, &bytes))
}

/// Handle the 'items' commands
async fn handle_items(service: &ClosetService, action: ItemsAction) -> Result<()> {
    match action {
        ItemsAction::List => print_items(&service.list_items()),
        ItemsAction::Add { path } => {
            let image = read_image(&path).await?;
            let start = Instant::now();
            let item = service.add_item_from_image(image).await?;
            println!(
                "{} Added {} in {:?}",
                "✓".green(),
                item.id.bold(),
                start.elapsed()
            );
            print_classification(&item.classification());
        }
        ItemsAction::Remove { id } => {
            let item = service.remove_item(&id).await?;
            println!("{} Removed {} ({})", "✓".green(), item.id, item.sub_category);
        }
    }
    Ok(())
}

/// Handle the 'tag' command
async fn handle_tag(service: &ClosetService, path: &Path) -> Result<()> {
    let image = read_image(path).await?;
    let classification = service.tag_image(&image).await;
    print_classification(&classification);
    Ok(())
}

/// Handle the 'remove-bg' command
async fn handle_remove_bg(service: &ClosetService, path: &Path, out: &Path) -> Result<()> {
    let image = read_image(path).await?;
    let result = service.remove_background(&image).await;
    if result == image {
        println!("{} Background removal unavailable, writing the original image", "!".yellow());
    }
    let bytes = result.decode().context("Result image is not valid base64")?;
    tokio::fs::write(out, bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("{} Wrote {} ({})", "✓".green(), out.display(), result.mime_type());
    Ok(())
}

/// Handle the 'suggest' command
async fn handle_suggest(
    service: &ClosetService,
    options: SuggestOptions,
    save: bool,
) -> Result<()> {
    let suggestion = service.suggest_outfit(options).await?;
    print_suggestion(service, &suggestion);

    if save {
        let inspiration = service.save_inspiration(&suggestion).await?;
        println!("{} Saved as inspiration {}", "✓".green(), inspiration.id);
    }
    Ok(())
}

/// Handle the 'prefs' commands
async fn handle_prefs(service: &ClosetService, action: PrefsAction) -> Result<()> {
    let preferences = match action {
        PrefsAction::Show => service.preferences(),
        PrefsAction::Set(args) => {
            // Sizes are replaced as a whole, so start from the stored ones.
            let sizes_given =
                args.top_size.is_some() || args.bottom_size.is_some() || args.shoe_size.is_some();
            let sizes = if sizes_given {
                let mut sizes = service.preferences().sizes;
                sizes.top = args.top_size.or(sizes.top);
                sizes.bottom = args.bottom_size.or(sizes.bottom);
                sizes.shoes = args.shoe_size.or(sizes.shoes);
                Some(sizes)
            } else {
                None
            };
            let patch = PreferencesPatch {
                gender: args.gender,
                style_preferences: args.styles,
                sizes,
                favorite_colors: args.colors,
                occasions: args.occasions,
            };
            service.update_preferences(patch).await?
        }
    };
    print_preferences(&preferences)
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_items(items: &[ClothingItem]) {
    print!("{}", format!("Closet ({} items):\n", items.len()).bold().blue());
    for (i, item) in items.iter().enumerate() {
        println!(
            "{}. {} {} / {} [{}] {}",
            (i + 1).to_string().green(),
            item.id.dimmed(),
            item.category,
            item.sub_category,
            item.tags.join(", "),
            item.dominant_colors.join(" ")
        );
    }
}

fn print_classification(classification: &ItemClassification) {
    print!("{}Category: {}\n", "• ".green(), classification.category);
    print!("{}Sub-category: {}\n", "• ".green(), classification.sub_category);
    print!("{}Tags: {}\n", "• ".cyan(), classification.tags.join(", "));
    print!("{}Colors: {}\n", "• ".cyan(), classification.dominant_colors.join(" "));
    match &classification.pattern_description {
        Some(pattern) if classification.has_pattern => {
            print!("{}Pattern: {}\n", "• ".cyan(), pattern)
        }
        _ if classification.has_pattern => print!("{}Pattern: yes\n", "• ".cyan()),
        _ => print!("{}Pattern: none\n", "• ".cyan()),
    }
}

fn print_suggestion(service: &ClosetService, suggestion: &OutfitSuggestion) {
    print!("{}", "Outfit suggestion:\n".bold().blue());
    println!("{}", suggestion.description);

    let sync = service.sync();
    for id in &suggestion.item_ids {
        match sync.item(id) {
            Some(item) => println!("  {} {} ({})", "•".green(), item.sub_category, id.dimmed()),
            None => println!("  {} {}", "•".green(), id),
        }
    }
    if !suggestion.missing_items.is_empty() {
        println!("{} {}", "Missing:".yellow(), suggestion.missing_items.join(", "));
    }
    for warning in &suggestion.weather_warnings {
        println!("{} {}", "Weather:".yellow(), warning);
    }
    for (i, alternative) in suggestion.alternative_outfits.iter().enumerate() {
        println!(
            "{} {} [{}] {}",
            format!("Alternative {}:", i + 1).cyan(),
            alternative.description,
            alternative.item_ids.join(", "),
            alternative.rationale.dimmed()
        );
    }
}

fn print_inspirations(inspirations: &[Inspiration]) {
    print!("{}", format!("Inspirations ({}):\n", inspirations.len()).bold().blue());
    for inspiration in inspirations {
        let pieces = inspiration
            .items
            .iter()
            .map(|item| item.sub_category.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{} {} [{}] {}",
            inspiration.created_at.format("%Y-%m-%d").to_string().green(),
            inspiration.description,
            pieces,
            inspiration.id.dimmed()
        );
    }
}

fn print_preferences(preferences: &UserPreferences) -> Result<()> {
    let json = serde_json::to_string_pretty(preferences).context("Failed to render preferences")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_image_rejects_unknown_extension() {
        let err = read_image(Path::new("photo.bmp")).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported image type"));
    }

    #[tokio::test]
    async fn test_read_image_reports_missing_file() {
        let err = read_image(Path::new("does-not-exist.JPG")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_cli_parses_suggest_with_coordinates() {
        let cli = Cli::try_parse_from([
            "closet", "suggest", "--lat", "-33.9", "--lon", "18.4", "--occasion", "brunch",
        ])
        .unwrap();
        match cli.command {
            Commands::Suggest { lat, lon, occasion, no_catalog, save } => {
                assert_eq!(lat, Some(-33.9));
                assert_eq!(lon, Some(18.4));
                assert_eq!(occasion.as_deref(), Some("brunch"));
                assert!(!no_catalog);
                assert!(!save);
            }
            _ => panic!("expected suggest"),
        }
    }

    #[test]
    fn test_cli_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["closet", "suggest", "--lat", "10"]).is_err());
    }

    #[test]
    fn test_cli_parses_comma_separated_preferences() {
        let cli = Cli::try_parse_from([
            "closet", "prefs", "set", "--gender", "female", "--styles", "minimal,boho",
        ])
        .unwrap();
        match cli.command {
            Commands::Prefs { action: PrefsAction::Set(args) } => {
                assert_eq!(args.gender, Some(Gender::Female));
                assert_eq!(args.styles, Some(vec!["minimal".to_string(), "boho".to_string()]));
                assert!(args.colors.is_none());
            }
            _ => panic!("expected prefs set"),
        }
    }
}
