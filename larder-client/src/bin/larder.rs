use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use larder::{ImageForUpload, Ingredient, RecipeForUpload};
use larder_client::{
    ContentDelivery, ContentStoreConfig, DeliveryClient, EntryId, ImageChange, ManagementClient,
    RecipeSync, RecipeUpdate,
};
use tracing_subscriber::EnvFilter;

/// Browse and edit the recipe catalog
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// YAML configuration file. Without it, settings come from the environment
    #[arg(long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List published recipes
    List {
        /// Only show recipes whose title contains this
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Create and publish a recipe
    Add(RecipeArgs),
    /// Replace a recipe's fields and republish it
    Edit {
        /// The recipe's entry id
        id: String,
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Delete a recipe and its image
    Delete {
        /// The recipe's entry id
        id: String,
    },
}

#[derive(ClapArgs, Debug)]
struct RecipeArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    /// An ingredient as NAME=QUANTITY. Repeat for each ingredient
    #[arg(short, long = "ingredient", value_parser = parse_ingredient)]
    ingredients: Vec<Ingredient>,
    /// Image file to attach
    #[arg(long)]
    image: Option<PathBuf>,
}

fn parse_ingredient(arg: &str) -> Result<Ingredient, String> {
    let (name, quantity) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=QUANTITY, got {arg:?}"))?;
    Ok(Ingredient::new(name.trim(), quantity.trim()))
}

async fn read_image(path: &Path) -> Result<ImageForUpload> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} is not a file name", path.display()))?
        .to_string();
    let content_bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    Ok(ImageForUpload {
        content_type: ImageForUpload::guess_content_type(&file_name).to_string(),
        file_name,
        content_bytes,
    })
}

fn management(config: &ContentStoreConfig) -> Result<RecipeSync<ManagementClient>> {
    let client = ManagementClient::new(config)?;
    Ok(RecipeSync::new(client, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ContentStoreConfig::load(path)?,
        None => ContentStoreConfig::from_env().context("Could not configure the content store")?,
    };

    match args.command {
        Command::List { search } => {
            let recipes = DeliveryClient::new(&config)?.list_entries().await?;
            for recipe in larder::search::filter_by_title(&recipes, &search) {
                println!("{}  {}", recipe.recipe_id, recipe.title);
                println!("    {}", recipe.description);
                for ingredient in &recipe.ingredients {
                    println!("    - {} ({})", ingredient.name, ingredient.quantity);
                }
                if let Some(url) = recipe.image.as_ref().and_then(|image| image.url.as_ref()) {
                    println!("    image: {url}");
                }
            }
        }
        Command::Add(recipe) => {
            let image = match &recipe.image {
                Some(path) => Some(read_image(path).await?),
                None => None,
            };
            let upload = RecipeForUpload {
                title: recipe.title,
                description: recipe.description,
                ingredients: recipe.ingredients,
                image,
            };
            let id = management(&config)?.create(&upload).await?;
            println!("Created {id}");
        }
        Command::Edit { id, recipe } => {
            let image = match &recipe.image {
                Some(path) => ImageChange::Replace(read_image(path).await?),
                None => ImageChange::Keep,
            };
            let update = RecipeUpdate {
                entry_id: EntryId::from(id),
                title: recipe.title,
                description: recipe.description,
                ingredients: recipe.ingredients,
                image,
            };
            management(&config)?.update(&update).await?;
            println!("Updated {}", update.entry_id);
        }
        Command::Delete { id } => {
            let id = EntryId::from(id);
            management(&config)?.delete(&id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
