use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use larder_client::{
    Catalog, ContentStoreConfig, DeliveryClient, EntryId, ManagementClient, RecipeSync, SyncError,
};
use larder_web::{
    config::Config,
    errors::{WebError, WebResult},
    form::RecipeForm,
};
use minijinja::context;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

lazy_static::lazy_static! {
    static ref TEMPLATES: minijinja::Environment<'static> = {
        let mut env = minijinja::Environment::new();
        for (name, template) in &[
            ("base.html.jinja", include_str!("../templates/base.html.jinja")),
            ("index.html.jinja", include_str!("../templates/index.html.jinja")),
            ("edit.html.jinja", include_str!("../templates/edit.html.jinja")),
        ] {
            env.add_template(name, template)
                .expect("Failed to register template");
        }
        env
    };
}

#[derive(Parser, Debug)]
struct Args {
    /// YAML configuration file. Without it, store settings come from the environment
    #[clap(long)]
    config: Option<String>,

    /// The address and optionally port to bind to, when there is no config file
    #[clap(long, default_value = "0.0.0.0:3000")]
    address: String,
}

type SharedCatalog = Arc<Mutex<Catalog<DeliveryClient, ManagementClient>>>;

#[derive(Clone)]
struct AllStates {
    catalog: SharedCatalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let (address, log_dir, store_config) = match &args.config {
        Some(path) => {
            let config = Config::load(path).context("Loading configuration")?;
            (
                config.server.address,
                config.server.log_dir,
                config.content_store,
            )
        }
        None => (
            args.address.clone(),
            None,
            ContentStoreConfig::from_env().context("Configuring the content store")?,
        ),
    };

    // initialize tracing
    let log_dir = match log_dir {
        Some(dir) => dir.into(),
        None => std::env::current_dir()?,
    };
    let file_appender = tracing_appender::rolling::daily(log_dir, "access.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let delivery = DeliveryClient::new(&store_config).context("Setting up delivery")?;
    let management = ManagementClient::new(&store_config).context("Setting up management")?;
    let mut catalog = Catalog::new(delivery, RecipeSync::new(management, &store_config));
    if !catalog.refresh().await {
        tracing::warn!("Starting with an empty catalog");
    }

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/recipes", post(create_recipe))
        .route("/recipes/:recipe_id", post(update_recipe))
        .route("/recipes/:recipe_id/edit", get(edit_recipe))
        .route("/recipes/:recipe_id/delete", post(delete_recipe))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(AllStates {
            catalog: Arc::new(Mutex::new(catalog)),
        });

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Listening on {}", address);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

/// Render the list, with the add form either empty or as last submitted
fn render_index(
    catalog: &Catalog<DeliveryClient, ManagementClient>,
    form: &RecipeForm,
    form_error: Option<String>,
) -> WebResult<String> {
    Ok(TEMPLATES.get_template("index.html.jinja")?.render(context! {
        recipes => catalog.visible(),
        query => catalog.query(),
        last_error => catalog.last_error(),
        load_error => catalog.load_error(),
        form => form.view(),
        form_error => form_error,
    })?)
}

fn render_edit(recipe_id: &str, form: &RecipeForm, form_error: Option<String>) -> WebResult<String> {
    Ok(TEMPLATES.get_template("edit.html.jinja")?.render(context! {
        recipe_id => recipe_id,
        form => form.view(),
        form_error => form_error,
    })?)
}

// The list of recipes, reloaded on every visit and filtered by the query
async fn root(
    State(allstates): State<AllStates>,
    Query(search): Query<SearchQuery>,
) -> WebResult<Html<String>> {
    let mut catalog = allstates.catalog.lock().await;
    catalog.search(search.query).await;
    Ok(Html(render_index(&catalog, &RecipeForm::default(), None)?))
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_recipe(
    State(allstates): State<AllStates>,
    multipart: Multipart,
) -> WebResult<Response> {
    let form = RecipeForm::from_multipart(multipart).await?;
    let mut catalog = allstates.catalog.lock().await;
    match catalog.add(&form.to_upload()).await {
        Err(SyncError::Validation(err)) => {
            let page = render_index(&catalog, &form, Some(err.to_string()))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        // Other failures are kept by the catalog and shown on the list
        Ok(_) | Err(_) => Ok(Redirect::to("/").into_response()),
    }
}

async fn edit_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<String>,
) -> WebResult<Html<String>> {
    let mut catalog = allstates.catalog.lock().await;
    if catalog.recipe(&recipe_id).is_none() {
        catalog.refresh().await;
    }
    let recipe = catalog.recipe(&recipe_id).ok_or(WebError::NotFound)?;
    Ok(Html(render_edit(
        &recipe_id,
        &RecipeForm::from_recipe(recipe),
        None,
    )?))
}

async fn update_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<String>,
    multipart: Multipart,
) -> WebResult<Response> {
    let form = RecipeForm::from_multipart(multipart).await?;
    let mut catalog = allstates.catalog.lock().await;
    match catalog.edit(&form.to_update(EntryId::from(recipe_id.as_str()))).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(SyncError::Validation(err)) => {
            let page = render_edit(&recipe_id, &form, Some(err.to_string()))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(err) => {
            let page = render_edit(&recipe_id, &form, Some(err.to_string()))?;
            Ok((StatusCode::BAD_GATEWAY, Html(page)).into_response())
        }
    }
}

async fn delete_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<String>,
) -> WebResult<Redirect> {
    let mut catalog = allstates.catalog.lock().await;
    // A failure stays in the catalog's last error, which the list shows
    let _ = catalog.remove(&EntryId::from(recipe_id)).await;
    Ok(Redirect::to("/"))
}
