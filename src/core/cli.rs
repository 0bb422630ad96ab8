use std::fmt::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::services::product::DEFAULT_PAGE_SIZE;
use crate::token::store::TokenStore;
use crate::types::request::ProductDraft;

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Command-line client for the storefront catalog")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the token
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in with it
    Register {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Show who is signed in
    Whoami,
    #[command(subcommand)]
    Products(ProductCommand),
    #[command(subcommand)]
    Image(ImageCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    Get {
        id: i64,
    },
    Create(DraftArgs),
    Update {
        id: i64,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, clap::Args)]
pub struct DraftArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub price: String,
    /// Id of an image that is already uploaded
    #[arg(long = "image")]
    pub images: Vec<String>,
    /// Local file to upload before saving
    #[arg(long = "upload")]
    pub uploads: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ImageCommand {
    Upload { path: PathBuf },
    Url { uuid: String },
}

/// Runs one command against `app` and returns what should be shown to the
/// user.
///
/// An authenticated call rejected with 401/403 signs the user out before the
/// error is returned.
pub async fn execute<S: TokenStore>(app: &AppState<S>, command: Command) -> Result<String, Error> {
    let result = match command {
        Command::Login { username, password } => {
            return signed_in(app.session.login(&username, &password).await?, &username);
        }
        Command::Register { username, password } => {
            return signed_in(app.session.register(&username, &password).await?, &username);
        }
        Command::Logout => {
            app.session.logout().await;
            return Ok("Signed out".to_owned());
        }
        Command::Whoami => return Ok(whoami(app).await),
        Command::Products(command) => products(app, command).await,
        Command::Image(command) => image(app, command).await,
    };

    if let Err(e) = &result {
        if e.is_auth_failure() && app.session.state().await.token().is_some() {
            tracing::warn!("Token rejected by the backend, signing out");
            app.session.logout().await;
        }
    }

    result
}

fn signed_in(accepted: bool, username: &str) -> Result<String, Error> {
    if accepted {
        Ok(format!("Signed in as {username}"))
    } else {
        Err(Error::NotSignedIn)
    }
}

async fn whoami<S: TokenStore>(app: &AppState<S>) -> String {
    let state = app.session.state().await;

    let Some(claims) = state.claims() else {
        return "Not signed in".to_owned();
    };

    let mut out = String::new();
    let _ = writeln!(out, "User: {}", claims.subject().unwrap_or("unavailable"));
    let _ = write!(
        out,
        "Role: {}",
        if state.is_admin() { "Administrator" } else { "User" }
    );
    if let Some(exp) = claims.expires_at() {
        let _ = write!(out, "\nExpires: {}", exp.to_rfc3339());
    }

    out
}

async fn require_admin<S: TokenStore>(app: &AppState<S>) -> Result<(), Error> {
    let state = app.session.state().await;

    match state.token() {
        None => Err(Error::NotSignedIn),
        Some(_) if !state.is_admin() => Err(Error::NotAdmin),
        Some(_) => Ok(()),
    }
}

async fn products<S: TokenStore>(app: &AppState<S>, command: ProductCommand) -> Result<String, Error> {
    match command {
        ProductCommand::List { page, size } => {
            let page = app.products.get_products(page, size).await?;

            let mut out = String::new();
            for product in &page.elements {
                let _ = writeln!(out, "{}\t{}\t{:.2}", product.id, product.name, product.price);
            }
            let _ = write!(
                out,
                "Page {} of {} ({} products)",
                page.actual_page.saturating_add(1),
                page.total_pages.max(1),
                page.total_elements
            );
            if page.has_next() {
                let _ = write!(out, ", next: --page {}", page.actual_page.saturating_add(1));
            }

            Ok(out)
        }
        ProductCommand::Get { id } => {
            let product = app.products.get_product_by_id(id).await?;
            let mut out = serde_json::to_string_pretty(&product)?;

            for url in product
                .image_ids
                .iter()
                .filter_map(|uuid| app.images.get_image_url(Some(uuid)))
            {
                let _ = write!(out, "\n{url}");
            }

            Ok(out)
        }
        ProductCommand::Create(draft) => {
            require_admin(app).await?;

            let request = prepare(app, draft).await?.validate()?;
            let product = app.products.create_product(&request).await?;

            Ok(format!("Created product {}", product.id))
        }
        ProductCommand::Update { id, draft } => {
            require_admin(app).await?;

            let product = prepare(app, draft).await?.validate_for_update(id)?;
            let product = app.products.update_product(&product).await?;

            Ok(format!("Updated product {}", product.id))
        }
        ProductCommand::Delete { id } => {
            require_admin(app).await?;

            app.products.delete_product(id).await?;

            Ok(format!("Deleted product {id}"))
        }
    }
}

/// Uploads pending local files and collects their ids into the draft.
async fn prepare<S: TokenStore>(app: &AppState<S>, args: DraftArgs) -> Result<ProductDraft, Error> {
    let mut image_ids = args.images;

    for path in &args.uploads {
        image_ids.push(app.images.upload_file(path).await?);
    }

    Ok(ProductDraft {
        name: args.name,
        description: args.description,
        price: args.price,
        image_ids,
    })
}

async fn image<S: TokenStore>(app: &AppState<S>, command: ImageCommand) -> Result<String, Error> {
    match command {
        ImageCommand::Upload { path } => app.images.upload_file(&path).await,
        ImageCommand::Url { uuid } => Ok(app
            .images
            .get_image_url(Some(&uuid))
            .unwrap_or_default()),
    }
}
