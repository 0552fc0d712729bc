mod cli;

use keepsake::{config, media::Upload, AppContext};
use keepsake_common::{MediaNamespace, UserId};
use keepsake_db::{migrations, queries::users};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "keepsake=trace,keepsake_db=debug,keepsake_common=debug".to_string()
        } else {
            "keepsake=info,keepsake_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Init => init_database(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::CreateUser { name } => create_user(&name, cli.config.as_deref()),
        Commands::Users => list_users(cli.config.as_deref()),
        Commands::Upload {
            user_id,
            file,
            theme,
        } => upload_file(UserId::from(user_id), &file, theme, cli.config.as_deref()),
        Commands::Themes { user_id, json } => {
            list_themes(UserId::from(user_id), json, cli.config.as_deref())
        }
        Commands::Version => {
            println!("keepsake {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_context(config_path: Option<&Path>) -> Result<AppContext> {
    let config = config::load_config_or_default(config_path)?;
    tracing::debug!("Opening database at {}", config.database_path());
    AppContext::from_config(config).context("Failed to open database")
}

fn init_database(config_path: Option<&Path>) -> Result<()> {
    let ctx = open_context(config_path)?;
    let conn = ctx.conn()?;
    let version = migrations::current_version(&conn)?;

    println!("✓ Database ready at {}", ctx.config.database_path());
    println!("  Schema version: {}/{}", version, migrations::latest_version());
    println!(
        "  System themes: {}",
        keepsake_db::queries::themes::list_system_themes(&conn)?.len()
    );
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Database: {}", config.database_path());
    println!(
        "  Storage: {:?} at {}",
        config.storage.backend,
        config.storage.root.display()
    );
    println!("  Public URL base: {}", config.storage.public_base_url);
    println!("  Max upload: {} bytes", config.media.max_upload_bytes);
    println!(
        "  Allowed types: {}",
        config.media.allowed_mime_types.join(", ")
    );
    println!("  Slug probe limit: {}", config.slugs.max_probe);

    Ok(())
}

fn create_user(name: &str, config_path: Option<&Path>) -> Result<()> {
    let ctx = open_context(config_path)?;
    let conn = ctx.conn()?;
    let user = users::create_user(&conn, name)?;
    println!("{}", user.id);
    Ok(())
}

fn list_users(config_path: Option<&Path>) -> Result<()> {
    let ctx = open_context(config_path)?;
    let conn = ctx.conn()?;
    for user in users::list_users(&conn)? {
        println!("{:>4}  {}", user.id.to_string(), user.name);
    }
    Ok(())
}

fn upload_file(owner: UserId, file: &Path, theme: bool, config_path: Option<&Path>) -> Result<()> {
    let ctx = open_context(config_path)?;
    {
        let conn = ctx.conn()?;
        if users::get_user(&conn, owner)?.is_none() {
            anyhow::bail!("user {} does not exist", owner);
        }
    }

    let upload = Upload::from_path(file)?;
    let namespace = if theme {
        MediaNamespace::Themes
    } else {
        MediaNamespace::Users
    };

    let media = ctx.media().upload(&upload, owner, namespace)?;
    println!("✓ Uploaded {} as media {}", media.filename, media.id);
    println!("  Type: {} ({} bytes)", media.mime_type, media.byte_size);
    println!("  URL: {}", media.public_url);
    Ok(())
}

fn list_themes(user: UserId, json: bool, config_path: Option<&Path>) -> Result<()> {
    let ctx = open_context(config_path)?;
    let themes = ctx.themes().list_available(user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&themes)?);
        return Ok(());
    }

    for theme in &themes {
        let kind = if theme.is_system() { "system" } else { "user" };
        println!("{:>4}  {:<24} {:<6} {}", theme.id.to_string(), theme.name, kind, theme.css_class);
    }
    Ok(())
}
