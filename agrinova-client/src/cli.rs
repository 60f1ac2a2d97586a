use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agrinova_shared::pagination::Page;
use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::auth::{FarmerSignup, ManagerSignup, SessionManager, SessionStore};
use crate::backend::Backend;
use crate::config::Config;
use crate::farm::{FarmData, InventoryInput, ReportInput};
use crate::tui;
use crate::util;

#[derive(Parser)]
#[command(name = "agrinova")]
#[command(version, about = "AgriNova360 CLI - farm inventory, reports and workers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        email: String,

        /// Prompted for when omitted
        #[arg(long, env = "AGRINOVA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget the cached session
    Logout,

    /// Show who is logged in
    Status,

    /// Create a manager or farmer account
    #[command(subcommand)]
    Signup(SignupCommands),

    /// List and add inventory items
    #[command(subcommand)]
    Inventory(InventoryCommands),

    /// List and file daily farm reports
    #[command(subcommand)]
    Reports(ReportsCommands),

    /// Farmers attached to your organization
    #[command(subcommand)]
    Workers(WorkersCommands),

    /// Current weather, for your default city unless one is given
    Weather { city: Option<String> },

    /// Upload a new profile photo (JPEG)
    ProfilePhoto { path: PathBuf },

    /// Show CLI version information
    Version,
}

#[derive(Subcommand)]
enum SignupCommands {
    /// Register a new farm and its manager
    Manager {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AGRINOVA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long = "name")]
        full_name: String,
        #[arg(long = "farm-name")]
        farm_name: String,
        #[arg(long)]
        phone: String,
        #[arg(long = "farm-address")]
        farm_address: String,
    },

    /// Join an existing farm with its join code
    Farmer {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AGRINOVA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long = "name")]
        full_name: String,
        #[arg(long)]
        phone: String,
        /// Six character code from your farm manager
        #[arg(long)]
        code: String,
    },
}

#[derive(Subcommand)]
enum InventoryCommands {
    List,
    Add {
        name: String,
        quantity: String,
        /// kg, g, L, mL, pcs, bags, bottles, trays, boxes or vials
        unit: String,
        /// JPEG photo of the item
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    Count,
}

#[derive(Subcommand)]
enum ReportsCommands {
    List {
        /// At most 100
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Add {
        #[arg(long)]
        section: String,
        #[arg(long)]
        activities: String,
        #[arg(long = "production")]
        production_count: String,
        #[arg(long)]
        casualties: String,
        #[arg(long)]
        observations: String,
        /// Defaults to the current weather in your default city
        #[arg(long)]
        weather: Option<String>,
        #[arg(long)]
        challenges: Option<String>,
        #[arg(long)]
        plans: Option<String>,
        #[arg(long = "inputs-used")]
        inputs_used: Option<String>,
        #[arg(long = "sales-revenue")]
        sales_revenue: Option<String>,
        #[arg(long)]
        expenses: Option<String>,
    },
}

#[derive(Subcommand)]
enum WorkersCommands {
    List,
    Count,
}

/// Everything a command needs once the config is loaded.
struct App {
    config: Config,
    sessions: Arc<SessionManager>,
    farm: FarmData,
}

impl App {
    async fn start() -> anyhow::Result<Self> {
        let config = Config::load()?;
        util::logging::init_logging(&config.log_level);

        let backend = Backend::remote(&config)?;
        let sessions = Arc::new(SessionManager::new(
            backend.clone(),
            SessionStore::default_location()?,
        ));
        sessions.initialize().await?;

        let farm = FarmData::new(&backend, Duration::from_secs(config.cache_ttl_secs));
        let token = farm.cancellation_token().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling...");
                token.cancel();
            }
        });

        Ok(Self {
            config,
            sessions,
            farm,
        })
    }
}

fn read_password(given: Option<String>) -> anyhow::Result<String> {
    if let Some(p) = given {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn read_photo(path: &PathBuf) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read photo {}", path.display()))?;
    Ok(Bytes::from(data))
}

pub async fn cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("Version: {}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", env!("GIT_COMMIT"));
        println!("Rust: {}", env!("RUSTC_VERSION"));
        println!(
            "Platform: {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        return Ok(());
    }

    let app = App::start().await?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            println!("Logging in...");
            let session = app.sessions.login(&email, &password).await?;
            println!(
                "Logged in as {} ({})",
                session.full_name,
                tui::role_badge(session.role)
            );
        }

        Commands::Logout => {
            println!("Logging out...");
            app.sessions.logout().await?;
            app.farm.clear_cache();
            println!("Logged out successfully");
        }

        Commands::Status => match app.sessions.current() {
            Some(session) => tui::session::print_session(&session),
            None => println!("Not logged in"),
        },

        Commands::Signup(cmd) => match cmd {
            SignupCommands::Manager {
                email,
                password,
                full_name,
                farm_name,
                phone,
                farm_address,
            } => {
                let password = read_password(password)?;
                println!("Creating farm and manager account...");
                let (session, code) = app
                    .sessions
                    .signup_as_manager(ManagerSignup {
                        email,
                        password,
                        full_name,
                        org_name: farm_name,
                        phone,
                        org_address: farm_address,
                    })
                    .await?;
                println!(
                    "Manager account created for {}",
                    session.organization_name.as_deref().unwrap_or("your farm")
                );
                println!("Farm join code: {}", tui::bold(&code));
                println!("Share it with your workers so they can sign up.");
            }
            SignupCommands::Farmer {
                email,
                password,
                full_name,
                phone,
                code,
            } => {
                let password = read_password(password)?;
                println!("Creating farmer account...");
                let session = app
                    .sessions
                    .signup_as_farmer(FarmerSignup {
                        email,
                        password,
                        full_name,
                        phone,
                        join_code: code,
                    })
                    .await?;
                println!(
                    "Farmer account created, joined {}",
                    session.organization_name.as_deref().unwrap_or("the farm")
                );
            }
        },

        Commands::Inventory(cmd) => {
            let session = app.sessions.require()?;
            match cmd {
                InventoryCommands::List => {
                    let items = app.farm.fetch_inventory(&session.organization_id).await?;
                    let mut names = HashMap::from([(
                        session.user_id.clone(),
                        session.full_name.clone(),
                    )]);
                    app.farm.fetch_uploader_names(&items, &mut names).await?;
                    tui::farm::print_inventory(&items, &names);
                }
                InventoryCommands::Add {
                    name,
                    quantity,
                    unit,
                    photo,
                } => {
                    let photo = match &photo {
                        Some(path) => Some(read_photo(path).await?),
                        None => None,
                    };
                    let item = app
                        .farm
                        .add_inventory_item(
                            &session,
                            InventoryInput {
                                name,
                                quantity,
                                unit,
                                photo,
                            },
                        )
                        .await?;
                    println!("Added {} {} of {}", item.quantity, item.unit, item.name);
                }
                InventoryCommands::Count => {
                    let count = app.farm.count_inventory(&session.organization_id).await?;
                    println!("{count}");
                }
            }
        }

        Commands::Reports(cmd) => {
            let session = app.sessions.require()?;
            match cmd {
                ReportsCommands::List { limit } => {
                    let reports = app
                        .farm
                        .fetch_farm_reports_page(&session.organization_id, Page::new(0, limit))
                        .await?;
                    tui::farm::print_reports(&reports);
                }
                ReportsCommands::Add {
                    section,
                    activities,
                    production_count,
                    casualties,
                    observations,
                    weather,
                    challenges,
                    plans,
                    inputs_used,
                    sales_revenue,
                    expenses,
                } => {
                    let weather = match weather {
                        Some(w) => w,
                        None => {
                            let Some(city) = app.config.default_city.clone() else {
                                bail!("--weather is required when no default_city is configured");
                            };
                            let report = app.farm.current_weather(&city).await?;
                            debug!(city = %city, "weather prefilled");
                            report.summary()
                        }
                    };
                    let report = app
                        .farm
                        .add_farm_report(
                            &session,
                            ReportInput {
                                section,
                                activities,
                                production_count,
                                casualties,
                                observations,
                                weather,
                                challenges,
                                plans,
                                inputs_used,
                                sales_revenue,
                                expenses_incurred: expenses,
                            },
                        )
                        .await?;
                    println!("Report filed for {} ({})", report.section, report.id);
                }
            }
        }

        Commands::Workers(cmd) => {
            let session = app.sessions.require()?;
            match cmd {
                WorkersCommands::List => {
                    let workers = app.farm.fetch_workers(&session.organization_id).await?;
                    tui::farm::print_workers(&workers);
                }
                WorkersCommands::Count => {
                    let count = app
                        .farm
                        .fetch_worker_count(&session.organization_id)
                        .await?;
                    println!("{count}");
                }
            }
        }

        Commands::Weather { city } => {
            let Some(city) = city.or_else(|| app.config.default_city.clone()) else {
                bail!("No city given and no default_city configured");
            };
            let report = app.farm.current_weather(&city).await?;
            tui::session::print_weather(&report);
        }

        Commands::ProfilePhoto { path } => {
            let session = app.sessions.require()?;
            let data = read_photo(&path).await?;
            let url = app.farm.upload_profile_photo(&session, data).await?;
            println!("Profile photo uploaded: {url}");
        }

        Commands::Version => {}
    }

    Ok(())
}
