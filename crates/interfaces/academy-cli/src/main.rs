use academy_app_core::FilePersistence;
use academy_cli::commands::{self, CreateOptions};
use academy_cli::{drafts, ApiOverrides, SettingsChange};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ApiArgs {
    #[arg(long, env = "ACADEMY_API_URL", help = "Course API base URL (overrides settings)")]
    api_url: Option<String>,
    #[arg(long, env = "ACADEMY_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl From<ApiArgs> for ApiOverrides {
    fn from(a: ApiArgs) -> Self {
        ApiOverrides {
            api_url: a.api_url,
            token: a.token,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create courses from plan files
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },
    /// Manage locally saved wizard drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum CourseCommands {
    /// Run the whole wizard against the backend
    Create {
        plan: Utf8PathBuf,
        #[arg(long, help = "Finish without creating the quiz")]
        skip_quiz: bool,
        #[arg(long, help = "Keep a draft when a step fails")]
        save_draft_on_error: bool,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Validate a plan without contacting the backend
    Check { plan: Utf8PathBuf },
}

#[derive(Subcommand)]
enum DraftCommands {
    List,
    Show {
        id: Uuid,
        #[arg(long, help = "Print the stored session as JSON")]
        json: bool,
    },
    /// Continue a draft from the step it was saved on
    Restore {
        id: Uuid,
        #[arg(long, help = "Take the remaining steps from this plan file")]
        plan: Option<Utf8PathBuf>,
        #[arg(long)]
        skip_quiz: bool,
        #[command(flatten)]
        api: ApiArgs,
    },
    Discard { id: Uuid },
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long, conflicts_with = "clear_token")]
        token: Option<String>,
        #[arg(long)]
        clear_token: bool,
        #[arg(long, help = "Request timeout in seconds")]
        timeout: Option<u64>,
        #[arg(long, help = "Concurrent uploads per step")]
        uploads: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let files = FilePersistence::new();

    match cli.command {
        Commands::Course { command } => match command {
            CourseCommands::Create {
                plan,
                skip_quiz,
                save_draft_on_error,
                api,
            } => {
                let opts = CreateOptions {
                    skip_quiz,
                    save_draft_on_error,
                };
                commands::cmd_course_create(&files, &api.into(), plan, opts).await?;
            }
            CourseCommands::Check { plan } => commands::cmd_course_check(plan)?,
        },
        Commands::Draft { command } => match command {
            DraftCommands::List => drafts::handle_list(&files)?,
            DraftCommands::Show { id, json } => drafts::handle_show(&files, id, json)?,
            DraftCommands::Restore {
                id,
                plan,
                skip_quiz,
                api,
            } => {
                commands::cmd_draft_restore(&files, &api.into(), id, plan, skip_quiz).await?;
            }
            DraftCommands::Discard { id } => drafts::handle_discard(&files, id)?,
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show => {
                commands::cmd_settings_show(&files)?;
            }
            SettingsCommands::Set {
                api_url,
                token,
                clear_token,
                timeout,
                uploads,
            } => {
                let change = SettingsChange {
                    api_url,
                    token,
                    clear_token,
                    timeout_secs: timeout,
                    uploads,
                };
                commands::cmd_settings_set(&files, change)?;
            }
        },
    }

    Ok(())
}
