use clap::{ArgAction, Parser, Subcommand};
use staging_bot::BotFactory;
use staging_cli::{Action, ConfigArgs, ConfigError, ConfigSource, Lifecycle, LogConfig, RunError};

#[derive(Parser)]
#[command(
    name = "scratch-build-bot",
    about = "Drive scratch builds of the container images in a staging project on OBS",
    version,
    propagate_version = true
)]
struct Cli {
    /// OS version all actions are made for (5, 6, 7, 16.0, Tumbleweed)
    #[arg(long, global = true, env = "OS_VERSION")]
    os_version: Option<String>,

    /// User the bot acts as on OBS
    #[arg(long, global = true, env = "OSC_USER")]
    osc_user: Option<String>,

    /// Branch and worktree the changes are pushed to (generated if empty)
    #[arg(long, short = 'b', global = true, env = "BRANCH_NAME")]
    branch_name: Option<String>,

    /// Load the settings persisted by a previous run, ignoring --os-version and --branch-name
    #[arg(long, short = 'l', global = true)]
    load: bool,

    /// Read the settings from a review comment passed on standard input
    #[arg(long, short = 'f', global = true)]
    from_stdin: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Force rebuild the staging project
    Rebuild,

    /// Create the staging project on OBS
    #[command(name = "create_project")]
    CreateProject,

    /// Fetch the current build state and print it as markdown
    #[command(name = "query_build_result")]
    QueryBuildResult,

    /// Commit the current build recipes into the test branch
    #[command(name = "commit_state")]
    CommitState {
        /// Commit message to use instead of the default ('Test build')
        #[arg(long, short = 'c', default_value = "")]
        commit_message: String,
    },

    /// Commit all changes, create the staging project and rebuild everything
    #[command(name = "scratch_build")]
    ScratchBuild {
        /// Commit message to use instead of the default ('Test build')
        #[arg(long, short = 'c', default_value = "")]
        commit_message: String,
    },

    /// Remove the branch in git and the staging project on OBS
    Cleanup {
        /// Don't delete the local and remote branch
        #[arg(long)]
        no_cleanup_branch: bool,

        /// Don't delete the staging project on OBS
        #[arg(long)]
        no_cleanup_project: bool,
    },

    /// Wait for the project on OBS to finish building (this can take a long time!)
    Wait {
        /// Timeout of the wait operation in seconds
        #[arg(long, short = 't')]
        timeout_sec: Option<u64>,
    },

    /// Exit with 0 if the build succeeded or 1 if it failed
    #[command(name = "get_build_quality")]
    GetBuildQuality,
}

impl From<Commands> for Action {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Rebuild => Action::Rebuild,
            Commands::CreateProject => Action::CreateProject,
            Commands::QueryBuildResult => Action::QueryBuildResult,
            Commands::CommitState { commit_message } => Action::CommitState { commit_message },
            Commands::ScratchBuild { commit_message } => Action::ScratchBuild { commit_message },
            Commands::Cleanup {
                no_cleanup_branch,
                no_cleanup_project,
            } => Action::Cleanup {
                branches: !no_cleanup_branch,
                obs_project: !no_cleanup_project,
            },
            Commands::Wait { timeout_sec } => Action::Wait { timeout_sec },
            Commands::GetBuildQuality => Action::GetBuildQuality,
        }
    }
}

fn run(cli: Cli) -> Result<Option<String>, RunError> {
    let source = ConfigSource::resolve(ConfigArgs {
        load: cli.load,
        from_stdin: cli.from_stdin,
        os_version: cli.os_version,
        branch_name: cli.branch_name,
        osc_username: cli.osc_user,
    })?;
    let action = Action::from(cli.command);
    tracing::debug!(?source, action = %action.id(), "resolved invocation");

    let factory = BotFactory::current_dir().map_err(ConfigError::Acquire)?;
    Lifecycle::new()?.run(&factory, source, tokio::io::stdin(), &action)
}

fn emit(out: &str) {
    if out.is_empty() {
        return;
    }
    if out.ends_with('\n') {
        print!("{out}");
    } else {
        println!("{out}");
    }
}

fn main() {
    let cli = Cli::parse();
    LogConfig::from_verbosity(cli.verbose).install();

    match run(cli) {
        Ok(Some(out)) => emit(&out),
        Ok(None) => {}
        Err(e) => {
            if let Some(out) = e.output() {
                emit(out);
            }
            let code = e.exit_code();
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {:#}", anyhow::Error::from(e));
            std::process::exit(code);
        }
    }
}
