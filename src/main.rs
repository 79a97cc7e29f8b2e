mod checks;
mod commands;
mod core;
mod hooks;
mod inventory;
mod ledger;
mod release;
mod ui;
mod version;

use clap::{ArgAction, Args, Parser, Subcommand};
use core::context::{GlobalOverrides, RepoContext};
use core::error::{KaeterError, KaeterResult, print_error};
use core::process::SystemRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use ui::TracingReporter;
use version::{BumpKind, VersioningScheme};

/// Version ledgers and commit-embedded release plans for monorepo modules
#[derive(Parser)]
#[command(name = "kaeter")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  #[command(flatten)]
  global: GlobalArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
  /// More log output (-v info, -vv debug); KAETER_LOG takes precedence
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,
  /// Directory searched for modules (default: repository root)
  #[arg(short, long, global = true)]
  path: Option<PathBuf>,
  /// Branch release commits must be reachable from (default: master)
  #[arg(long, global = true)]
  git_main_branch: Option<String>,
  /// Build tool invoked for each release step (default: make)
  #[arg(long, global = true)]
  build_tool: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Setup & Inspection
  // ============================================================================
  /// Create the versions file, README and CHANGELOG of a new module
  Init {
    /// Module id, conventionally group:name
    #[arg(long)]
    id: String,
    /// Module directory
    #[arg(default_value = ".")]
    dir: PathBuf,
    /// Build system of the module
    #[arg(long = "type", default_value = "Makefile")]
    module_type: String,
    /// SemVer, CalVer or AnyStringVer
    #[arg(long, default_value = "SemVer")]
    versioning: VersioningScheme,
  },

  /// Check that modules have a valid ledger, README and CHANGELOG
  Lint {
    /// Module id or path (default: every discovered module)
    #[arg(short, long)]
    module: Option<String>,
    /// Treat warnings as failures
    #[arg(long)]
    strict: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the versions recorded for a module
  Info {
    /// Module id or path
    module: String,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// List every module found under the search path as JSON
  Inventorize,

  /// Show one inventory entry as JSON
  Module {
    /// Module id
    id: String,
  },

  /// Print the release plan embedded in a commit
  ReadPlan {
    /// Commit to read (default: HEAD)
    #[arg(long)]
    commit: Option<String>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Releases
  // ============================================================================
  /// Add versions to module ledgers and commit them with a release plan
  Prepare {
    #[command(flatten)]
    request: ReleaseArgs,
    /// Update the ledgers but leave committing to you
    #[arg(long)]
    no_commit: bool,
  },

  /// Add a version that CI releases once the change reaches trunk
  Autorelease {
    #[command(flatten)]
    request: ReleaseArgs,
  },

  /// Build, test and release the modules of the plan in HEAD
  Release {
    #[command(flatten)]
    run: RunArgs,
  },

  /// Commands meant for CI pipelines
  #[command(subcommand)]
  Ci(CiCommands),
}

#[derive(Subcommand)]
enum CiCommands {
  /// Plan the pending autoreleases whose ledger changed in a commit
  Autoreleaseplan {
    /// Commit to inspect (default: HEAD)
    #[arg(long)]
    commit: Option<String>,
    /// Write the plan to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Execute a plan from a commit or a plan file
  Release {
    /// Commit carrying the plan; AUTORELEASE modules are built from it (default: HEAD)
    #[arg(long)]
    plan_commit: Option<String>,
    /// Read the plan from a file instead of the commit message
    #[arg(long)]
    plan_file: Option<PathBuf>,
    #[command(flatten)]
    run: RunArgs,
  },
}

#[derive(Args)]
struct ReleaseArgs {
  /// Module id or path, repeat for several modules
  #[arg(short, long = "module", required = true)]
  modules: Vec<String>,
  #[command(flatten)]
  bump: BumpArgs,
  /// Explicit version (required for AnyStringVer modules)
  #[arg(long = "version", value_name = "VERSION")]
  release_version: Option<String>,
  /// Tag attached to the new versions, repeatable
  #[arg(long = "tag")]
  tags: Vec<String>,
}

#[derive(Args)]
#[group(required = false, multiple = false)]
struct BumpArgs {
  /// Bump the major version
  #[arg(long)]
  major: bool,
  /// Bump the minor version
  #[arg(long)]
  minor: bool,
  /// Bump the patch version (default)
  #[arg(long)]
  patch: bool,
}

impl BumpArgs {
  fn kind(&self) -> BumpKind {
    if self.major {
      BumpKind::Major
    } else if self.minor {
      BumpKind::Minor
    } else {
      BumpKind::Patch
    }
  }
}

impl ReleaseArgs {
  fn into_request(self) -> commands::ReleaseRequest {
    commands::ReleaseRequest {
      modules: self.modules,
      bump: self.bump.kind(),
      version: self.release_version,
      tags: self.tags,
    }
  }
}

#[derive(Args)]
struct RunArgs {
  /// Build and test only, never run the release step
  #[arg(long)]
  dry_run: bool,
  /// Build in the current working tree instead of checking out the release commit
  #[arg(long)]
  skip_checkout: bool,
  /// Module id to leave out, repeatable
  #[arg(long = "skip-module")]
  skip_modules: Vec<String>,
}

impl From<RunArgs> for commands::RunOptions {
  fn from(args: RunArgs) -> Self {
    Self {
      dry_run: args.dry_run,
      skip_checkout: args.skip_checkout,
      skip_modules: args.skip_modules,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Log to stderr; stdout is reserved for command output
fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_env("KAETER_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr),
    )
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.global.verbose);

  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn run(cli: Cli) -> KaeterResult<()> {
  // init only writes files and works outside a repository
  let command = match cli.command {
    Commands::Init {
      id,
      dir,
      module_type,
      versioning,
    } => return commands::run_init(&dir, &id, &module_type, versioning),
    other => other,
  };

  let cwd = std::env::current_dir()?;
  let overrides = GlobalOverrides {
    path: cli.global.path,
    trunk: cli.global.git_main_branch,
    build_tool: cli.global.build_tool,
  };
  let ctx = RepoContext::build(&cwd, &overrides, Arc::new(SystemRunner), Arc::new(TracingReporter))?;

  match command {
    Commands::Init { .. } => Err(KaeterError::message("init is handled before the repository is opened")),

    // Setup & Inspection
    Commands::Lint { module, strict, json } => commands::run_lint(&ctx, module.as_deref(), json, strict),
    Commands::Info { module, json } => commands::run_info(&ctx, &module, json),
    Commands::Inventorize => commands::run_inventorize(&ctx),
    Commands::Module { id } => commands::run_module(&ctx, &id),
    Commands::ReadPlan { commit, json } => commands::run_read_plan(&ctx, commit.as_deref(), json),

    // Releases
    Commands::Prepare { request, no_commit } => commands::run_prepare(&ctx, &request.into_request(), no_commit),
    Commands::Autorelease { request } => commands::run_autorelease(&ctx, &request.into_request()),
    Commands::Release { run } => commands::run_release(&ctx, &run.into()),
    Commands::Ci(ci_cmd) => match ci_cmd {
      CiCommands::Autoreleaseplan { commit, output } => {
        commands::run_autorelease_plan(&ctx, commit.as_deref(), output.as_deref())
      }
      CiCommands::Release {
        plan_commit,
        plan_file,
        run,
      } => commands::run_ci_release(&ctx, plan_commit.as_deref(), plan_file.as_deref(), &run.into()),
    },
  }
}

fn handle_error(err: KaeterError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
