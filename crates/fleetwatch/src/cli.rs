//! Clap derive structures for the `fleetwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetwatch -- operator console for a Docker agent fleet
#[derive(Debug, Parser)]
#[command(
    name = "fleetwatch",
    version,
    about = "Monitor and manage a fleet of Docker host agents",
    long_about = "Operator console for a fleet monitoring backend.\n\n\
        Lists agents, containers and images, follows liveness and resource\n\
        usage, and queues remote actions (start/stop containers, pull images,\n\
        write files, reload nginx) on individual agents.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "FLEETWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 's', env = "FLEETWATCH_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FLEETWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FLEETWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session for this profile
    Login(LoginArgs),

    /// Forget the persisted session
    Logout,

    /// Show the logged-in operator
    Whoami,

    /// Manage agents (monitored hosts)
    #[command(alias = "a")]
    Agents(AgentsArgs),

    /// Inspect containers across the fleet
    #[command(alias = "c")]
    Containers(ContainersArgs),

    /// Inspect, pull and remove images
    #[command(alias = "img")]
    Images(ImagesArgs),

    /// Submit and follow remote actions
    Actions(ActionsArgs),

    /// Fleet-wide KPIs and top consumers
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// Alert channels and rules
    Notifications(NotificationsArgs),

    /// Reverse-proxy domains and routes
    Domains(DomainsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (defaults to the profile's username, else prompts)
    #[arg(long, short = 'u')]
    pub username: Option<String>,
}

// ── Shared ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Keep refreshing until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Agents ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AgentsArgs {
    #[command(subcommand)]
    pub command: AgentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AgentsCommand {
    /// List agents
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on name or IP
        #[arg(long)]
        search: Option<String>,

        /// Only agents with this status (online, offline, unknown, all)
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Show one agent with metrics and inventory counts
    Get {
        /// Agent UUID or name
        agent: String,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Register a new agent and print its enrollment token
    Create {
        /// Agent name (must be unique)
        name: String,
    },

    /// Rename or (de)activate an agent
    Update {
        /// Agent UUID or name
        agent: String,

        #[arg(long)]
        name: Option<String>,

        /// Enable or disable the agent
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete an agent
    #[command(alias = "rm")]
    Delete {
        /// Agent UUID or name
        agent: String,
    },

    /// Recent system metrics samples
    Metrics {
        /// Agent UUID or name
        agent: String,

        /// Number of samples
        #[arg(long, short = 'l', default_value = "50")]
        limit: u32,
    },

    /// Containers on an agent
    Containers {
        /// Agent UUID or name
        agent: String,
    },

    /// Images on an agent
    Images {
        /// Agent UUID or name
        agent: String,
    },

    /// Docker volumes on an agent
    Volumes {
        /// Agent UUID or name
        agent: String,
    },

    /// Docker networks on an agent
    Networks {
        /// Agent UUID or name
        agent: String,
    },

    /// Nginx server blocks generated for an agent
    NginxConfig {
        /// Agent UUID or name
        agent: String,
    },
}

// ── Containers ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ContainersArgs {
    #[command(subcommand)]
    pub command: ContainersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ContainersCommand {
    /// List containers
    #[command(alias = "ls")]
    List {
        /// Restrict to one agent (UUID or name)
        #[arg(long, short = 'a')]
        agent: Option<String>,

        /// Status filter (running, exited, paused, ...)
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive match on name, id or image
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Show one container with recent usage history
    Get {
        /// Container record UUID
        id: uuid::Uuid,
    },

    /// Recent log lines
    Logs {
        /// Container record UUID
        id: uuid::Uuid,

        /// Only the last N lines
        #[arg(long, short = 'n')]
        tail: Option<usize>,
    },
}

// ── Images ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ImagesArgs {
    #[command(subcommand)]
    pub command: ImagesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ImagesCommand {
    /// List images
    #[command(alias = "ls")]
    List {
        /// Restrict to one agent (UUID or name)
        #[arg(long, short = 'a')]
        agent: Option<String>,

        /// Case-insensitive match on tag or id
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Show one image
    Get {
        /// Image record UUID
        id: uuid::Uuid,
    },

    /// Queue an image pull on an agent
    Pull {
        /// Agent UUID or name
        agent: String,

        /// Image repository (e.g., nginx)
        image: String,

        #[arg(long, short = 't', default_value = "latest")]
        tag: String,
    },

    /// Queue an image removal on an agent
    #[command(alias = "rm")]
    Remove {
        /// Agent UUID or name
        agent: String,

        /// Docker image id or reference
        image_id: String,

        /// Remove even if in use
        #[arg(long)]
        force: bool,
    },
}

// ── Actions ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ActionsArgs {
    #[command(subcommand)]
    pub command: ActionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ActionsCommand {
    /// Action history
    #[command(alias = "ls")]
    List {
        /// Restrict to one agent (UUID or name)
        #[arg(long, short = 'a')]
        agent: Option<String>,

        /// Action type (e.g., start_container)
        #[arg(long = "type", short = 't')]
        action_type: Option<String>,

        /// pending, completed or failed
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Queue an action on an agent
    Submit {
        /// Agent UUID or name
        agent: String,

        /// Action type (see `fleetwatch actions types`)
        action_type: String,

        /// Payload field as key=value (repeatable)
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Wait until the agent reports completion or failure
        #[arg(long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "120", requires = "wait")]
        wait_timeout: u64,
    },

    /// Action types and their fields
    Types,
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub watch: WatchArgs,
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// Show channels and rules
    Show,

    /// Change channels or rules (unspecified values are kept)
    Set(NotificationsSetArgs),

    /// Send a test message through every enabled channel
    Test,
}

#[derive(Debug, Args)]
pub struct NotificationsSetArgs {
    /// Replace the whole settings document from a JSON file
    #[arg(long, short = 'F', conflicts_with_all = [
        "telegram_bot_token", "telegram_chat_id", "email", "agent_offline",
        "container_stopped", "cpu_threshold", "ram_threshold",
    ])]
    pub from_file: Option<PathBuf>,

    #[arg(long)]
    pub telegram_bot_token: Option<String>,

    #[arg(long)]
    pub telegram_chat_id: Option<String>,

    /// Enable or disable email delivery
    #[arg(long)]
    pub email: Option<bool>,

    /// Alert when an agent goes offline
    #[arg(long)]
    pub agent_offline: Option<bool>,

    /// Alert when a container stops
    #[arg(long)]
    pub container_stopped: Option<bool>,

    /// CPU alert threshold in percent (0 disables)
    #[arg(long)]
    pub cpu_threshold: Option<f64>,

    /// RAM alert threshold in percent (0 disables)
    #[arg(long)]
    pub ram_threshold: Option<f64>,
}

// ── Domains ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DomainsArgs {
    #[command(subcommand)]
    pub command: DomainsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DomainsCommand {
    /// List domains
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on name or agent
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one domain with its routes
    Get { id: uuid::Uuid },

    /// Attach a domain to an agent
    Create {
        /// Fully-qualified domain name
        name: String,

        /// Serving agent (UUID or name)
        #[arg(long, short = 'a')]
        agent: String,

        /// Issue a certificate and serve HTTPS
        #[arg(long)]
        ssl: bool,
    },

    /// Change a domain
    Update {
        id: uuid::Uuid,

        #[arg(long)]
        name: Option<String>,

        /// Move to another agent (UUID or name)
        #[arg(long, short = 'a')]
        agent: Option<String>,

        #[arg(long)]
        active: Option<bool>,

        #[arg(long)]
        ssl: Option<bool>,
    },

    /// Delete a domain and its routes
    #[command(alias = "rm")]
    Delete { id: uuid::Uuid },

    /// Live reachability of a domain and each route
    Status { id: uuid::Uuid },

    /// Manage path routes of a domain
    Routes(RoutesArgs),
}

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// Routes of a domain
    #[command(alias = "ls")]
    List { domain: uuid::Uuid },

    /// Route a path to a container port
    Add {
        domain: uuid::Uuid,

        #[arg(long)]
        container: String,

        #[arg(long)]
        port: u16,

        #[arg(long, default_value = "/")]
        path: String,
    },

    /// Change a route
    Update {
        id: uuid::Uuid,

        #[arg(long)]
        container: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a route
    #[command(alias = "rm")]
    Remove { id: uuid::Uuid },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive profile setup
    Init,

    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
