use crate::config::types::ConnectionOverrides;
use crate::formatter::OutputFormat;
use crate::guard::GuardKind;
use crate::platform::api::RefreshMode;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cd-guard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Post-sync guards for Argo CD applications")]
#[command(
    long_about = "Checks an Argo CD application after sync. The hpa guard keeps workloads scaled by a \
HorizontalPodAutoscaler free of spec.replicas and repairs stale last-applied annotations; the \
ingress guard makes sure every IP-mode ALB ingress is covered by a pod readiness gate."
)]
#[command(after_help = "Examples:
  cd-guard hpa my-app
  cd-guard ingress my-app --dryRun
  cd-guard all my-app --timeout 60")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Argo CD server address
    #[arg(long, global = true, env = "ARGOCD_SERVER", value_name = "ADDRESS")]
    pub server: Option<String>,

    /// Authentication token
    #[arg(long, global = true, env = "ARGOCD_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Path to Argo CD config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to guard settings (default: ./.cd-guard.toml, then ~/.cd-guard.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub guard_config: Option<PathBuf>,

    /// Skip server certificate and domain verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Disable TLS
    #[arg(long, global = true)]
    pub plaintext: bool,

    /// Server certificate file
    #[arg(long, global = true, value_name = "FILE")]
    pub server_crt: Option<PathBuf>,

    /// Refresh requested before reading resources (none, normal, hard)
    #[arg(long, global = true, value_name = "MODE")]
    pub refresh: Option<RefreshMode>,

    /// Set the logging level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Report format
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Accepted for argocd compatibility; requests always use the REST gateway
    #[arg(long, global = true, hide = true)]
    pub grpc_web: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check HPA and specs of objects referenced by HPA
    Hpa(GuardArgs),

    /// Check pod readiness gates of IP-mode ALB ingresses
    Ingress(GuardArgs),

    /// Execute all guards
    All(GuardArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GuardArgs {
    /// Application name
    #[arg(value_name = "APP")]
    pub app: String,

    /// Verify only, don't make any changes
    #[arg(long = "dryRun")]
    pub dry_run: bool,

    /// Time out each API request after this many seconds (0 = never)
    #[arg(long, default_value_t = 0, value_name = "SECONDS")]
    pub timeout: u64,
}

impl Commands {
    pub fn args(&self) -> &GuardArgs {
        match self {
            Commands::Hpa(args) | Commands::Ingress(args) | Commands::All(args) => args,
        }
    }

    /// The single guard this command runs; `None` for `all`
    pub fn guard(&self) -> Option<GuardKind> {
        match self {
            Commands::Hpa(_) => Some(GuardKind::Hpa),
            Commands::Ingress(_) => Some(GuardKind::Ingress),
            Commands::All(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Cli {
    /// Initialize logging from `--loglevel`, raised by `-v`
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => match self.loglevel {
                LogLevel::Debug => log::LevelFilter::Debug,
                LogLevel::Info => log::LevelFilter::Info,
                LogLevel::Warn => log::LevelFilter::Warn,
                LogLevel::Error => log::LevelFilter::Error,
            },
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    /// Connection values given on the command line or through the environment
    pub fn connection_overrides(&self, timeout_secs: u64) -> ConnectionOverrides {
        ConnectionOverrides {
            server: self.server.clone(),
            auth_token: self.auth_token.clone(),
            insecure: self.insecure,
            plaintext: self.plaintext,
            server_cert: self.server_crt.clone(),
            timeout_secs,
        }
    }
}

/// Positional tokens a guard command needs: the subcommand and the app name
const POSITIONALS: usize = 2;

/// Command line with the flags the parser does not know taken out
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StrippedArgs {
    pub args: Vec<String>,
    /// Each dropped flag, joined with the value it took if any
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Separator,
    Known { takes_next: bool },
    Unknown { may_take_next: bool },
    Positional,
}

/// Long and short flags the parser accepts, and whether long ones take a value
struct KnownFlags {
    long: HashMap<String, bool>,
    short: HashSet<char>,
}

impl KnownFlags {
    fn from_cli() -> Self {
        let mut command = Cli::command();
        command.build();

        let mut known = KnownFlags {
            long: HashMap::from([("help".to_string(), false), ("version".to_string(), false)]),
            short: HashSet::from(['h', 'V']),
        };
        known.collect(&command);
        known
    }

    fn collect(&mut self, command: &clap::Command) {
        for arg in command.get_arguments() {
            let takes_value = arg.get_action().takes_values();
            if let Some(long) = arg.get_long() {
                self.long.insert(long.to_string(), takes_value);
            }
            if let Some(short) = arg.get_short() {
                self.short.insert(short);
            }
        }
        for subcommand in command.get_subcommands() {
            self.collect(subcommand);
        }
    }

    fn classify(&self, arg: &str) -> Token {
        if arg == "--" {
            return Token::Separator;
        }

        if let Some(flag) = arg.strip_prefix("--") {
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, _)) => (name, true),
                None => (flag, false),
            };
            return match self.long.get(name) {
                Some(&takes_value) => Token::Known {
                    takes_next: takes_value && !inline_value,
                },
                None => Token::Unknown {
                    may_take_next: !inline_value,
                },
            };
        }

        if let Some(shorts) = arg.strip_prefix('-').filter(|s| !s.is_empty()) {
            if shorts.chars().all(|c| self.short.contains(&c)) {
                return Token::Known { takes_next: false };
            }
            // only a lone `-x` can have its value in the next token
            return Token::Unknown {
                may_take_next: shorts.chars().count() == 1,
            };
        }

        Token::Positional
    }
}

/// Number of positional tokens at each index or later, the last entry being 0
fn positionals_from(tokens: &[Token]) -> Vec<usize> {
    let mut positional = vec![false; tokens.len()];
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            Token::Separator => {
                positional[i + 1..].fill(true);
                break;
            }
            Token::Known { takes_next: true } => i += 1,
            Token::Positional => positional[i] = true,
            _ => {}
        }
        i += 1;
    }

    let mut counts = vec![0; tokens.len() + 1];
    for i in (0..tokens.len()).rev() {
        counts[i] = counts[i + 1] + usize::from(positional[i]);
    }
    counts
}

/// Drop flags the parser does not know so they are tolerated rather than
/// rejected
///
/// An unknown `--flag` or `-f` without an inline value also drops the next
/// token when it is not a flag, unless the command would then run short of
/// its subcommand and app name.
pub fn strip_unknown_flags<I>(args: I) -> StrippedArgs
where
    I: IntoIterator<Item = String>,
{
    let known = KnownFlags::from_cli();
    let mut args = args.into_iter();
    let mut stripped = StrippedArgs::default();
    stripped.args.extend(args.next());

    let rest: Vec<String> = args.collect();
    let tokens: Vec<Token> = rest.iter().map(|arg| known.classify(arg)).collect();
    let remaining = positionals_from(&tokens);

    let mut seen = 0;
    let mut i = 0;
    while i < rest.len() {
        match tokens[i] {
            Token::Separator => {
                stripped.args.extend_from_slice(&rest[i..]);
                break;
            }
            Token::Known { takes_next } => {
                let end = if takes_next { (i + 2).min(rest.len()) } else { i + 1 };
                stripped.args.extend_from_slice(&rest[i..end]);
                i = end;
            }
            Token::Unknown { may_take_next } => {
                let spare_value = may_take_next
                    && matches!(tokens.get(i + 1), Some(Token::Positional))
                    && seen + remaining[i + 1] > POSITIONALS;
                if spare_value {
                    stripped.ignored.push(format!("{} {}", rest[i], rest[i + 1]));
                    i += 2;
                } else {
                    stripped.ignored.push(rest[i].clone());
                    i += 1;
                }
            }
            Token::Positional => {
                seen += 1;
                stripped.args.push(rest[i].clone());
                i += 1;
            }
        }
    }

    stripped
}
