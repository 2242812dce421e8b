use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use clap::{ArgAction, Args, Parser};

pub const DEFAULT_CONF_PATH: &str = "../conf/config.toml";

const CONF_PATH_FLAG: &str = "--confpath";
const PRINT_CONF_FLAG: &str = "--printconf";

/// The two process options the loader reads
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Config file path. MUST use --confpath style
    #[arg(long = "confpath", value_name = "PATH", default_value = DEFAULT_CONF_PATH)]
    pub conf_path: PathBuf,

    /// Print the config file path and resolved config. MUST use --printconf style
    #[arg(
        long = "printconf",
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub print_conf: bool,
}

#[derive(Parser)]
#[command(no_binary_name = true)]
struct Bootstrap {
    #[command(flatten)]
    args: ConfigArgs,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            conf_path: PathBuf::from(DEFAULT_CONF_PATH),
            print_conf: true,
        }
    }
}

impl ConfigArgs {
    /// Read the options from the current process arguments.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_args(std::env::args_os().skip(1))
    }

    /// Read the options from `args` (program name excluded), ignoring
    /// everything else a host process may define.
    ///
    /// Each option is parsed on its own; a malformed one falls back to its
    /// default without discarding the other.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let own = retain_own_args(args.into_iter().map(Into::into));
        let mut parsed = Self::default();
        if let Some(args) = parse_option(&own.conf_path) {
            parsed.conf_path = args.conf_path;
        }
        if let Some(args) = parse_option(&own.print_conf) {
            parsed.print_conf = args.print_conf;
        }
        parsed
    }
}

fn parse_option(tokens: &[OsString]) -> Option<ConfigArgs> {
    match Bootstrap::try_parse_from(tokens) {
        Ok(parsed) => Some(parsed.args),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed config option");
            None
        }
    }
}

/// `1`, `t`, `true` or `0`, `f`, `false`, in lower, upper or title case.
fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("invalid boolean \"{s}\"")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    ConfPath,
    PrintConf,
}

impl Flag {
    const ALL: [Self; 2] = [Self::ConfPath, Self::PrintConf];

    const fn name(self) -> &'static str {
        match self {
            Self::ConfPath => CONF_PATH_FLAG,
            Self::PrintConf => PRINT_CONF_FLAG,
        }
    }
}

/// The option `arg` names, and whether it carries an inline `=value`.
/// Matching works on raw bytes so non-UTF-8 arguments are never decoded.
fn match_flag(arg: &OsStr) -> Option<(Flag, bool)> {
    let bytes = arg.as_encoded_bytes();
    Flag::ALL.into_iter().find_map(|flag| {
        let rest = bytes.strip_prefix(flag.name().as_bytes())?;
        match rest.first() {
            None => Some((flag, false)),
            Some(b'=') => Some((flag, true)),
            Some(_) => None,
        }
    })
}

/// Last occurrence of each option with its value, as separate token lists.
#[derive(Debug, Default)]
struct OwnArgs {
    conf_path: Vec<OsString>,
    print_conf: Vec<OsString>,
}

fn retain_own_args(args: impl Iterator<Item = OsString>) -> OwnArgs {
    let mut own = OwnArgs::default();
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        let Some((flag, inline)) = match_flag(&arg) else {
            continue;
        };
        let mut tokens = vec![arg];
        if !inline {
            match flag {
                Flag::ConfPath => tokens.extend(args.next()),
                Flag::PrintConf => tokens.extend(args.next_if(|v| {
                    v.to_str().is_some_and(|v| parse_bool(v).is_ok())
                })),
            }
        }
        match flag {
            Flag::ConfPath => own.conf_path = tokens,
            Flag::PrintConf => own.print_conf = tokens,
        }
    }
    own
}

/// Once-only guard shared by every clone of a context
#[derive(Debug, Default)]
pub struct PrintGate {
    fired: AtomicBool,
}

impl PrintGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Run `f` if this is the first call on the gate. Returns whether it ran.
    pub fn run_once(&self, f: impl FnOnce()) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            f();
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Which source wins when a field is preset in code and also present in the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precedence {
    /// file > code preset > default
    #[default]
    FileWins,
    /// code preset > file > default
    PresetWins,
}

type Output = Arc<Mutex<dyn Write + Send>>;

/// Loader settings for one process: file path, print toggle and precedence
///
/// Clones share the path print gate and the output sink.
#[derive(Clone)]
pub struct ConfigContext {
    conf_path: PathBuf,
    print_conf: bool,
    precedence: Precedence,
    gate: Arc<PrintGate>,
    out: Output,
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("conf_path", &self.conf_path)
            .field("print_conf", &self.print_conf)
            .field("precedence", &self.precedence)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self::from_args(ConfigArgs::default())
    }
}

static GLOBAL: OnceLock<ConfigContext> = OnceLock::new();

impl ConfigContext {
    #[must_use]
    pub fn new(conf_path: impl Into<PathBuf>) -> Self {
        Self::from_args(ConfigArgs {
            conf_path: conf_path.into(),
            ..ConfigArgs::default()
        })
    }

    #[must_use]
    pub fn from_args(args: ConfigArgs) -> Self {
        Self {
            conf_path: args.conf_path,
            print_conf: args.print_conf,
            precedence: Precedence::default(),
            gate: Arc::new(PrintGate::new()),
            out: Arc::new(Mutex::new(std::io::stdout())),
        }
    }

    /// Process-wide context, built from the process arguments on first use.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            let args = ConfigArgs::from_env();
            tracing::debug!(
                conf_path = %args.conf_path.display(),
                print_conf = args.print_conf,
                "config context initialised"
            );
            Self::from_args(args)
        })
    }

    #[must_use]
    pub fn with_print_conf(mut self, print_conf: bool) -> Self {
        self.print_conf = print_conf;
        self
    }

    #[must_use]
    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Send diagnostics to `writer` instead of stdout.
    #[must_use]
    pub fn with_output<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.out = Arc::new(Mutex::new(writer));
        self
    }

    #[must_use]
    pub fn conf_path(&self) -> &Path {
        &self.conf_path
    }

    #[must_use]
    pub const fn print_conf(&self) -> bool {
        self.print_conf
    }

    #[must_use]
    pub const fn precedence(&self) -> Precedence {
        self.precedence
    }

    #[must_use]
    pub fn gate(&self) -> &PrintGate {
        &self.gate
    }

    pub(crate) fn emit(&self, text: &str) {
        let Ok(mut out) = self.out.lock() else {
            tracing::warn!("config output sink poisoned, dropping diagnostics");
            return;
        };
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "failed to print config diagnostics");
        }
    }
}
