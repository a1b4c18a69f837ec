#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, BufReader, Read as _},
    path::PathBuf,
    time::Duration,
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use marknote_core::{
    AutosavePolicy, Disk, Session, SessionOptions, SettingsStore, Storage as _, markdown,
};

mod logging;
mod script;
mod settings_cmd;

#[derive(Debug, Parser)]
#[command(name = "marknote", about = "Browse, preview and edit markdown notes", version)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file to use instead of the one in the home directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a markdown file and print it to stdout.
    Preview {
        /// Path to a markdown file. Use `-` to read from stdin.
        path: PathBuf,

        /// Print HTML instead of plain text.
        #[arg(long)]
        html: bool,
    },
    /// List a folder the way the sidebar shows it.
    Ls {
        folder: PathBuf,
    },
    /// Show or change editor settings.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Run an editing session over a folder, reading commands from a script.
    ///
    /// Commands, one per line: open PATH, edit TEXT, append TEXT, save,
    /// save-all, wait MS, autosave on|off, status, ls, preview, sidebar,
    /// close. `\n` in TEXT is a newline.
    Session {
        folder: PathBuf,

        /// Script to run. Reads stdin when omitted.
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// How autosave timers are shared between open documents.
        #[arg(long, value_enum, default_value_t = PolicyArg::PerFile)]
        autosave: PolicyArg,

        /// Quiet period before autosaving, in milliseconds.
        #[arg(long, value_name = "MS", default_value_t = 2000)]
        delay: u64,

        /// Disable autosave regardless of the settings file.
        #[arg(long)]
        no_autosave: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the settings as JSON.
    Show,
    /// Print the settings file location.
    Path,
    /// Set one key, named as in the settings file (e.g. `fontSize 18`).
    Set { key: String, value: String },
    /// Restore the defaults.
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    PerFile,
    Global,
}

impl From<PolicyArg> for AutosavePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::PerFile => Self::PerFile,
            PolicyArg::Global => Self::Global,
        }
    }
}

fn settings_store(path: Option<PathBuf>) -> anyhow::Result<SettingsStore> {
    match path {
        Some(path) => Ok(SettingsStore::new(path)),
        None => SettingsStore::at_default_path().context("could not locate a home directory"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Command::Preview { path, html } => {
            let source = if path.as_os_str() == "-" {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read markdown from stdin")?;
                buf
            } else {
                Disk.read(&path)
                    .with_context(|| format!("failed to read markdown from {}", path.display()))?
            };

            let rendered = if html {
                markdown::to_html(&source)?
            } else {
                markdown::plain_text(&source)
            };
            print!("{rendered}");
        }
        Command::Ls { folder } => {
            let entries = Disk
                .list(&folder)
                .with_context(|| format!("failed to list {}", folder.display()))?;
            for entry in entries {
                let suffix = if entry.is_dir { "/" } else { "" };
                let marker = if entry.is_openable() { ' ' } else { '-' };
                println!("{marker} {}{suffix}", entry.display_name());
            }
        }
        Command::Settings { action } => {
            let store = settings_store(cli.config)?;
            match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => println!("{}", store.load().to_json()),
                SettingsAction::Path => println!("{}", store.path().display()),
                SettingsAction::Set { key, value } => {
                    let updated = settings_cmd::set(&store, &key, &value)?;
                    println!("{}", updated.to_json());
                }
                SettingsAction::Reset => {
                    store.save(&marknote_core::Settings::default())?;
                }
            }
        }
        Command::Session {
            folder,
            script,
            autosave,
            delay,
            no_autosave,
        } => {
            let mut settings = settings_store(cli.config)?.load();
            if no_autosave {
                settings = settings.with_auto_save(false);
            }
            let options = SessionOptions {
                autosave_delay: Duration::from_millis(delay),
                autosave_policy: autosave.into(),
            };

            let mut session = Session::with_options(Disk, settings, options);
            session.open_folder(folder);

            let mut stdout = io::stdout().lock();
            match script {
                Some(path) => {
                    let file = fs::File::open(&path)
                        .with_context(|| format!("failed to open script {}", path.display()))?;
                    script::run(&mut session, BufReader::new(file), &mut stdout)?;
                }
                None => script::run(&mut session, io::stdin().lock(), &mut stdout)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Cli> {
        Cli::try_parse_from(std::iter::once("marknote").chain(args.iter().copied())).ok()
    }

    #[test]
    fn parses_preview_and_ls() {
        let cli = parse(&["preview", "--html", "README.md"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Some(Command::Preview { html: true, ref path }) if path == &PathBuf::from("README.md")
        ));

        let cli = parse(&["-vv", "ls", "notes"]);
        assert_eq!(cli.as_ref().map(|c| c.verbose), Some(2));
        assert!(matches!(cli.map(|c| c.command), Some(Command::Ls { .. })));
    }

    #[test]
    fn session_defaults_to_per_file_autosave() {
        let cli = parse(&["session", "notes"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Some(Command::Session {
                autosave: PolicyArg::PerFile,
                delay: 2000,
                no_autosave: false,
                script: None,
                ..
            })
        ));
        assert_eq!(
            AutosavePolicy::from(PolicyArg::Global),
            AutosavePolicy::Global
        );

        let global = parse(&["session", "notes", "--autosave", "global", "--no-autosave"]);
        assert!(matches!(
            global.map(|c| c.command),
            Some(Command::Session {
                autosave: PolicyArg::Global,
                no_autosave: true,
                ..
            })
        ));
    }

    #[test]
    fn settings_subcommands_parse() {
        assert!(matches!(
            parse(&["settings"]).map(|c| c.command),
            Some(Command::Settings { action: None })
        ));
        assert!(matches!(
            parse(&["--config", "/tmp/s.json", "settings", "set", "theme", "dark"])
                .map(|c| c.command),
            Some(Command::Settings {
                action: Some(SettingsAction::Set { .. })
            })
        ));
        assert!(parse(&["settings", "set", "theme"]).is_none());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }
}
