use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context as _, bail};
use marknote_core::{SaveOutcome, SaveReport, Session, Storage};

/// One line of an editing script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Open(PathBuf),
    Edit(String),
    Append(String),
    Save,
    SaveAll,
    Wait(Duration),
    Autosave(bool),
    Status,
    List,
    Preview,
    Sidebar,
    Close,
}

pub(crate) fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim_start();
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = line.split_once(' ').unwrap_or((line.trim_end(), ""));
    let command = match word {
        "open" => {
            let path = rest.trim();
            if path.is_empty() {
                bail!("`open` needs a path");
            }
            Command::Open(PathBuf::from(path))
        }
        "edit" => Command::Edit(unescape(rest)),
        "append" => Command::Append(unescape(rest)),
        "save" => Command::Save,
        "save-all" => Command::SaveAll,
        "wait" => {
            let ms: u64 = rest
                .trim()
                .parse()
                .with_context(|| format!("`wait` needs milliseconds, got {:?}", rest.trim()))?;
            Command::Wait(Duration::from_millis(ms))
        }
        "autosave" => match rest.trim() {
            "on" => Command::Autosave(true),
            "off" => Command::Autosave(false),
            other => bail!("`autosave` takes on or off, got {other:?}"),
        },
        "status" => Command::Status,
        "ls" => Command::List,
        "preview" => Command::Preview,
        "sidebar" => Command::Sidebar,
        "close" => Command::Close,
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(command))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Drive `session` with commands read from `input`.
///
/// Time only moves on `wait`, which also runs any autosaves that fall due.
pub(crate) fn run<S: Storage>(
    session: &mut Session<S>,
    input: impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut now = Instant::now();
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read script")?;
        let Some(command) = parse_line(&line).with_context(|| format!("line {}", idx + 1))? else {
            continue;
        };
        execute(session, command, &mut now, out)?;
    }

    let dirty = session.dirty_paths();
    if !dirty.is_empty() {
        writeln!(out, "warning: {} unsaved document(s)", dirty.len())?;
        for path in dirty {
            writeln!(out, "  {}", path.display())?;
        }
    }
    Ok(())
}

fn resolve<S: Storage>(session: &Session<S>, path: PathBuf) -> PathBuf {
    match session.folder() {
        Some(folder) if path.is_relative() => folder.join(path),
        _ => path,
    }
}

fn execute<S: Storage>(
    session: &mut Session<S>,
    command: Command,
    now: &mut Instant,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Open(path) => {
            let path = resolve(session, path);
            match session.select(&path) {
                Ok(Some(doc)) => writeln!(
                    out,
                    "opened {} ({} bytes)",
                    path.display(),
                    doc.current().len()
                )?,
                Ok(None) => writeln!(out, "ignored {}", path.display())?,
                Err(err) => writeln!(out, "error: {err}")?,
            }
        }
        Command::Edit(text) => {
            if !session.edit(text, *now) {
                writeln!(out, "error: no document is open")?;
            }
        }
        Command::Append(text) => {
            let Some(mut current) = session.active_document().map(|d| d.current().to_owned())
            else {
                writeln!(out, "error: no document is open")?;
                return Ok(());
            };
            current.push_str(&text);
            session.edit(current, *now);
        }
        Command::Save => {
            let path = session.active_path().map(Path::to_path_buf);
            match (session.save_active(), path) {
                (Ok(SaveOutcome::Saved), Some(path)) => writeln!(out, "saved {}", path.display())?,
                (Ok(SaveOutcome::Clean), Some(path)) => {
                    writeln!(out, "unchanged {}", path.display())?;
                }
                (Ok(_), _) => writeln!(out, "error: no document is open")?,
                (Err(err), _) => writeln!(out, "error: {err}")?,
            }
        }
        Command::SaveAll => {
            let reports = session.save_all();
            if reports.is_empty() {
                writeln!(out, "nothing to save")?;
            }
            print_reports(out, "saved", &reports)?;
        }
        Command::Wait(delay) => {
            *now += delay;
            let reports = session.tick(*now);
            print_reports(out, "autosaved", &reports)?;
        }
        Command::Autosave(on) => {
            let settings = session.settings().clone().with_auto_save(on);
            session.set_settings(settings, *now);
            writeln!(out, "autosave {}", if on { "on" } else { "off" })?;
        }
        Command::Status => {
            let folder = session
                .folder()
                .map_or_else(|| "(none)".to_owned(), |f| f.display().to_string());
            writeln!(out, "folder: {folder}")?;
            match session.active_path() {
                Some(path) => writeln!(
                    out,
                    "active: {}{}",
                    path.display(),
                    if session.is_active_dirty() { " *" } else { "" }
                )?,
                None => writeln!(out, "active: (none)")?,
            }
            writeln!(out, "open: {}", session.store().len())?;
            writeln!(out, "unsaved: {}", session.dirty_paths().len())?;
            writeln!(
                out,
                "autosave: {}",
                match (session.settings().auto_save, session.has_pending_autosave()) {
                    (false, _) => "off",
                    (true, true) => "pending",
                    (true, false) => "idle",
                }
            )?;
            if let Some(err) = session.last_error() {
                writeln!(out, "last error: {err}")?;
            }
            session.clear_error();
        }
        Command::List => {
            for entry in session.entries() {
                let marker = if session.is_dirty(&entry.path) { '*' } else { ' ' };
                let suffix = if entry.is_dir { "/" } else { "" };
                writeln!(out, "{marker} {}{suffix}", entry.display_name())?;
            }
        }
        Command::Preview => write!(out, "{}", session.preview_html())?,
        Command::Sidebar => {
            session.toggle_sidebar();
            let state = if session.sidebar_visible() { "shown" } else { "hidden" };
            writeln!(out, "sidebar {state}")?;
        }
        Command::Close => {
            session.close_folder();
            writeln!(out, "closed folder")?;
        }
    }
    Ok(())
}

fn print_reports(out: &mut impl Write, verb: &str, reports: &[SaveReport]) -> anyhow::Result<()> {
    for report in reports {
        match &report.result {
            Ok(_) => writeln!(out, "{verb} {}", report.path.display())?,
            Err(err) => writeln!(out, "error: {err}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use marknote_core::{AutosavePolicy, Disk, SessionOptions, Settings};

    use super::*;

    fn run_script(session: &mut Session<Disk>, script: &str) -> String {
        let mut out = Vec::new();
        let result = run(session, script.as_bytes(), &mut out);
        assert!(result.is_ok(), "{result:?}");
        String::from_utf8(out).unwrap_or_default()
    }

    #[test]
    fn parse_line_reads_commands_and_skips_comments() {
        let cases = [
            ("", None),
            ("   # comment", None),
            ("open notes/a.md", Some(Command::Open(PathBuf::from("notes/a.md")))),
            ("edit a\\nb", Some(Command::Edit("a\nb".to_owned()))),
            ("edit", Some(Command::Edit(String::new()))),
            ("append  tail", Some(Command::Append(" tail".to_owned()))),
            ("wait 2000", Some(Command::Wait(Duration::from_millis(2000)))),
            ("save-all", Some(Command::SaveAll)),
            ("ls", Some(Command::List)),
            ("autosave off", Some(Command::Autosave(false))),
        ];
        for (line, expected) in cases {
            assert_eq!(parse_line(line).ok().flatten(), expected, "{line:?}");
        }

        assert!(parse_line("open").is_err());
        assert!(parse_line("wait soon").is_err());
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("autosave maybe").is_err());
    }

    #[test]
    fn script_edits_and_autosaves_on_disk() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        fs::write(dir.path().join("a.md"), "hello").ok();
        fs::write(dir.path().join("b.txt"), "plain").ok();
        fs::write(dir.path().join("c.rs"), "fn main() {}").ok();

        let mut session = Session::new(Disk, Settings::default());
        session.open_folder(dir.path());
        let out = run_script(
            &mut session,
            "open a.md\nappend  world\nls\nwait 1000\nopen c.rs\nwait 1000\nstatus\n",
        );

        assert!(out.contains("* a.md"), "{out}");
        assert!(out.contains("ignored"), "{out}");
        assert!(out.contains("autosaved"), "{out}");
        assert!(out.contains("unsaved: 0"), "{out}");
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap_or_default(),
            "hello world"
        );
    }

    #[test]
    fn script_without_autosave_warns_about_unsaved_documents() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        fs::write(dir.path().join("a.md"), "a").ok();
        fs::write(dir.path().join("b.md"), "b").ok();

        let mut session = Session::with_options(
            Disk,
            Settings::default().with_auto_save(false),
            SessionOptions {
                autosave_policy: AutosavePolicy::Global,
                ..SessionOptions::default()
            },
        );
        session.open_folder(dir.path());
        let out = run_script(
            &mut session,
            "open a.md\nedit A\nopen b.md\nedit B\nwait 5000\nsave\n",
        );

        assert!(out.contains("saved"), "{out}");
        assert!(out.contains("warning: 1 unsaved document(s)"), "{out}");
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap_or_default(),
            "a"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("b.md")).unwrap_or_default(),
            "B"
        );

        let out = run_script(&mut session, "save-all\nsave-all\n");
        assert!(out.contains("nothing to save"), "{out}");
    }

    #[test]
    fn turning_autosave_back_on_saves_pending_edits() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        fs::write(dir.path().join("a.md"), "a").ok();

        let mut session = Session::new(Disk, Settings::default());
        session.open_folder(dir.path());
        let out = run_script(
            &mut session,
            "autosave off\nopen a.md\nedit changed\nwait 5000\nstatus\nautosave on\nwait 2000\nstatus\n",
        );

        assert!(out.contains("autosave: off"), "{out}");
        assert!(out.contains("autosaved"), "{out}");
        assert!(out.contains("unsaved: 0"), "{out}");
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap_or_default(),
            "changed"
        );
    }

    #[test]
    fn status_reports_and_clears_the_last_error() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };

        let mut session = Session::new(Disk, Settings::default());
        session.open_folder(dir.path());
        let out = run_script(&mut session, "open missing.md\nstatus\nstatus\n");

        assert_eq!(out.matches("last error: Open failed").count(), 1, "{out}");
    }

    #[test]
    fn script_stops_on_unknown_command() {
        let mut session = Session::new(Disk, Settings::default());
        let mut out = Vec::new();
        let result = run(&mut session, "status\nbogus\n".as_bytes(), &mut out);
        assert!(result.is_err());
        assert!(String::from_utf8_lossy(&out).contains("folder: (none)"));
    }
}
