use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

pub const COPIED_MESSAGE: &str = "Response successfully copied to the clipboard.";

/// Set in the environment of the detached process that owns the selection.
#[cfg(target_os = "linux")]
pub const CLIPBOARD_SERVER_ENV: &str = "YTSUM_CLIPBOARD_SERVER";

const READY_LINE: &str = "ready";

/// Destination for `--copy`.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// X11 and Wayland only serve a selection while its owner is alive, so on
/// Linux the text is handed to a detached copy of this binary that keeps
/// serving it until another application takes the selection over.
#[cfg(target_os = "linux")]
pub struct SystemClipboard;

#[cfg(target_os = "linux")]
impl SystemClipboard {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(target_os = "linux")]
impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        use std::{
            io::BufReader,
            os::unix::process::CommandExt,
            process::{Command, Stdio},
        };

        let exe = std::env::current_exe().context("Failed to locate the ytsum binary")?;
        let mut child = Command::new(exe)
            .env(CLIPBOARD_SERVER_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .context("Failed to start the clipboard owner")?;

        let mut stdin = child
            .stdin
            .take()
            .context("Clipboard owner has no stdin")?;
        stdin.write_all(text.as_bytes())?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .context("Clipboard owner has no stdout")?;
        if let Err(e) = await_ready(BufReader::new(stdout)) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
        Ok(())
    }
}

/// Entry point of the detached owner: take the text from stdin, own the
/// selection, report readiness, then block until the selection is replaced.
#[cfg(target_os = "linux")]
pub fn serve_clipboard() -> Result<()> {
    use std::io::Read;

    use arboard::SetExtLinux;

    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;

    let mut clipboard =
        arboard::Clipboard::new().context("Failed to access the system clipboard")?;
    clipboard
        .set_text(text.clone())
        .context("Failed to copy to the clipboard")?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", READY_LINE)?;
    stdout.flush()?;
    drop(stdout);

    clipboard.set().wait().text(text)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(not(target_os = "linux"))]
impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("Failed to access the system clipboard")?;
        Ok(Self { inner })
    }
}

#[cfg(not(target_os = "linux"))]
impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_string())
            .context("Failed to copy to the clipboard")
    }
}

/// Wait for the clipboard owner to confirm it holds the selection.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn await_ready(mut reader: impl BufRead) -> Result<()> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim_end() != READY_LINE {
        bail!("Failed to copy to the clipboard: no display available");
    }
    Ok(())
}

/// Print the summary, then copy exactly that text when a clipboard is given.
pub fn emit(
    summary: &str,
    clipboard: Option<&mut dyn Clipboard>,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "{}", summary)?;
    out.flush()?;

    // Confirm only once the clipboard reports success
    if let Some(clipboard) = clipboard {
        clipboard.set_text(summary)?;
        writeln!(out, "{}", COPIED_MESSAGE)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClipboard;

    impl Clipboard for FailingClipboard {
        fn set_text(&mut self, _text: &str) -> Result<()> {
            bail!("no display")
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        text: Option<String>,
    }

    impl Clipboard for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<()> {
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    const SUMMARY: &str = "# Title\n\n## Section\n- point";

    #[test]
    fn prints_summary_only_without_copy() {
        let mut out = Vec::new();
        emit(SUMMARY, None, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{SUMMARY}\n"));
    }

    #[test]
    fn copied_text_equals_printed_text() {
        let mut out = Vec::new();
        let mut clipboard = RecordingClipboard::default();

        emit(SUMMARY, Some(&mut clipboard as &mut dyn Clipboard), &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        let (summary, confirmation) = printed.rsplit_once(COPIED_MESSAGE).map_or(
            (printed.as_str(), ""),
            |(head, tail)| (head.strip_suffix('\n').unwrap_or(head), tail),
        );
        assert_eq!(clipboard.text.as_deref(), Some(summary));
        assert_eq!(confirmation, "\n");
    }

    #[test]
    fn failed_copy_prints_summary_without_confirmation() {
        let mut out = Vec::new();

        let result = emit(SUMMARY, Some(&mut FailingClipboard as &mut dyn Clipboard), &mut out);

        assert!(result.is_err());
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, format!("{SUMMARY}\n"));
        assert!(!printed.contains(COPIED_MESSAGE));
    }

    #[test]
    fn owner_must_report_ready() {
        assert!(await_ready("ready\n".as_bytes()).is_ok());
        assert!(await_ready("".as_bytes()).is_err());
        assert!(await_ready("Error: cannot open display\n".as_bytes()).is_err());
    }
}
