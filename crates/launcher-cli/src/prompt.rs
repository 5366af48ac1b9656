//! Interactive update confirmation.

use std::io::{self, BufRead, IsTerminal, Write};

use launcher_core::ReleaseDescriptor;

/// Whether an answer to a y/N question means yes. Anything else is no.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks on stderr whether to install `release`.
///
/// Without a terminal on stdin nobody can answer, so the update is declined.
pub fn confirm_update(release: &ReleaseDescriptor, running: &str) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        tracing::info!(
            "Update {} available but stdin is not a terminal, skipping",
            release.tag
        );
        return false;
    }

    match ask_install(&mut stdin.lock(), &mut io::stderr(), &release.tag, running) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!("Could not ask about update {}: {e}", release.tag);
            false
        }
    }
}

/// Writes the install question to `output` and reads one answer line from
/// `input`.
pub fn ask_install(
    input: &mut impl BufRead,
    output: &mut impl Write,
    tag: &str,
    running: &str,
) -> io::Result<bool> {
    write!(
        output,
        "Update {tag} is available (installed: {running}). Install now? [y/N] "
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_ask_install_reads_one_answer() {
        let mut input = io::Cursor::new(b"yes\nno\n".to_vec());
        let mut output = Vec::new();
        assert!(ask_install(&mut input, &mut output, "v2.0.0", "v1.0.0").unwrap());

        let question = String::from_utf8(output).unwrap();
        assert!(question.contains("Update v2.0.0 is available (installed: v1.0.0)"));
        assert!(question.ends_with("[y/N] "));
    }

    #[test]
    fn test_ask_install_reports_write_errors() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "stderr closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut input = io::Cursor::new(b"y\n".to_vec());
        let error = ask_install(&mut input, &mut Closed, "v2.0.0", "v1.0.0").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }
}
