use std::io::{self, Write};

use clap_complete::{Shell, generate};

use crate::cli;

/// Writer that treats a closed pipe (`simulator completion | head`) as
/// success.
struct BrokenPipeIgnorer<W: Write> {
    inner: W,
}

impl<W: Write> Write for BrokenPipeIgnorer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(buf.len()),
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flush() {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }
}

pub fn run(shell: Shell) -> Result<u8, Box<dyn std::error::Error>> {
    let stdout = io::stdout().lock();
    write_script(shell, stdout)?;
    Ok(0)
}

/// Write the completion script for the whole command tree.
fn write_script<W: Write>(shell: Shell, out: W) -> io::Result<()> {
    let mut script = Vec::new();
    let mut command = cli::command();
    generate(shell, &mut command, cli::BIN_NAME, &mut script);

    let mut out = BrokenPipeIgnorer { inner: out };
    out.write_all(&script)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        write_script(shell, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn bash_script_covers_subcommands() {
        let script = script(Shell::Bash);
        assert!(script.contains("_simulator"));
        for name in ["config", "infra", "scenario", "ssh", "version", "completion"] {
            assert!(script.contains(name), "missing {name} in bash script");
        }
        assert!(script.contains("--tf-dir"));
    }

    #[test]
    fn zsh_script_is_generated() {
        assert!(script(Shell::Zsh).contains("#compdef simulator"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn broken_pipe_is_not_an_error() {
        assert!(write_script(Shell::Bash, ClosedPipe).is_ok());
    }
}
