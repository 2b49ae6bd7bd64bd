use std::io::{self, Write};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run(short: bool) -> Result<u8, Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    write_version(short, &mut stdout)?;
    Ok(0)
}

fn write_version<W: Write>(short: bool, out: &mut W) -> io::Result<()> {
    if short {
        writeln!(out, "{VERSION}")
    } else {
        writeln!(out, "simulator {VERSION}")
    }
}
