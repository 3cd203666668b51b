use std::io::Write;

use serde_json::Value;

use crate::error::CliError;

/// Writes `data` to stdout as one JSON document.
pub fn render(data: &Value, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, data, pretty)?;
    handle.flush()?;
    Ok(())
}

fn write_json<W: Write>(writer: &mut W, data: &Value, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data)?;
    } else {
        serde_json::to_writer(&mut *writer, data)?;
    }
    writeln!(writer)?;
    Ok(())
}
