use serde_json::Value;
use std::io::{self, Write};

/// Pretty-printed JSON, the full envelope unchanged.
pub fn write_json(value: &Value, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
