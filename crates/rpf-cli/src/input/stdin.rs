use std::io::{self, Read};

/// Text piped on stdin, or `None` when stdin is a terminal or blank.
pub fn read_piped() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    tracing::debug!(bytes = buffer.len(), "input read from stdin");
    Ok(non_blank(buffer))
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pipe_means_no_document() {
        assert_eq!(non_blank(" \n\t".into()), None);
        assert_eq!(non_blank("{}\n".into()).as_deref(), Some("{}\n"));
    }
}
