use std::io::{self, Write};

/// One read attempt from the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// The line exceeded the configured limit and was discarded whole;
    /// the length is reported back, nothing is truncated.
    TooLong(usize),
    /// End of input (Ctrl-D).
    Eof,
}

pub struct ShellPrompt {
    prompt: String,
    max_line_len: usize,
}

impl ShellPrompt {
    pub fn new(prompt: &str, max_line_len: usize) -> Self {
        ShellPrompt {
            prompt: prompt.to_string(),
            max_line_len,
        }
    }

    pub fn read_line(&self) -> io::Result<ReadLine> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", self.prompt)?;
        stdout.flush()?;

        let mut buf = String::new();
        let bytes_read = io::stdin().read_line(&mut buf)?;
        if bytes_read == 0 {
            // EOF (e.g., Ctrl-D)
            println!();
            return Ok(ReadLine::Eof);
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.len() > self.max_line_len {
            return Ok(ReadLine::TooLong(line.len()));
        }
        Ok(ReadLine::Line(line.to_string()))
    }
}
