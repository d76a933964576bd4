//! Semicolon separated tabular files.
use crate::io::{exists_on_io_process, file_path, save_on_io_process};
use crate::parallel::Communicator;
use eyre::{eyre, WrapErr};
use std::fmt::{Display, Write};
use std::path::Path;

const DELIMITER: char = ';';
const QUOTE: char = '"';

/// Reads and writes `<name>.csv` files as lists of rows.
#[derive(Debug, Copy, Clone, Default)]
pub struct CsvIo;

impl CsvIo {
    /// Writes `content` on the I/O process, one row per line.
    pub fn save_file<R, C>(
        comm: &dyn Communicator,
        content: &[R],
        directory: impl AsRef<Path>,
        name: &str,
    ) -> eyre::Result<()>
    where
        R: AsRef<[C]>,
        C: Display,
    {
        let path = file_path(directory, name, "csv");
        save_on_io_process(comm, || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("failed to create directory {}", parent.display()))?;
            }
            std::fs::write(&path, format_rows(content))
                .wrap_err_with(|| format!("failed to write file {}", path.display()))
        })
    }

    /// Reads the rows of a file. Every process reads the file on its own.
    pub fn load_file(directory: impl AsRef<Path>, name: &str) -> eyre::Result<Vec<Vec<String>>> {
        let path = file_path(directory, name, "csv");
        let content =
            std::fs::read_to_string(&path).wrap_err_with(|| format!("failed to read file {}", path.display()))?;
        parse_rows(&content).wrap_err_with(|| format!("failed to parse file {}", path.display()))
    }

    pub fn exists_file(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<bool> {
        exists_on_io_process(comm, &file_path(directory, name, "csv"))
    }
}

fn format_field(field: &str, output: &mut String) {
    let needs_quotes = field.contains([DELIMITER, QUOTE, '\n', '\r']);
    if needs_quotes {
        output.push(QUOTE);
        for c in field.chars() {
            if c == QUOTE {
                output.push(QUOTE);
            }
            output.push(c);
        }
        output.push(QUOTE);
    } else {
        output.push_str(field);
    }
}

fn format_rows<R, C>(rows: &[R]) -> String
where
    R: AsRef<[C]>,
    C: Display,
{
    let mut output = String::new();
    let mut field = String::new();
    for row in rows {
        for (i, value) in row.as_ref().iter().enumerate() {
            if i > 0 {
                output.push(DELIMITER);
            }
            field.clear();
            write!(field, "{value}").expect("Writing to a String cannot fail");
            format_field(&field, &mut output);
        }
        output.push_str("\r\n");
    }
    output
}

fn parse_rows(content: &str) -> eyre::Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                QUOTE if chars.peek() == Some(&QUOTE) => {
                    chars.next();
                    field.push(QUOTE);
                }
                QUOTE => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                QUOTE => in_quotes = true,
                DELIMITER => row.push(std::mem::take(&mut field)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' | '\r' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }

    if in_quotes {
        return Err(eyre!("unterminated quoted field"));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}
