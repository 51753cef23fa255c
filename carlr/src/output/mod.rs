use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

mod table;

pub use table::{TableRow, render_table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
    Quiet,
}

#[derive(Clone, Debug)]
pub struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, path: Option<PathBuf>) -> Self {
        Self { format, path }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }

        let data = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };

        self.write(&data)
    }

    pub fn emit_table<T: TableRow + Serialize + Sized>(&self, items: &[T]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                let data = render_table(items);
                self.write(&data)
            }
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(items),
        }
    }

    /// Table rows in table mode, otherwise `value` as json.
    pub fn emit_table_or_json<T: TableRow, V: Serialize + ?Sized>(
        &self,
        items: &[T],
        value: &V,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.write(&render_table(items)),
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(value),
        }
    }

    pub fn emit_text(&self, text: &str) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }
        self.write(text)
    }

    /// Status message on stderr, so it never mixes with file output.
    pub fn emit_status(&self, text: &str) {
        if self.format != OutputFormat::Quiet {
            eprintln!("{text}");
        }
    }

    /// Raw file content, written to the `-o` file if given, else to `default_path`.
    /// Returns the path written.
    pub fn write_file(&self, default_path: PathBuf, data: &[u8]) -> Result<PathBuf> {
        let path = self.path.clone().unwrap_or(default_path);
        fs::write(&path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    fn write(&self, data: &str) -> Result<()> {
        let mut output = data.to_string();
        if !output.ends_with('\n') {
            output.push('\n');
        }

        if let Some(path) = &self.path {
            fs::write(path, output)?;
        } else {
            print!("{output}");
        }
        Ok(())
    }
}
