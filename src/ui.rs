// UI layer: terminal prompts, tables, spinners and the OK/FAILED lines.
// Prompts use `dialoguer`; long waits show an `indicatif` spinner.

use crate::auth::{ClientCredentials, CredentialProvider};
use crate::error::{CatalogError, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Asks for the client id and a masked client secret on the terminal.
/// Used every time the session needs a new token.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl CredentialProvider for TerminalPrompt {
    fn client_credentials(&mut self) -> Result<ClientCredentials> {
        // `Input::interact_text()` prompts the user for input and returns it.
        let client_id: String = Input::new()
            .with_prompt("Client ID")
            .interact_text()
            .map_err(prompt_error)?;
        // `Password` hides input in terminal for secrets.
        let client_secret: String = Password::new()
            .with_prompt("Client secret")
            .interact()
            .map_err(prompt_error)?;
        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }
}

fn prompt_error(e: io::Error) -> CatalogError {
    CatalogError::io("reading credentials from the terminal", e)
}

pub fn say(message: &str) {
    println!("{}", message);
}

pub fn ok() {
    println!("{}", "OK".green().bold());
    println!();
}

pub fn failed(message: &str) {
    eprintln!("{}", "FAILED".red().bold());
    eprintln!("{}", message);
}

/// Spinner shown while waiting on the catalog. Call `finish_and_clear`
/// when done.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Left-aligned columns sized to their widest cell.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            padded.join("   ").trim_end().to_string()
        };

        writeln!(out, "{}", line(self.headers.as_slice()))?;
        for row in &self.rows {
            writeln!(out, "{}", line(row.as_slice()))?;
        }
        Ok(())
    }

    pub fn print(&self) -> io::Result<()> {
        self.write_to(&mut io::stdout().lock())
    }
}
