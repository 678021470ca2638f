//! Terminal interaction for the login flow
//!
//! Captchas are drawn as ASCII art and QR codes with unicode half blocks, so
//! the whole login works over SSH.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use image::GrayImage;
use indicatif::{ProgressBar, ProgressStyle};
use qrcode::QrCode;
use qrcode::render::unicode::Dense1x2;

use crate::app::{Prompter, QrPayload};
use crate::auth::{Credentials, PersistChoice, is_valid_username};
use crate::errors::{AuthError, AuthResult};

/// [`Prompter`] reading from stdin and drawing on stdout
#[derive(Default)]
pub struct TerminalPrompter {
    spinner: Option<ProgressBar>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print above the spinner without tearing it
    fn print(&self, text: &str) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{}", text)),
            None => println!("{}", text),
        }
    }
}

impl Drop for TerminalPrompter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

impl Prompter for TerminalPrompter {
    fn fill_credentials(&mut self, mut known: Credentials) -> AuthResult<Credentials> {
        self.stop_spinner();

        if known.username.is_none() {
            let username = ask_until_valid(|| read_line("jAccount username: "), username_problem)?;
            known.username = Some(username);
        }

        if known.password.is_none() {
            let password = ask_until_valid(
                || rpassword::prompt_password("jAccount password: ").map_err(AuthError::Prompt),
                password_problem,
            )?;
            known.password = Some(password);
        }

        Ok(known)
    }

    fn persist_choice(&mut self) -> AuthResult<PersistChoice> {
        loop {
            let answer =
                read_line("Save credentials? [y] both, [u] username only, [N] nothing: ")?;
            match answer.parse() {
                Ok(choice) => return Ok(choice),
                Err(e) => println!("{}", e),
            }
        }
    }

    fn solve_captcha(&mut self, image: &[u8]) -> AuthResult<String> {
        self.stop_spinner();
        let art = captcha_ascii(image).map_err(|e| {
            AuthError::Prompt(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })?;
        println!("{}", art);
        read_line("Captcha: ")
    }

    fn show_qr(&mut self, payload: &QrPayload) -> AuthResult<()> {
        let art = qr_text(&payload.confirm_uri())?;
        self.print(&art);

        if self.spinner.is_none() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message("Scan the code with the jAccount app...");
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        }
        Ok(())
    }

    fn notice(&mut self, message: &str) {
        self.print(message);
    }
}

fn read_line(prompt: &str) -> AuthResult<String> {
    print!("{}", prompt);
    io::stdout().flush().map_err(AuthError::Prompt)?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(AuthError::Prompt)?;
    if read == 0 {
        return Err(AuthError::Prompt(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed",
        )));
    }
    Ok(line.trim().to_string())
}

/// Render a QR code as inverted unicode blocks, readable on dark terminals
pub fn qr_text(data: &str) -> AuthResult<String> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| {
        AuthError::Prompt(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    })?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Render a captcha image as `#` (ink) and spaces, with blank borders trimmed
pub fn captcha_ascii(bytes: &[u8]) -> Result<String, image::ImageError> {
    let gray = image::load_from_memory(bytes)?.to_luma8();
    Ok(ink_rows(&gray)
        .iter()
        .map(|row| row.iter().map(|ink| if *ink { '#' } else { ' ' }).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Normalise brightness to 0..1 and mark pixels at or below one half as ink
fn ink_rows(gray: &GrayImage) -> Vec<Vec<bool>> {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return Vec::new();
    }
    let range = f32::from(max - min);

    let rows: Vec<Vec<bool>> = (0..gray.height())
        .map(|y| {
            (0..gray.width())
                .map(|x| f32::from(gray.get_pixel(x, y).0[0] - min) / range <= 0.5)
                .collect()
        })
        .collect();

    let inked_rows: Vec<usize> = (0..rows.len())
        .filter(|&y| rows[y].iter().any(|ink| *ink))
        .collect();
    let (Some(&top), Some(&bottom)) = (inked_rows.first(), inked_rows.last()) else {
        return Vec::new();
    };

    let width = gray.width() as usize;
    let inked_cols: Vec<usize> = (0..width)
        .filter(|&x| rows[top..=bottom].iter().any(|row| row[x]))
        .collect();
    let (Some(&left), Some(&right)) = (inked_cols.first(), inked_cols.last()) else {
        return Vec::new();
    };

    rows[top..=bottom]
        .iter()
        .map(|row| row[left..=right].to_vec())
        .collect()
}

/// Keep asking until `problem` has nothing to say about the answer
fn ask_until_valid<A, V>(mut ask: A, problem: V) -> AuthResult<String>
where
    A: FnMut() -> AuthResult<String>,
    V: Fn(&str) -> Option<&'static str>,
{
    loop {
        let answer = ask()?;
        match problem(&answer) {
            None => return Ok(answer),
            Some(reason) => println!("{}", reason),
        }
    }
}

fn username_problem(username: &str) -> Option<&'static str> {
    if is_valid_username(username) {
        None
    } else {
        Some("Username should be alphanumeric with optional dots, hyphens, or underscores")
    }
}

fn password_problem(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password cannot be empty")
    } else {
        None
    }
}
