use crate::error::{XfResult, XrayFitError};
use std::io::{BufRead, Write};

/// Answer to one prompt. `EXIT` and `RETURN` arrive as their own variants; `SHOW` is answered by
/// the prompter itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Value(T),
    Return,
    Exit,
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Value(v) => Reply::Value(f(v)),
            Reply::Return => Reply::Return,
            Reply::Exit => Reply::Exit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Exit,
    Show,
    Return,
}

pub fn sentinel(input: &str) -> Option<Sentinel> {
    match input.trim().to_ascii_uppercase().as_str() {
        "EXIT" => Some(Sentinel::Exit),
        "SHOW" => Some(Sentinel::Show),
        "RETURN" => Some(Sentinel::Return),
        _ => None,
    }
}

/// Menu answer: the option number (1-based) or its label, case-insensitive. Returns the 0-based index.
pub fn parse_menu_choice(input: &str, options: &[&str]) -> XfResult<usize> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Ok(n - 1);
        }
    }
    options
        .iter()
        .position(|o| o.eq_ignore_ascii_case(input))
        .ok_or_else(|| XrayFitError::InvalidSelection(input.to_string()))
}

pub fn parse_yes_no(input: &str) -> XfResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(XrayFitError::InvalidSelection(other.to_string())),
    }
}

/// Line-oriented dialog over any reader/writer pair. Invalid answers are reported and asked again;
/// end of input counts as `EXIT`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    show: Option<String>,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            show: None,
        }
    }

    /// Text printed whenever the user types `SHOW`.
    pub fn set_show(&mut self, text: impl Into<String>) {
        self.show = Some(text.into());
    }

    pub fn say(&mut self, text: &str) -> XfResult<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self, prompt: &str) -> XfResult<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn ask<T>(&mut self, prompt: &str, parse: impl Fn(&str) -> XfResult<T>) -> XfResult<Reply<T>> {
        loop {
            let Some(line) = self.read_line(prompt)? else {
                return Ok(Reply::Exit);
            };
            match sentinel(&line) {
                Some(Sentinel::Exit) => return Ok(Reply::Exit),
                Some(Sentinel::Return) => return Ok(Reply::Return),
                Some(Sentinel::Show) => {
                    if let Some(text) = self.show.clone() {
                        self.say(&text)?;
                    }
                    continue;
                }
                None => {}
            }
            match parse(&line) {
                Ok(v) => return Ok(Reply::Value(v)),
                Err(e) => self.say(&format!("  {}", e))?,
            }
        }
    }

    /// Numbered menu; yields the 0-based index of the chosen option.
    pub fn menu(&mut self, title: &str, options: &[&str]) -> XfResult<Reply<usize>> {
        self.say(title)?;
        for (i, o) in options.iter().enumerate() {
            self.say(&format!("  {}) {}", i + 1, o))?;
        }
        self.ask("Select an option: ", |s| parse_menu_choice(s, options))
    }

    pub fn confirm(&mut self, prompt: &str) -> XfResult<Reply<bool>> {
        self.ask(&format!("{} (y/n): ", prompt), parse_yes_no)
    }
}
