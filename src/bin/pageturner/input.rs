//! Stdin stand-in for the hardware button and the production switch.

use crossbeam_channel::Sender;
use pageturner::log_debug;
use std::io::{self, BufRead};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Press,
    Release,
    /// Flip the button level (a bare Enter).
    ToggleButton,
    ToggleProduction,
    Exit,
}

pub(crate) fn parse_command(line: &str) -> Option<InputEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "button" => Some(InputEvent::ToggleButton),
        "down" | "press" => Some(InputEvent::Press),
        "up" | "release" => Some(InputEvent::Release),
        "p" | "production" => Some(InputEvent::ToggleProduction),
        "q" | "quit" | "exit" => Some(InputEvent::Exit),
        _ => None,
    }
}

pub(crate) fn spawn_input_thread(tx: Sender<InputEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    break;
                }
            };
            match parse_command(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                None => eprintln!("unknown command '{}' (b, press, release, p, q)", line.trim()),
            }
        }
    })
}
