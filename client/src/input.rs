//! Local button capture from line commands with edge detection
//!
//! The binary has no window, so buttons are driven from stdin:
//!
//! ```text
//! left down     press and hold
//! left up       release
//! a tap         press then release
//! release       release everything held
//! ```

use log::{debug, warn};
use shared::Button;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Tracks held buttons and turns commands into press/release edges
#[derive(Debug, Default)]
pub struct InputManager {
    held: [bool; 6],
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held[slot(button)]
    }

    /// Parses one command line and returns the resulting edges
    ///
    /// Pressing a held button or releasing a free one produces no edge.
    /// Unrecognised lines return None.
    pub fn update(&mut self, line: &str) -> Option<Vec<(Button, bool)>> {
        let mut words = line.split_whitespace();
        let first = words.next()?;

        if first.eq_ignore_ascii_case("release") {
            let edges = Button::ALL
                .iter()
                .filter_map(|&button| self.set(button, false))
                .collect();
            return Some(edges);
        }

        let button = parse_button(first)?;
        let edges = match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("down") | Some("press") => self.set(button, true).into_iter().collect(),
            Some("up") | Some("release") => self.set(button, false).into_iter().collect(),
            Some("tap") | None => {
                let mut edges: Vec<_> = self.set(button, true).into_iter().collect();
                edges.extend(self.set(button, false));
                edges
            }
            Some(_) => return None,
        };
        Some(edges)
    }

    fn set(&mut self, button: Button, pressed: bool) -> Option<(Button, bool)> {
        let held = &mut self.held[slot(button)];
        if *held == pressed {
            return None;
        }
        *held = pressed;
        Some((button, pressed))
    }
}

/// Button names as they appear on the wire, case-insensitive
pub fn parse_button(name: &str) -> Option<Button> {
    Button::ALL
        .iter()
        .copied()
        .find(|button| button.as_str().eq_ignore_ascii_case(name))
}

fn slot(button: Button) -> usize {
    match button {
        Button::Left => 0,
        Button::Right => 1,
        Button::Up => 2,
        Button::Down => 3,
        Button::A => 4,
        Button::B => 5,
    }
}

/// Reads commands from stdin until EOF and forwards the edges
pub fn spawn_stdin_reader(edges: mpsc::Sender<(Button, bool)>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut manager = InputManager::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error reading stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match manager.update(&line) {
                Some(batch) => {
                    for edge in batch {
                        if edges.send(edge).await.is_err() {
                            return;
                        }
                    }
                }
                None => warn!("Unrecognised input command: {:?}", line.trim()),
            }
        }
        debug!("Stdin closed, no more local input");
    })
}
