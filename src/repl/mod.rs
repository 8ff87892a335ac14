//! The numbered-menu loop.
//!
//! One request runs to completion before the next prompt is shown, unless Ctrl-C
//! arrives first: each menu selection, prompts and requests alike, is raced
//! against the [`Interrupt`] and abandoned when it fires. Failures of individual
//! operations are reported by the session; anything else that goes wrong inside
//! an iteration is reported here and the loop carries on.

use async_trait::async_trait;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::thread;
use tokio::sync::{Notify, mpsc};
use tracing::debug;

use crate::console::{Console, Tone};
use crate::db::VectorStore;
use crate::session::{CollectionListing, Session, collections_table};

const INVALID_CHOICE: &str = "Please select one of the available options";

/// What the user did at a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// End of input.
    Closed,
}

#[async_trait]
pub trait LineSource: Send {
    async fn read_line(&mut self) -> io::Result<Input>;
}

/// Lines from standard input.
///
/// A blocking read cannot be cancelled, so lines are read on a dedicated thread
/// and handed over through a channel. Abandoning a pending [`read_line`] leaves
/// the thread parked in the read; it goes away with the process.
///
/// [`read_line`]: LineSource::read_line
pub struct StdinLines {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl StdinLines {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel(1);
        thread::spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                // receiver dropped, nobody is listening anymore
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
        StdinLines { lines: rx }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn read_line(&mut self) -> io::Result<Input> {
        match self.lines.recv().await {
            Some(line) => Ok(Input::Line(line?)),
            None => Ok(Input::Closed),
        }
    }
}

/// Latched Ctrl-C notification.
///
/// A trigger with nobody waiting is kept until the next [`wait`](Interrupt::wait),
/// so an interrupt that lands between two selections is not lost.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to Ctrl-C for the rest of the process.
    pub fn listen() -> Self {
        let interrupt = Interrupt::new();
        let handle = interrupt.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    debug!(error = %err, "cannot listen for Ctrl-C");
                    return;
                }
                handle.trigger();
            }
        });
        interrupt
    }

    pub fn trigger(&self) {
        self.notify.notify_one();
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ListCollections,
    ViewDetails,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 3] = [
        MenuChoice::ListCollections,
        MenuChoice::ViewDetails,
        MenuChoice::Exit,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MenuChoice::ListCollections => "1",
            MenuChoice::ViewDetails => "2",
            MenuChoice::Exit => "3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::ListCollections => "List collections",
            MenuChoice::ViewDetails => "View collection details",
            MenuChoice::Exit => "Exit",
        }
    }

    pub fn from_key(key: &str) -> Option<MenuChoice> {
        MenuChoice::ALL.into_iter().find(|choice| choice.key() == key)
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Exited,
    Interrupted,
    InputClosed,
}

enum Answer {
    Chosen(String),
    Stop(LoopExit),
}

pub async fn run<S: VectorStore>(
    session: &Session<S>,
    console: &mut dyn Console,
    input: &mut dyn LineSource,
    interrupt: &Interrupt,
) -> LoopExit {
    loop {
        show_menu(console);
        let outcome = tokio::select! {
            outcome = step(session, console, input) => outcome,
            _ = interrupt.wait() => Ok(Some(LoopExit::Interrupted)),
        };
        match outcome {
            Ok(Some(LoopExit::Exited)) => return LoopExit::Exited,
            Ok(Some(exit)) => {
                console.message("\nExiting...", Tone::Notice);
                return exit;
            }
            Ok(None) => {}
            Err(err) => console.message(&format!("Error: {}", err), Tone::Error),
        }
    }
}

fn show_menu(console: &mut dyn Console) {
    console.message("\n=== ChromaDB Viewer ===", Tone::Heading);
    for choice in MenuChoice::ALL {
        console.message(&format!("{}. {}", choice.key(), choice.label()), Tone::Plain);
    }
}

/// Runs one menu selection. `Some` ends the loop.
async fn step<S: VectorStore>(
    session: &Session<S>,
    console: &mut dyn Console,
    input: &mut dyn LineSource,
) -> io::Result<Option<LoopExit>> {
    let keys = MenuChoice::ALL.map(MenuChoice::key);
    let choice = match ask(console, input, "Select an option", &keys).await? {
        Answer::Chosen(key) => MenuChoice::from_key(&key),
        Answer::Stop(exit) => return Ok(Some(exit)),
    };

    match choice {
        Some(MenuChoice::ListCollections) => {
            if let CollectionListing::Found(names) = session.list_collections(console).await {
                console.table(&collections_table(&names));
            }
            Ok(None)
        }
        Some(MenuChoice::ViewDetails) => view_details(session, console, input).await,
        Some(MenuChoice::Exit) => Ok(Some(LoopExit::Exited)),
        None => Ok(None),
    }
}

async fn view_details<S: VectorStore>(
    session: &Session<S>,
    console: &mut dyn Console,
    input: &mut dyn LineSource,
) -> io::Result<Option<LoopExit>> {
    let names = match session.list_collections(console).await {
        CollectionListing::Found(names) => names,
        CollectionListing::Empty => {
            console.message("No collections found!", Tone::Error);
            return Ok(None);
        }
        // already reported by the session
        CollectionListing::Unavailable => return Ok(None),
    };

    match ask(console, input, "Enter collection name", &names).await? {
        Answer::Chosen(name) => {
            session.show_collection_info(console, &name).await;
            Ok(None)
        }
        Answer::Stop(exit) => Ok(Some(exit)),
    }
}

/// Prompts until the answer is one of `choices`.
async fn ask<T: AsRef<str>>(
    console: &mut dyn Console,
    input: &mut dyn LineSource,
    label: &str,
    choices: &[T],
) -> io::Result<Answer> {
    let options = choices
        .iter()
        .map(|choice| choice.as_ref())
        .collect::<Vec<&str>>()
        .join("/");

    loop {
        console.prompt(&format!("{} [{}]: ", label, options));
        match input.read_line().await? {
            Input::Line(line) => {
                let answer = line.trim();
                if choices.iter().any(|choice| choice.as_ref() == answer) {
                    return Ok(Answer::Chosen(answer.to_string()));
                }
                console.message(INVALID_CHOICE, Tone::Error);
            }
            Input::Closed => return Ok(Answer::Stop(LoopExit::InputClosed)),
        }
    }
}
