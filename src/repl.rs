//! Terminal presentation layer over the session controller.
//!
//! The REPL owns nothing but rendering and input parsing; every state change
//! goes through the controller's four triggers, and gating follows the
//! lifecycle phase (chat and process are only offered when the phase allows).

#![allow(clippy::print_stdout)] // terminal frontend intentionally uses stdout

use crate::document::StagedDocument;
use crate::error::{DisplayError, DocbotError, Result, SessionError};
use crate::session::{ChatRole, ChatTurn, SessionController, SessionPhase};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One parsed line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Load(String),
    Process,
    Drop,
    Help,
    Quit,
    Chat(String),
    Empty,
}

impl Input {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Some(rest) = trimmed.strip_prefix("/load")
            && (rest.is_empty() || rest.starts_with(' '))
        {
            return Self::Load(rest.trim().to_string());
        }
        match trimmed {
            "/process" => Self::Process,
            "/drop" => Self::Drop,
            "/help" => Self::Help,
            "exit" | "quit" | "/quit" => Self::Quit,
            _ => Self::Chat(trimmed.to_string()),
        }
    }
}

/// Interactive chat loop over a [`SessionController`].
pub struct Repl {
    controller: SessionController,
}

impl Repl {
    /// Create a REPL over the given controller.
    #[must_use]
    pub fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    /// Stage a document and print its preview.
    pub fn load(&mut self, document: StagedDocument) {
        let identity = document.identity().clone();
        let pages = document.page_count();
        self.controller.select_file(document);

        println!("Staged: {identity}");
        match pages {
            Ok(count) => println!("Preview: {count} page(s)"),
            Err(e) => println!("Preview unavailable: {e}"),
        }
        if self.controller.phase() == SessionPhase::Ready {
            // Re-selecting the processed document keeps the conversation.
            println!("✔ Document already processed");
        } else {
            println!("Run /process to index it.");
        }
    }

    /// Run the process-document trigger and render the outcome.
    pub async fn process(&mut self) -> Result<()> {
        match self.controller.process_document().await {
            Ok(()) => {
                println!("✔ Document processed successfully");
                Ok(())
            }
            Err(e @ DocbotError::Session(_)) => {
                println!("{}", DisplayError(&e));
                Ok(())
            }
            Err(e) => {
                println!("{}", DisplayError(&e));
                println!("The document is still staged; fix the issue and retry /process.");
                Err(e)
            }
        }
    }

    /// Submit a chat message and render the reply.
    async fn chat(&mut self, prompt: &str) {
        match self.controller.submit_message(prompt).await {
            Ok(turn) => println!("\n{}\n", turn.content),
            Err(SessionError::NotReady) => {
                println!("Load and process a PDF first: /load <path>, then /process.");
            }
            Err(e) => println!("{e}"),
        }
    }

    fn print_banner(&self) {
        println!("Docbot | chat with your PDF | /help for commands\n");
    }

    fn print_help() {
        println!("Commands:");
        println!("  /load <path>  stage a PDF file");
        println!("  /process      index the staged file");
        println!("  /drop         remove the file and reset the session");
        println!("  /help         show this help");
        println!("  exit          leave");
        println!("Anything else is sent to the agent once a document is processed.");
    }

    fn print_transcript(turns: &[ChatTurn]) {
        for turn in turns {
            let prefix = match turn.role {
                ChatRole::User => "You",
                ChatRole::Assistant => "Docbot",
            };
            println!("{prefix}: {}", turn.content);
        }
    }

    fn prompt(&self) -> &'static str {
        match self.controller.phase() {
            SessionPhase::Empty => "(no document) > ",
            SessionPhase::Staged => "(staged) > ",
            SessionPhase::Ready => "> ",
        }
    }

    /// Run the interactive loop until EOF or an exit command.
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();
        if !self.controller.messages().is_empty() {
            Self::print_transcript(self.controller.messages());
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("{}", self.prompt());
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match Input::parse(&line) {
                Input::Empty => {}
                Input::Quit => break,
                Input::Help => Self::print_help(),
                Input::Load(path) if path.is_empty() => {
                    println!("Usage: /load <path-to-pdf>");
                }
                Input::Load(path) => match StagedDocument::from_path(&path) {
                    Ok(document) => self.load(document),
                    Err(e) => println!("Could not read {path}: {e}"),
                },
                Input::Process => {
                    // Indexing errors are recoverable; keep the loop running.
                    let _ = self.process().await;
                }
                Input::Drop => {
                    self.controller.remove_file();
                    println!("Session cleared.");
                }
                Input::Chat(prompt) => self.chat(&prompt).await,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_parsing() {
        assert_eq!(Input::parse("/load a.pdf"), Input::Load("a.pdf".to_string()));
        assert_eq!(Input::parse("/load   spaced.pdf "), Input::Load("spaced.pdf".to_string()));
        assert_eq!(Input::parse("/load"), Input::Load(String::new()));
        assert_eq!(Input::parse("/process"), Input::Process);
        assert_eq!(Input::parse("/drop"), Input::Drop);
        assert_eq!(Input::parse("/help"), Input::Help);
        assert_eq!(Input::parse("exit"), Input::Quit);
        assert_eq!(Input::parse("quit"), Input::Quit);
        assert_eq!(Input::parse("  "), Input::Empty);
        assert_eq!(
            Input::parse("What is the refund policy?"),
            Input::Chat("What is the refund policy?".to_string())
        );
    }
}
