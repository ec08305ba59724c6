//! Terminal front end: prints progress, reports, and history; reads questions and commands.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::gemini::LanguageModel;
use crate::pipeline::{format_history, format_report};
use crate::retrieve::Retriever;
use crate::session::{LoopState, Session, SessionError};

const HELP: &str = "\
Type a research question and press Enter.

Commands:
  /history   list the questions asked in this session
  /clear     forget the session history
  /help      show this message
  /quit      leave (Ctrl-D works too)";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    History,
    Clear,
    Help,
    Quit,
    Blank,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Blank,
        "/history" => Input::History,
        "/clear" => Input::Clear,
        "/help" | "/?" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd),
        question => Input::Question(question),
    }
}

fn print_progress(state: &LoopState) {
    match state {
        LoopState::RewritingQuery => eprintln!("… rewriting question"),
        LoopState::Retrieving { query } => eprintln!("… retrieving information for: {query}"),
        LoopState::Summarizing { documents } => eprintln!("… summarizing {documents} sources"),
        LoopState::Synthesizing => eprintln!("… generating final answer"),
        LoopState::Idle | LoopState::Rendered => {}
    }
}

/// Answers one question and prints the report.
pub async fn ask_once<M: LanguageModel, R: Retriever>(
    session: &mut Session<M, R>,
    question: &str,
) -> Result<(), SessionError> {
    let report = session.submit(question, print_progress).await?;
    println!("{}", format_report(&report));
    Ok(())
}

/// Interactive loop over stdin until `/quit` or end of input.
pub async fn run<M: LanguageModel, R: Retriever>(
    session: &mut Session<M, R>,
) -> std::io::Result<()> {
    println!("AI Research Assistant. Type /help for commands.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("research> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Help => println!("{HELP}\n"),
            Input::History => println!("{}", format_history(session.history())),
            Input::Clear => match session.clear_history() {
                Ok(()) => println!("Chat history cleared.\n"),
                Err(e) => println!("error: {e}\n"),
            },
            Input::Unknown(cmd) => println!("unknown command {cmd}; type /help\n"),
            Input::Question(question) => match session.submit(question, print_progress).await {
                Ok(report) => println!("{}", format_report(&report)),
                // the session is back at Idle; the user can retry
                Err(e) => println!("error: {e}\n"),
            },
        }
    }

    Ok(())
}
