//! Interactive chat session on stdin/stdout

use anyhow::Result;
use promptline_core::http::{ChatTransport, HttpClient};
use promptline_core::protocol::{BackendMode, Provider};
use promptline_core::session::{Orchestrator, SubmitOutcome, ViewState};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::submit_printing;

const HELP: &str = "\
Type a message to send it. Commands:
  :new              clear the prompts and the answer
  :history          list past exchanges
  :view N           show exchange N again
  :backend NAME     nextjs or python
  :provider NAME    OpenAI or Anthropic
  :system TEXT      set the system prompt (empty to clear)
  :help             show this text
  :quit             leave";

/// A parsed line of input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    New,
    History,
    View(usize),
    Backend(BackendMode),
    Provider(Provider),
    System(String),
    Help,
    Quit,
    Invalid(String),
}

fn parse(line: &str) -> Command {
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "new" => Command::New,
        "history" => Command::History,
        "view" => arg
            .parse()
            .map(Command::View)
            .unwrap_or_else(|_| Command::Invalid(format!("not an index: '{}'", arg))),
        "backend" => arg
            .parse()
            .map(Command::Backend)
            .unwrap_or_else(|e| Command::Invalid(e.to_string())),
        "provider" => arg
            .parse()
            .map(Command::Provider)
            .unwrap_or_else(|e| Command::Invalid(e.to_string())),
        "system" => Command::System(arg.to_string()),
        "help" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command ':{}'", other)),
    }
}

/// Run the session until `:quit` or end of input
pub async fn run(orchestrator: &mut Orchestrator<HttpClient>) -> Result<()> {
    println!("{}", HELP);
    print_form(orchestrator);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse(line.trim_end()) {
            Command::Send(message) => send(orchestrator, message).await?,
            Command::New => {
                orchestrator.reset()?;
                println!("(cleared)");
            }
            Command::History => print_history(orchestrator),
            Command::View(index) => match orchestrator.view_history(index) {
                Ok(()) => {
                    print_form(orchestrator);
                    println!("{}", orchestrator.display_text());
                }
                Err(e) => println!("error: {}", e),
            },
            Command::Backend(mode) => edit(orchestrator, |o| o.set_backend_mode(mode))?,
            Command::Provider(provider) => edit(orchestrator, |o| o.set_provider(provider))?,
            Command::System(text) => edit(orchestrator, |o| o.set_system_prompt(text))?,
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(message) => println!("error: {}", message),
        }
    }
    Ok(())
}

async fn send(orchestrator: &mut Orchestrator<HttpClient>, message: String) -> Result<()> {
    start_over(orchestrator)?;
    orchestrator.set_user_input(message)?;

    match submit_printing(orchestrator).await {
        SubmitOutcome::Completed { history_index } => println!("[saved as #{}]", history_index),
        SubmitOutcome::Rejected(_) | SubmitOutcome::Failed(_) => {
            if let Some(message) = orchestrator.error_message() {
                println!("error: {}", message);
            }
        }
    }
    Ok(())
}

/// Unlock the form after an answer is shown, keeping the system prompt
///
/// A shown answer makes the form read-only. In a chat session the system
/// prompt set with `:system` stays in effect until it is changed.
fn start_over<T: ChatTransport>(orchestrator: &mut Orchestrator<T>) -> Result<()> {
    if orchestrator.state() != ViewState::Done {
        return Ok(());
    }
    let system_prompt = orchestrator.form().system_prompt.clone();
    orchestrator.reset()?;
    orchestrator.set_system_prompt(system_prompt)?;
    Ok(())
}

/// Apply a form edit, unlocking the form first when an answer is on screen
fn edit<F, E>(orchestrator: &mut Orchestrator<HttpClient>, apply: F) -> Result<()>
where
    F: FnOnce(&mut Orchestrator<HttpClient>) -> std::result::Result<(), E>,
    E: std::error::Error + Send + Sync + 'static,
{
    start_over(orchestrator)?;
    apply(orchestrator)?;
    print_form(orchestrator);
    Ok(())
}

fn print_form(orchestrator: &Orchestrator<HttpClient>) {
    let form = orchestrator.form();
    println!(
        "[backend: {} | provider: {} | system: {}]",
        form.backend_mode,
        form.provider,
        if form.system_prompt.is_empty() {
            "(none)"
        } else {
            form.system_prompt.as_str()
        }
    );
}

fn print_history(orchestrator: &Orchestrator<HttpClient>) {
    if orchestrator.history().is_empty() {
        println!("(no history)");
        return;
    }
    for (index, entry) in orchestrator.history().iter().enumerate() {
        println!(
            "#{} [{} / {}] {}",
            index, entry.backend_mode, entry.provider, entry.user_input
        );
        if !entry.system_prompt.is_empty() {
            println!("    system: {}", entry.system_prompt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptline_core::config::{ConnectionConfig, EndpointConfig};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("hello there"), Command::Send("hello there".to_string()));
        assert_eq!(parse(":new"), Command::New);
        assert_eq!(parse(":view 2"), Command::View(2));
        assert_eq!(parse(":backend python"), Command::Backend(BackendMode::Python));
        assert_eq!(parse(":provider Anthropic"), Command::Provider(Provider::Anthropic));
        assert_eq!(parse(":system be brief"), Command::System("be brief".to_string()));
        assert_eq!(parse(":system"), Command::System(String::new()));
        assert_eq!(parse(":q"), Command::Quit);
    }

    #[tokio::test]
    async fn test_start_over_keeps_system_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0:\"ok\"\n"))
            .mount(&server)
            .await;

        let endpoints = EndpointConfig {
            prefixed: server.uri(),
            raw: server.uri(),
        };
        let client = HttpClient::from_config(&ConnectionConfig::default(), endpoints).unwrap();
        let mut orchestrator = Orchestrator::new(client);
        orchestrator.set_system_prompt("be brief").unwrap();
        orchestrator.set_user_input("Hi").unwrap();
        orchestrator.submit().await;
        assert_eq!(orchestrator.state(), ViewState::Done);

        start_over(&mut orchestrator).unwrap();

        assert_eq!(orchestrator.state(), ViewState::Idle);
        assert_eq!(orchestrator.form().system_prompt, "be brief");
        assert_eq!(orchestrator.form().user_input, "");
        assert_eq!(orchestrator.display_text(), "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(":view x"), Command::Invalid(_)));
        assert!(matches!(parse(":provider Gemini"), Command::Invalid(_)));
        assert!(matches!(parse(":frobnicate"), Command::Invalid(_)));
    }
}
