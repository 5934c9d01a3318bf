use std::io::Write;
use std::sync::Arc;

use askmom_api::{AssistantError, ClientConfig, ConversationId, HttpAssistantClient, SharedCredential};
use askmom_session::{
    ImageCrateTranscoder, Notice, PathPhotoLibrary, Platform, Role, Session, SessionUpdate,
    SettingsStore, Turn, TurnId,
};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str =
    "commands: /new, /history [query], /open <id>, /attach <paths...>, /remove <uri>, /token [value], /quit";

#[derive(Debug, Snafu)]
enum DriverError {
    #[snafu(display("failed to build assistant client on `{stage}`: {source}"))]
    Client {
        stage: &'static str,
        source: AssistantError,
    },
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    Stdin {
        stage: &'static str,
        source: std::io::Error,
    },
}

struct Driver {
    session: Session,
    store: SettingsStore,
    credentials: Arc<SharedCredential>,
    platform: Platform,
    transcoder: ImageCrateTranscoder,
    show_history: bool,
}

#[tokio::main]
async fn main() -> Result<(), DriverError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = SettingsStore::load();
    let settings = store.settings();
    tracing::info!(
        config_path = %store.config_path().display(),
        api_base_url = %settings.api_base_url,
        "starting askmom"
    );
    if settings.auth_token.is_none() {
        tracing::warn!("no auth_token configured; sign in with /token <value>");
    }

    let credentials = Arc::new(SharedCredential::new(settings.auth_token.clone()));
    let client = HttpAssistantClient::new(
        ClientConfig::new(settings.api_base_url.clone()).with_timeout(settings.request_timeout()),
        credentials.clone(),
    )
    .context(ClientSnafu {
        stage: "build-assistant-client",
    })?;

    let mut driver = Driver {
        session: Session::new(Arc::new(client), &settings),
        store,
        credentials,
        platform: settings.platform,
        transcoder: ImageCrateTranscoder::new(),
        show_history: false,
    };
    driver.session.refresh_conversations();
    driver.show_opener();
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context(StdinSnafu { stage: "read-line" })? else {
                    break;
                };
                if !driver.handle_line(line.trim()).await {
                    break;
                }
            }
            Some(update) = driver.session.next_update() => driver.render(&update),
        }
    }

    Ok(())
}

impl Driver {
    fn show_opener(&mut self) {
        if self.session.seed_opener_if_fresh()
            && let Some(turn) = self.session.turns().last()
        {
            print_turn(turn);
        }
    }

    /// Returns `false` when the driver should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let (command, argument) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "/quit" => return false,
            "/help" => println!("{HELP}"),
            "/new" => {
                self.session.clear();
                self.show_opener();
            }
            "/history" => {
                self.show_history = true;
                let query = (!argument.is_empty()).then(|| argument.to_string());
                self.session.search_conversations(query);
            }
            "/open" => match argument.parse::<u64>() {
                Ok(raw) => self.session.select_conversation(ConversationId::new(raw)),
                Err(_) => println!("usage: /open <conversation id>"),
            },
            "/attach" => self.attach(argument).await,
            "/token" => self.save_token(argument),
            "/remove" => {
                if !self.session.remove_image(argument) {
                    println!("not staged: {argument}");
                }
                self.print_staged();
            }
            _ => self.send(line),
        }
        true
    }

    async fn attach(&mut self, argument: &str) {
        let library = PathPhotoLibrary::new(argument.split_whitespace());
        match self.session.pick_images(&library, &self.transcoder).await {
            Ok(_) => {
                // No thumbnails to decode in a terminal.
                let uris: Vec<String> =
                    self.session.staged().iter().map(|image| image.uri.clone()).collect();
                for uri in uris {
                    self.session.mark_image_loaded(&uri);
                }
                self.print_staged();
            }
            Err(error) => {
                tracing::debug!(error = %error, "image pick refused");
                print_notice(&error.notice());
            }
        }
    }

    /// An empty argument signs out.
    fn save_token(&self, argument: &str) {
        match self.store.save_auth_token(Some(argument), &self.credentials) {
            Ok(true) => println!("(signed in)"),
            Ok(false) => println!("(signed out)"),
            Err(error) => {
                tracing::warn!(error = %error, "failed to save auth token");
                println!("(couldn’t save token: {error})");
            }
        }
    }

    fn send(&mut self, line: &str) {
        self.session.set_input(line);
        match self.session.send() {
            Ok(ticket) => {
                if let Some(turn) = self.turn(ticket.user_turn) {
                    print_turn(turn);
                }
                if let Some(turn) = self.turn(ticket.pending_turn) {
                    print!("mom: {}", turn.text);
                    flush();
                }
            }
            Err(rejection) => match rejection.notice() {
                Some(notice) => print_notice(&notice),
                None => println!("(still waiting on mom)"),
            },
        }
    }

    fn turn(&self, turn_id: TurnId) -> Option<&Turn> {
        self.session.store().get(turn_id)
    }

    fn render(&mut self, update: &SessionUpdate) {
        match update {
            SessionUpdate::ThinkingAnimated(turn_id) => {
                if let Some(turn) = self.turn(*turn_id) {
                    print!("\r\x1b[2Kmom: {}", turn.text);
                    flush();
                }
            }
            SessionUpdate::ReplyResolved { turn_id, .. } | SessionUpdate::ReplyFailed { turn_id, .. } => {
                print!("\r\x1b[2K");
                if let Some(turn) = self.turn(*turn_id) {
                    print_turn(turn);
                    self.print_contact_panel(turn);
                }
            }
            SessionUpdate::StaleReplyIgnored(_) | SessionUpdate::Ignored => {}
            SessionUpdate::ConversationsRefreshed => {
                if std::mem::take(&mut self.show_history) {
                    self.print_history();
                }
            }
            SessionUpdate::ConversationsRefreshFailed => {
                if std::mem::take(&mut self.show_history) {
                    println!("(couldn’t load history)");
                }
            }
            SessionUpdate::ConversationLoaded(conversation_id) => {
                println!("--- conversation {conversation_id} ---");
                for turn in self.session.turns() {
                    print_turn(turn);
                }
            }
            SessionUpdate::ConversationLoadFailed { notice, .. } => {
                print_notice(notice);
                self.show_opener();
            }
        }
    }

    fn print_history(&self) {
        let conversations = self.session.conversations();
        if conversations.is_empty() {
            println!("(no conversations)");
            return;
        }
        for summary in conversations {
            println!(
                "  {:>6}  {:<8?}  {}",
                summary.id,
                summary.risk_level,
                summary.title.as_deref().unwrap_or("Untitled")
            );
        }
    }

    fn print_staged(&self) {
        let staged = self.session.staged();
        if staged.is_empty() {
            println!("(no images staged)");
            return;
        }
        for image in staged {
            println!("  [img] {}", image.uri);
        }
    }

    fn print_contact_panel(&self, turn: &Turn) {
        let Some(view) = turn.contact_panel().and_then(|panel| panel.view()) else {
            return;
        };

        if let Some(reason) = turn.escalation_reason.as_deref() {
            println!("  ! {reason}");
        }
        for (label, link) in [
            ("text", view.sms_link(self.platform)),
            ("email", view.email_link()),
            ("call", view.call_link()),
        ] {
            if let Some(link) = link {
                println!("  {label}: {link}");
            }
        }
    }
}

fn print_turn(turn: &Turn) {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "mom",
    };
    println!("{speaker}: {}", turn.text);
    for image in &turn.images {
        println!("  [img] {}", image.uri);
    }
}

fn print_notice(notice: &Notice) {
    println!("{}: {}", notice.title, notice.body);
}

fn flush() {
    let _ = std::io::stdout().flush();
}
