//! Line-oriented front end over [`UiController`].

use super::{Notice, NoticeKind, Screen, UiController, ViewState};
use crate::models::{format_track, AuthEvent};
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

pub const HELP: &str = "\
Commands:
  login              open the authorization page
  logout             forget the stored session
  search <song>      search for a seed song (a bare line also searches)
  select <n>         build a playlist from result n (a bare number also selects)
  save [name]        save the generated playlist to your account
  new                discard the generated playlist
  playlists          list your playlists
  whoami             show the logged-in user
  status             redraw the screen
  help               show this help
  quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    Search(String),
    Select(usize),
    Save(Option<String>),
    New,
    Playlists,
    WhoAmI,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if let Ok(n) = line.parse::<usize>() {
            return Command::Select(n);
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "login" => Command::Login,
            "logout" => Command::Logout,
            "search" => Command::Search(rest.to_string()),
            "select" => match rest.parse() {
                Ok(n) => Command::Select(n),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "save" if rest.is_empty() => Command::Save(None),
            "save" => Command::Save(Some(rest.to_string())),
            "new" => Command::New,
            "playlists" => Command::Playlists,
            "whoami" => Command::WhoAmI,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Search(line.to_string()),
        }
    }

    fn needs_login(&self) -> bool {
        matches!(
            self,
            Command::Search(_)
                | Command::Select(_)
                | Command::Save(_)
                | Command::New
                | Command::Playlists
                | Command::WhoAmI
        )
    }
}

pub fn render(view: &ViewState, notices: &[Notice]) -> String {
    let mut out = String::new();

    match view.screen {
        Screen::Login => {
            out.push_str("== Play Gen ==\nNot logged in. Type `login` to connect your Spotify account.\n");
            if let Some(url) = &view.authorize_url {
                let _ = writeln!(out, "Open this URL in your browser to continue:\n  {}", url);
            }
        }
        Screen::App => {
            let user = view
                .current_user
                .as_ref()
                .map(|u| u.display_name().to_string())
                .unwrap_or_else(|| "...".to_string());
            let _ = writeln!(out, "== Play Gen ==  Logged in as {}", user);
        }
    }

    if view.loading {
        out.push_str("Loading...\n");
    }

    if view.show_results {
        if view.search_results.is_empty() {
            out.push_str("No songs found. Try a different search term.\n");
        } else {
            out.push_str("Search results:\n");
            for (i, track) in view.search_results.iter().enumerate() {
                let track = format_track(track);
                let _ = writeln!(out, "  {:>2}. {} - {}", i + 1, track.name, track.artist());
            }
        }
    }

    if view.show_playlist {
        if let Some(seed) = &view.selected_track {
            let _ = writeln!(
                out,
                "Playlist based on \"{}\" by {}:",
                seed.name,
                seed.primary_artist()
            );
        }
        for (i, track) in view.generated_tracks.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>2}. {} - {} ({})",
                i + 1,
                track.name,
                track.artist(),
                track.duration()
            );
        }
        out.push_str("Type `save [name]` to keep it or `new` to start over.\n");
    }

    if !view.user_playlists.is_empty() {
        out.push_str("Your playlists:\n");
        for playlist in &view.user_playlists {
            let _ = writeln!(out, "  - {}", playlist.name);
        }
    }

    for notice in notices {
        let tag = match notice.kind {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        };
        let _ = writeln!(out, "[{}] {}", tag, notice.text);
    }

    out
}

async fn dispatch(controller: &mut UiController, command: Command) {
    if command.needs_login() && controller.view().screen != Screen::App {
        controller.show_error("Please log in first");
        return;
    }

    match command {
        Command::Login => {
            if let Some(url) = controller.handle_login().await {
                tracing::info!("Authorization URL: {}", url);
            }
        }
        Command::Logout => controller.handle_logout().await,
        Command::Search(query) => controller.handle_search(&query).await,
        Command::Select(n) => controller.select_track(n).await,
        Command::Save(name) => {
            controller.handle_save_playlist(name.as_deref()).await;
        }
        Command::New => controller.handle_generate_new(),
        Command::Playlists => controller.load_playlists().await,
        Command::WhoAmI => controller.load_user_profile().await,
        Command::Unknown(line) => controller.show_error(&format!("Unknown command: {}", line)),
        Command::Status | Command::Help | Command::Quit | Command::Empty => {}
    }
}

/// Reads commands from stdin and redraws after every action or auth change.
pub async fn run(
    mut controller: UiController,
    mut auth_events: broadcast::Receiver<AuthEvent>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    redraw(&mut controller);
    println!("{}", HELP);

    loop {
        tokio::select! {
            event = auth_events.recv() => match event {
                Ok(event) => controller.handle_auth_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} auth events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Command::Quit => break,
                    Command::Help => println!("{}", HELP),
                    command => dispatch(&mut controller, command).await,
                }
            }
        }

        redraw(&mut controller);
    }

    Ok(())
}

fn redraw(controller: &mut UiController) {
    let (view, notices) = controller.snapshot();
    println!("{}", render(view, notices));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiTrack, Track};
    use crate::test_support::track_json;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("login"), Command::Login);
        assert_eq!(Command::parse("  3 "), Command::Select(3));
        assert_eq!(Command::parse("select 12"), Command::Select(12));
        assert_eq!(
            Command::parse("search Blue Monday"),
            Command::Search("Blue Monday".to_string())
        );
        assert_eq!(Command::parse("save"), Command::Save(None));
        assert_eq!(
            Command::parse("save Road Trip"),
            Command::Save(Some("Road Trip".to_string()))
        );
        assert_eq!(Command::parse("QUIT"), Command::Quit);
        assert_eq!(Command::parse(""), Command::Empty);
    }

    #[test]
    fn test_bare_text_searches() {
        assert_eq!(
            Command::parse("Bohemian Rhapsody"),
            Command::Search("Bohemian Rhapsody".to_string())
        );
        assert_eq!(
            Command::parse("select one"),
            Command::Unknown("select one".to_string())
        );
    }

    #[test]
    fn test_render_login_screen() {
        let view = ViewState {
            authorize_url: Some("https://accounts.test/authorize?x=1".to_string()),
            ..Default::default()
        };

        let out = render(&view, &[]);
        assert!(out.contains("Not logged in"));
        assert!(out.contains("https://accounts.test/authorize?x=1"));
    }

    #[test]
    fn test_render_results_and_playlist() {
        let seed: ApiTrack =
            serde_json::from_value(track_json("t1", "Blue Monday", "New Order", 70)).unwrap();
        let view = ViewState {
            screen: Screen::App,
            search_results: vec![seed.clone()],
            show_results: true,
            generated_tracks: vec![Track::from(&seed)],
            selected_track: Some(seed),
            show_playlist: true,
            ..Default::default()
        };

        let out = render(&view, &[]);
        assert!(out.contains(" 1. Blue Monday - New Order"));
        assert!(out.contains("Playlist based on \"Blue Monday\" by New Order:"));
        assert!(out.contains("(3:05)"));
    }

    #[test]
    fn test_render_empty_results() {
        let view = ViewState {
            screen: Screen::App,
            show_results: true,
            ..Default::default()
        };

        assert!(render(&view, &[]).contains("No songs found. Try a different search term."));
    }
}
