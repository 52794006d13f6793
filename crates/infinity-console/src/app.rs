//! The console event loop: stdin lines in, session updates out.

use crate::command::{self, HELP, Input};
use crate::config::Settings;
use infinity_client::{
    AudioClip, ChatEntry, ClientMessage, ConnectionManager, Coords, Sender, Session, Uuid,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let (manager, mut events) = ConnectionManager::spawn(settings.client);
    manager.connect();

    let mut console = Console::new(settings.audio_dir);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                console.session.apply(event);
                console.render().await;
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match command::parse(&line) {
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(input)) => {
                        console.handle(input, &manager).await;
                        console.render().await;
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("! {e}"),
                }
            }
        }
    }

    manager.shutdown().await;
    Ok(())
}

struct Console {
    session: Session,
    coords: Option<Coords>,
    audio_dir: Option<PathBuf>,
    shown_chat: HashSet<Uuid>,
    shown_log: usize,
    last_clip: Option<Uuid>,
}

impl Console {
    fn new(audio_dir: Option<PathBuf>) -> Self {
        Self {
            session: Session::new(),
            coords: None,
            audio_dir,
            shown_chat: HashSet::new(),
            shown_log: 0,
            last_clip: None,
        }
    }

    async fn handle(&mut self, input: Input, manager: &ConnectionManager) {
        match input {
            Input::Chat(text) => {
                match self.session.submit_chat(&text, self.coords, manager.state()) {
                    Some(request) => {
                        send(manager, &request);
                    }
                    None if text.trim().is_empty() => {}
                    None => eprintln!("! not connected ({})", manager.state()),
                }
            }
            Input::Coords(coords) => {
                self.coords = coords;
                match coords {
                    Some(coords) => println!("coordinates set to {coords}"),
                    None => println!("coordinates off"),
                }
            }
            Input::Synth(prompt) => match self.session.synthesize(&prompt) {
                Some(request) => {
                    if !send(manager, &request) {
                        self.session.abort_synth();
                    }
                }
                None => eprintln!("! a synthesis is already running (/cancel to stop waiting)"),
            },
            Input::Cancel => {
                self.session.abort_synth();
                println!("no longer waiting for a synthesis");
            }
            Input::Load(path) => match tokio::fs::read_to_string(&path).await {
                Ok(code) => match self.session.load_module(&code) {
                    Some(request) => {
                        send(manager, &request);
                    }
                    None => eprintln!("! {} is empty", path.display()),
                },
                Err(e) => eprintln!("! cannot read {}: {e}", path.display()),
            },
            Input::Save => {
                send(manager, &self.session.save_state());
            }
            Input::Log => {
                for entry in self.session.system_log() {
                    println!("[system] {}", entry.text);
                }
            }
            Input::Status => println!("status: {}", manager.state()),
            Input::Reconnect => manager.connect(),
            Input::Help => println!("{HELP}"),
            Input::Quit => {}
        }
    }

    /// Print whatever the session gained since the last call.
    async fn render(&mut self) {
        for entry in self.session.chat() {
            if entry.typing || self.shown_chat.contains(&entry.id) {
                continue;
            }
            self.shown_chat.insert(entry.id);
            println!("{}", format_entry(entry));
        }

        for entry in &self.session.system_log()[self.shown_log..] {
            println!("{}", format_entry(entry));
        }
        self.shown_log = self.session.system_log().len();

        if let Some(clip) = self.session.audio().cloned() {
            if self.last_clip != Some(clip.id()) {
                self.last_clip = Some(clip.id());
                self.save_clip(&clip).await;
            }
        }
    }

    async fn save_clip(&self, clip: &AudioClip) {
        let Some(dir) = &self.audio_dir else {
            println!("(audio for \"{}\" received, no --audio-dir set)", clip.prompt());
            return;
        };
        let bytes = match clip.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("cannot decode clip for {:?}: {}", clip.prompt(), e);
                return;
            }
        };

        let path = clip_path(dir, clip);
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &bytes).await
        };
        match written.await {
            Ok(()) => println!("saved audio to {}", path.display()),
            Err(e) => tracing::warn!("cannot write {}: {}", path.display(), e),
        }
    }
}

/// Send `request`, reporting a failure on stderr. Returns whether it went out.
fn send(manager: &ConnectionManager, request: &ClientMessage) -> bool {
    match manager.send(request) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("! {e}");
            false
        }
    }
}

fn clip_path(dir: &Path, clip: &AudioClip) -> PathBuf {
    dir.join(format!("{}.wav", clip.id()))
}

fn format_entry(entry: &ChatEntry) -> String {
    match (entry.sender, entry.coords) {
        (Sender::User, Some(coords)) => format!("you {coords}> {}", entry.text),
        (Sender::User, None) => format!("you> {}", entry.text),
        (Sender::Ai, _) => format!("ai> {}", entry.text),
        (Sender::System, _) => format!("[system] {}", entry.text),
    }
}
