//! Single Stockfish subprocess lifecycle: spawn, UCI handshake, and the
//! three-task architecture (stdout reader / stdin writer / command
//! processor) that keeps process I/O off the caller's async task.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineEvent, UciMessageDirection};

pub struct EngineProcess {
    child: Child,
    command_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub executable_path: String,
    pub skill_level: Option<u8>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

impl EngineProcess {
    #[tracing::instrument(level = "info", skip(config), fields(executable = %config.executable_path))]
    pub async fn spawn(config: ProcessConfig) -> Result<Self, String> {
        let path = resolve_executable(&config.executable_path)
            .ok_or_else(|| format!("engine executable not found: {}", config.executable_path))?;

        let mut child = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn engine: {e}"))?;

        let mut stdin = child.stdin.take().ok_or("engine process has no stdin")?;
        let stdout = child.stdout.take().ok_or("engine process has no stdout")?;

        stdin
            .write_all(b"uci\n")
            .await
            .map_err(|e| format!("failed to write to engine stdin: {e}"))?;
        stdin.flush().await.map_err(|e| format!("failed to flush stdin: {e}"))?;

        let (command_tx, mut command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        let reader_event_tx = event_tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("engine stdout closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!(direction = "from_engine", message = trimmed);
                        let _ = reader_event_tx
                            .send(EngineEvent::RawUciMessage {
                                direction: UciMessageDirection::FromEngine,
                                message: trimmed.to_string(),
                            })
                            .await;
                        if let Ok(msg) = parse_uci_message(trimmed) {
                            let event = match msg {
                                UciMessage::UciOk | UciMessage::ReadyOk => EngineEvent::Ready,
                                UciMessage::BestMove { mv, .. } => EngineEvent::BestMove(mv),
                                UciMessage::Info(info) => EngineEvent::Info(info),
                                UciMessage::Id { .. } => continue,
                            };
                            if reader_event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "error reading engine stdout");
                        break;
                    }
                }
            }
        });

        let mut handshake_rx = event_rx;
        let handshake = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = handshake_rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
            }
            Err("engine closed before sending uciok".to_string())
        })
        .await;
        match handshake {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err("timed out waiting for uciok".to_string()),
        }
        let event_rx = handshake_rx;

        if let Some(level) = config.skill_level {
            write_line(&mut stdin, &format!("setoption name Skill Level value {level}\n")).await?;
        }
        if let Some(threads) = config.threads {
            write_line(
                &mut stdin,
                &format!("setoption name Threads value {}\n", threads.clamp(1, 16)),
            )
            .await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            write_line(
                &mut stdin,
                &format!("setoption name Hash value {}\n", hash_mb.clamp(1, 2048)),
            )
            .await?;
        }

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        let writer_event_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(cmd) = stdin_rx.recv().await {
                let trimmed = cmd.trim();
                tracing::trace!(direction = "to_engine", message = trimmed);
                let _ = writer_event_tx
                    .send(EngineEvent::RawUciMessage {
                        direction: UciMessageDirection::ToEngine,
                        message: trimmed.to_string(),
                    })
                    .await;
                if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
                    tracing::error!(error = %e, "failed writing to engine stdin");
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!(error = %e, "failed flushing engine stdin");
                    break;
                }
            }
        });

        let _ = stdin_tx.send("isready\n".to_string()).await;

        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                let cmd_str = render_command(cmd);
                let quit = cmd_str.trim() == "quit";
                if stdin_tx.send(cmd_str).await.is_err() {
                    break;
                }
                if quit {
                    break;
                }
            }
        });

        Ok(Self {
            child,
            command_tx,
            event_rx,
        })
    }

    pub async fn send_command(&self, cmd: EngineCommand) -> Result<(), String> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| format!("engine command channel closed: {e}"))
    }

    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Escalate to SIGKILL. Called by the pool after `2 * time_limit` has
    /// elapsed without a `bestmove` (spec §4.1 process-lifecycle policy).
    pub async fn kill(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    pub async fn shutdown(mut self) {
        let _ = self.send_command(EngineCommand::Quit).await;
        let exited = tokio::time::timeout(Duration::from_secs(1), self.child.wait()).await;
        if exited.is_err() {
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
        }
    }
}

async fn write_line(stdin: &mut tokio::process::ChildStdin, line: &str) -> Result<(), String> {
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| format!("failed writing to engine stdin: {e}"))?;
    stdin.flush().await.map_err(|e| format!("failed flushing engine stdin: {e}"))
}

fn render_command(cmd: EngineCommand) -> String {
    match cmd {
        EngineCommand::SetPosition { fen, moves } => {
            let mut s = format!("position fen {fen}");
            if !moves.is_empty() {
                s.push_str(" moves");
                for mv in &moves {
                    s.push(' ');
                    s.push_str(&crate::uci::format_uci_move(*mv));
                }
            }
            s.push('\n');
            s
        }
        EngineCommand::SetOption { name, value } => match value {
            Some(v) => format!("setoption name {name} value {v}\n"),
            None => format!("setoption name {name}\n"),
        },
        EngineCommand::Go(params) => {
            let mut s = "go".to_string();
            if let Some(movetime) = params.movetime {
                s.push_str(&format!(" movetime {movetime}"));
            } else if let Some(depth) = params.depth {
                s.push_str(&format!(" depth {depth}"));
            } else if params.infinite {
                s.push_str(" infinite");
            } else {
                s.push_str(" movetime 1000");
            }
            s.push('\n');
            s
        }
        EngineCommand::Stop => "stop\n".to_string(),
        EngineCommand::Quit => "quit\n".to_string(),
    }
}

/// Accept an explicit path or fall back to common install locations / PATH.
fn resolve_executable(configured: &str) -> Option<PathBuf> {
    let candidates = [
        configured,
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish",
    ];
    for candidate in candidates {
        let path = Path::new(candidate);
        if path.exists() || candidate == "stockfish" {
            return Some(PathBuf::from(candidate));
        }
    }
    None
}
