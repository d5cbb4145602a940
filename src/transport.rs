use std::{
    io,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
};

use eframe::egui::ColorImage;
use log::{debug, warn};

use crate::playback::PlaybackService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Resume,
    Pause,
    Next,
    Previous,
}

impl TransportCommand {
    pub fn label(self) -> &'static str {
        match self {
            TransportCommand::Resume => "Play",
            TransportCommand::Pause => "Pause",
            TransportCommand::Next => "Next",
            TransportCommand::Previous => "Previous",
        }
    }
}

pub struct TransportOutcome {
    pub command: TransportCommand,
    pub result: Result<(), String>,
    /// Replacement disc image, decoded after a successful skip.
    pub new_disc: Option<ColorImage>,
}

enum TransportJob {
    Run(TransportCommand),
    Shutdown,
}

pub type DiscSource = Box<dyn Fn() -> anyhow::Result<ColorImage> + Send>;

/// Runs playback commands away from the render loop and hands the results
/// back to be picked up on a later frame.
pub struct TransportWorker {
    job_tx: Sender<TransportJob>,
    outcome_rx: Receiver<TransportOutcome>,
}

impl TransportWorker {
    pub fn spawn(service: Arc<dyn PlaybackService>, disc_source: DiscSource) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        thread::Builder::new()
            .name("transport".to_string())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let command = match job {
                        TransportJob::Run(command) => command,
                        TransportJob::Shutdown => break,
                    };

                    let result = match command {
                        TransportCommand::Resume => service.resume(),
                        TransportCommand::Pause => service.pause(),
                        TransportCommand::Next => service.next_track(),
                        TransportCommand::Previous => service.previous_track(),
                    }
                    .map_err(|e| e.to_string());

                    let new_disc = match (&result, command) {
                        (Ok(()), TransportCommand::Next) => match disc_source() {
                            Ok(image) => Some(image),
                            Err(err) => {
                                warn!("Keeping current disc image: {err:#}");
                                None
                            }
                        },
                        _ => None,
                    };

                    let outcome = TransportOutcome {
                        command,
                        result,
                        new_disc,
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { job_tx, outcome_rx })
    }

    pub fn send(&self, command: TransportCommand) {
        debug!("transport command {}", command.label());
        if self.job_tx.send(TransportJob::Run(command)).is_err() {
            warn!("{} ignored: transport worker is gone", command.label());
        }
    }

    pub fn drain(&self) -> Vec<TransportOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.outcome_rx.try_recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }
}

impl Drop for TransportWorker {
    fn drop(&mut self) {
        let _ = self.job_tx.send(TransportJob::Shutdown);
    }
}
