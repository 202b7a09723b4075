use std::time::Instant;

use anyhow::Result;
use ratatui::{backend::Backend, Terminal};

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        log_level = %context.config.logging.level,
        poll_interval_ms = context.config.polling.interval_ms,
        "starting TUI shell"
    );

    let mut session = TerminalSession::new()?;
    run_loop(session.terminal_mut(), event_source, orchestrator)?;

    tracing::info!("TUI shell stopped");
    Ok(())
}

/// Draw, wait for one event, dispatch it; until the orchestrator stops.
pub fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    while orchestrator.state().is_running() {
        terminal.draw(|frame| view::render(frame, orchestrator.state_mut(), Instant::now()))?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::{
        domain::{
            events::{AppEvent, KeyInput, PollPayload},
            shell_state::ShellState,
        },
        ui::event_source::MockEventSource,
    };

    #[derive(Default)]
    struct RecordingOrchestrator {
        state: ShellState,
        handled: Vec<AppEvent>,
    }

    impl ShellOrchestrator for RecordingOrchestrator {
        fn state(&self) -> &ShellState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ShellState {
            &mut self.state
        }

        fn handle_event(&mut self, event: AppEvent) -> Result<()> {
            if event == AppEvent::QuitRequested {
                self.state.stop();
            }
            self.handled.push(event);
            Ok(())
        }
    }

    #[test]
    fn mock_source_produces_quit_event() {
        let mut source = MockEventSource::from(vec![AppEvent::QuitRequested]);
        let event = source.next_event().expect("must read mock event");

        assert_eq!(event, Some(AppEvent::QuitRequested));
    }

    #[test]
    fn loop_dispatches_events_until_stopped() {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).expect("terminal");
        let poll = AppEvent::Polled {
            epoch: 0,
            payload: PollPayload::Chats(vec![]),
        };
        let mut source = MockEventSource::from(vec![
            AppEvent::Tick,
            poll.clone(),
            AppEvent::InputKey(KeyInput::new("j", false)),
            AppEvent::QuitRequested,
            AppEvent::Tick,
        ]);
        let mut orchestrator = RecordingOrchestrator::default();

        run_loop(&mut terminal, &mut source, &mut orchestrator).expect("loop");

        assert_eq!(
            orchestrator.handled,
            vec![
                AppEvent::Tick,
                poll,
                AppEvent::InputKey(KeyInput::new("j", false)),
                AppEvent::QuitRequested,
            ]
        );
    }
}
