use std::io::{BufRead, ErrorKind, Write};
use std::path::Path;

use anyhow::Result;
use ecolens_contracts::session::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use ecolens_engine::{ImageCandidate, RequestState, SubmissionController};

use crate::render::{render_state, OutputFormat};

pub fn run_session<R: BufRead, W: Write>(
    controller: &mut SubmissionController,
    format: OutputFormat,
    mut input: R,
    out: &mut W,
) -> Result<()> {
    writeln!(
        out,
        "EcoLens session started ({} transport). Type /help for commands.",
        controller.transport_name()
    )?;

    let mut line = String::new();
    loop {
        if controller.poll() {
            writeln!(out, "{}", render_state(&controller.state(), format)?)?;
        }
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_command(line.trim_end_matches(['\n', '\r'])) {
            SessionCommand::Noop => {}
            SessionCommand::Help => {
                writeln!(out, "Commands: {}", SESSION_HELP_COMMANDS.join(" "))?;
            }
            SessionCommand::Select { path } => select(controller, &path, out)?,
            SessionCommand::Submit => {
                let was_ready = matches!(controller.state(), RequestState::Ready);
                controller.submit();
                if was_ready {
                    let name = controller
                        .selected_image()
                        .map(|image| image.file_name().to_string())
                        .unwrap_or_default();
                    writeln!(out, "Analyzing {name}...")?;
                } else {
                    match controller.state() {
                        RequestState::Submitting => {
                            writeln!(out, "A submission is already in flight.")?
                        }
                        RequestState::Completed(_) => {
                            writeln!(out, "Already analyzed; /select another image or /reset.")?
                        }
                        RequestState::Idle | RequestState::Ready => {
                            writeln!(out, "Nothing to submit; /select an image first.")?
                        }
                    }
                }
            }
            SessionCommand::Status => {
                if let Some(image) = controller.selected_image() {
                    writeln!(
                        out,
                        "Selected: {} ({}), preview {}",
                        image.file_name(),
                        image.media_type(),
                        image.preview_path().display()
                    )?;
                }
                writeln!(out, "{}", render_state(&controller.state(), format)?)?;
            }
            SessionCommand::Wait => {
                let state = controller.wait();
                writeln!(out, "{}", render_state(&state, format)?)?;
            }
            SessionCommand::Reset => {
                controller.reset();
                writeln!(out, "Selection cleared.")?;
            }
            SessionCommand::Quit => break,
            SessionCommand::Unknown { command, .. } => {
                writeln!(out, "Unknown command /{command}. Type /help for commands.")?;
            }
        }
    }

    controller.reset();
    Ok(())
}

fn select<W: Write>(controller: &mut SubmissionController, path: &str, out: &mut W) -> Result<()> {
    if path.is_empty() {
        writeln!(out, "/select requires a path")?;
        return Ok(());
    }
    let candidate = match ImageCandidate::from_path(Path::new(path)) {
        Ok(candidate) => candidate,
        Err(err) => {
            writeln!(out, "Could not read {path}: {err:#}")?;
            return Ok(());
        }
    };
    let media_type = candidate.media_type.clone();
    if !controller.select_image(candidate) {
        writeln!(out, "Ignored {path}: {media_type} is not an image.")?;
        return Ok(());
    }
    if let Some(preview) = controller.preview_path() {
        writeln!(out, "Selected {path} (preview {})", preview.display())?;
    }
    Ok(())
}
