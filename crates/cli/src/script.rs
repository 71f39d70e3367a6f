use annot_core::ToolbarCommand;
use annot_model::{Color, ScreenPoint, StickerValue, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use viewer_core::{DisplayMode, FlipbookViewer, NavOutcome};

/// One recorded UI event. Pointer coordinates are container-space pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SelectTool { tool: Tool },
    SelectColor { color: Color },
    SelectSticker { value: StickerValue },
    Undo,
    Redo,
    ClearPage,
    ClearBook,
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    PointerLeave,
    Next,
    Previous,
    GoTo { page: u32 },
    Zoom { value: f32 },
    Mode { mode: ScriptMode },
    /// Advances the replay clock, letting flip animations finish.
    Wait { ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptMode {
    Single,
    Spread,
}

impl From<ScriptMode> for DisplayMode {
    fn from(value: ScriptMode) -> Self {
        match value {
            ScriptMode::Single => Self::Single,
            ScriptMode::Spread => Self::Spread,
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).context("failed to parse replay script")
}

#[derive(Debug, Default)]
pub struct ReplayReport {
    pub steps: usize,
    pub ignored_navigation: usize,
}

/// Feeds `steps` through the viewer on a virtual clock that starts at
/// `start`; the viewer is ticked after every step.
pub fn replay(viewer: &mut FlipbookViewer, steps: &[Step], start: Instant) -> ReplayReport {
    let mut clock = start;
    let mut report = ReplayReport::default();

    for step in steps {
        let outcome = match step {
            Step::SelectTool { tool } => command(viewer, ToolbarCommand::SelectTool(*tool)),
            Step::SelectColor { color } => command(viewer, ToolbarCommand::SelectColor(*color)),
            Step::SelectSticker { value } => {
                command(viewer, ToolbarCommand::SelectSticker(value.clone()))
            }
            Step::Undo => command(viewer, ToolbarCommand::Undo),
            Step::Redo => command(viewer, ToolbarCommand::Redo),
            Step::ClearPage => command(viewer, ToolbarCommand::ClearPage),
            Step::ClearBook => command(viewer, ToolbarCommand::ClearBook),
            Step::PointerDown { x, y } => {
                viewer.pointer_down(ScreenPoint::new(*x, *y));
                None
            }
            Step::PointerMove { x, y } => {
                viewer.pointer_move(ScreenPoint::new(*x, *y));
                None
            }
            Step::PointerUp { x, y } => {
                viewer.pointer_up(ScreenPoint::new(*x, *y));
                None
            }
            Step::PointerLeave => {
                viewer.pointer_leave();
                None
            }
            Step::Next => Some(viewer.next(clock)),
            Step::Previous => Some(viewer.previous(clock)),
            Step::GoTo { page } => Some(viewer.go_to(*page, clock)),
            Step::Zoom { value } => {
                viewer.set_zoom(*value);
                None
            }
            Step::Mode { mode } => {
                viewer.set_mode((*mode).into());
                None
            }
            Step::Wait { ms } => {
                clock += Duration::from_millis(*ms);
                None
            }
        };

        if outcome == Some(NavOutcome::Ignored) {
            report.ignored_navigation += 1;
        }
        viewer.tick(clock);
        report.steps += 1;
    }

    report
}

fn command(viewer: &mut FlipbookViewer, command: ToolbarCommand) -> Option<NavOutcome> {
    viewer.execute(command);
    None
}
