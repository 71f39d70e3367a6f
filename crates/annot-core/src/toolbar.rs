//! Toolbar/mode controller. Holds selection state only, never annotations.

use annot_model::{Color, StickerValue, Tool};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarCommand {
    SelectTool(Tool),
    SelectColor(Color),
    /// Picks the sticker used by sticker mode and marks it pending.
    SelectSticker(StickerValue),
    Undo,
    Redo,
    ClearPage,
    ClearBook,
}

/// What the editor must do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarEffect {
    None,
    Undo,
    Redo,
    ClearPage,
    ClearBook,
    /// Place this sticker at the configured anchor without waiting for a click.
    AutoPlace(StickerValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toolbar {
    tool: Tool,
    color: Color,
    sticker: StickerValue,
    sticker_pending: bool,
}

impl Toolbar {
    pub fn new(sticker: StickerValue) -> Self {
        Self { tool: Tool::None, color: Color::default(), sticker, sticker_pending: false }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn sticker(&self) -> &StickerValue {
        &self.sticker
    }

    pub fn sticker_pending(&self) -> bool {
        self.sticker_pending
    }

    pub fn apply(&mut self, command: ToolbarCommand) -> ToolbarEffect {
        match command {
            ToolbarCommand::SelectTool(tool) => {
                self.tool = tool;
                self.take_pending()
            }
            ToolbarCommand::SelectColor(color) => {
                self.color = color;
                ToolbarEffect::None
            }
            ToolbarCommand::SelectSticker(value) => {
                self.sticker = value;
                self.sticker_pending = true;
                self.take_pending()
            }
            ToolbarCommand::Undo => ToolbarEffect::Undo,
            ToolbarCommand::Redo => ToolbarEffect::Redo,
            ToolbarCommand::ClearPage => ToolbarEffect::ClearPage,
            ToolbarCommand::ClearBook => ToolbarEffect::ClearBook,
        }
    }

    /// Sticker mode with a pending sticker places it once and drops back to
    /// no tool, so the next click does not place a duplicate.
    fn take_pending(&mut self) -> ToolbarEffect {
        if self.tool != Tool::Sticker || !self.sticker_pending {
            return ToolbarEffect::None;
        }

        self.sticker_pending = false;
        self.tool = Tool::None;
        ToolbarEffect::AutoPlace(self.sticker.clone())
    }

    /// Undoes [`ToolbarEffect::AutoPlace`] when the sticker could not be
    /// placed, leaving sticker mode armed for the next attempt.
    pub fn restore_pending(&mut self) {
        self.tool = Tool::Sticker;
        self.sticker_pending = true;
    }
}

impl Default for Toolbar {
    fn default() -> Self {
        Self::new(StickerValue::default())
    }
}
