//! Frame declaration and draw list generation.
//!
//! Windows are laid out top to bottom in declaration order. Each window gets
//! one draw command clipped to its rectangle; shapes sample the atlas' white
//! texel so everything shares the atlas texture.

use prism_api::{DrawCmd, DrawData, DrawVert};

use super::atlas::AtlasFont;
use super::{Context, Io, MouseCursor, Style};

/// Line height used when no font is available.
const FALLBACK_LINE_HEIGHT: f32 = 13.0;
const MIN_WINDOW_WIDTH: f32 = 64.0;

/// Contents of one window, collected before layout.
#[derive(Debug, Default)]
pub struct WindowUi {
    lines: Vec<String>,
}

impl WindowUi {
    /// Add text; embedded newlines start new lines.
    pub fn text(&mut self, text: impl AsRef<str>) {
        self.lines
            .extend(text.as_ref().split('\n').map(str::to_string));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

struct DrawList {
    data: DrawData,
    white_uv: [f32; 2],
}

impl DrawList {
    fn begin_command(&mut self, cmd: DrawCmd) {
        self.data.commands.push(cmd);
    }

    fn quad(&mut self, min: [f32; 2], max: [f32; 2], uv_min: [f32; 2], uv_max: [f32; 2], col: u32) {
        let base = self.data.vertices.len() as u32;
        self.data.vertices.extend([
            DrawVert { pos: min, uv: uv_min, col },
            DrawVert { pos: [max[0], min[1]], uv: [uv_max[0], uv_min[1]], col },
            DrawVert { pos: max, uv: uv_max, col },
            DrawVert { pos: [min[0], max[1]], uv: [uv_min[0], uv_max[1]], col },
        ]);
        self.data
            .indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        if let Some(cmd) = self.data.commands.last_mut() {
            cmd.elem_count += 6;
        }
    }

    fn rect(&mut self, min: [f32; 2], max: [f32; 2], col: u32) {
        let white = self.white_uv;
        self.quad(min, max, white, white, col);
    }

    fn text(&mut self, font: Option<&AtlasFont>, pos: [f32; 2], text: &str, col: u32) {
        let Some(font) = font else {
            return;
        };
        let mut x = pos[0];
        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                continue;
            };
            if glyph.x1 > glyph.x0 && glyph.y1 > glyph.y0 {
                self.quad(
                    [x + glyph.x0, pos[1] + glyph.y0],
                    [x + glyph.x1, pos[1] + glyph.y1],
                    [glyph.u0, glyph.v0],
                    [glyph.u1, glyph.v1],
                    col,
                );
            }
            x += glyph.advance;
        }
    }
}

/// One frame being declared against a context.
pub struct Frame<'ctx> {
    ctx: &'ctx mut Context,
    list: DrawList,
    cursor_y: f32,
    mouse_cursor: Option<MouseCursor>,
}

impl<'ctx> Frame<'ctx> {
    pub(super) fn new(ctx: &'ctx mut Context) -> Self {
        let list = DrawList {
            data: DrawData::default(),
            white_uv: ctx.fonts.white_uv(),
        };
        let cursor_y = ctx.style.window_spacing;
        Self {
            ctx,
            list,
            cursor_y,
            mouse_cursor: Some(MouseCursor::Arrow),
        }
    }

    pub fn io(&self) -> &Io {
        &self.ctx.io
    }

    pub fn style(&self) -> &Style {
        &self.ctx.style
    }

    /// Ask for a pointer shape for this frame; `None` hides the pointer.
    pub fn set_mouse_cursor(&mut self, cursor: Option<MouseCursor>) {
        self.mouse_cursor = cursor;
    }

    pub fn mouse_cursor(&self) -> Option<MouseCursor> {
        self.mouse_cursor
    }

    /// Declare a window titled `title` with the contents `build` adds.
    pub fn window(&mut self, title: &str, build: impl FnOnce(&mut WindowUi)) {
        let mut ui = WindowUi::default();
        build(&mut ui);

        let style = self.ctx.style;
        let font = self.ctx.fonts.default_font();
        let line_height = font.map_or(FALLBACK_LINE_HEIGHT, AtlasFont::line_height);
        let measure = |text: &str| font.map_or(0.0, |font| font.text_width(text));

        let [pad_x, pad_y] = style.window_padding;
        let spacing_y = style.item_spacing[1];

        let content_width = ui
            .lines
            .iter()
            .map(|line| measure(line.as_str()))
            .fold(measure(title), f32::max);
        let width = (content_width + 2.0 * pad_x).max(MIN_WINDOW_WIDTH);
        let title_height = line_height + 2.0 * spacing_y;
        let body_height = if ui.lines.is_empty() {
            0.0
        } else {
            ui.lines.len() as f32 * (line_height + spacing_y) - spacing_y + 2.0 * pad_y
        };

        let x = style.window_spacing;
        let y = self.cursor_y;
        let max = [x + width, y + title_height + body_height];
        self.cursor_y = max[1] + style.window_spacing;

        self.list.begin_command(DrawCmd {
            texture: self.ctx.fonts.tex_id(),
            clip_rect: [x, y, max[0], max[1]],
            index_offset: self.list.data.indices.len() as u32,
            elem_count: 0,
        });

        let border = style.border_size;
        self.list.rect([x - border, y - border], [max[0] + border, max[1] + border], style.colors.border);
        self.list.rect([x, y], max, style.colors.window_bg);
        self.list.rect([x, y], [max[0], y + title_height], style.colors.title_bg);
        self.list.text(font, [x + pad_x, y + spacing_y], title, style.colors.text);

        let mut line_y = y + title_height + pad_y;
        for line in &ui.lines {
            self.list.text(font, [x + pad_x, line_y], line, style.colors.text);
            line_y += line_height + spacing_y;
        }
    }

    /// Finish the frame and return its draw data.
    pub fn render(self) -> &'ctx DrawData {
        let Frame {
            ctx,
            list,
            mouse_cursor,
            ..
        } = self;

        let mut data = list.data;
        data.display_size = ctx.io.display_size;
        ctx.draw_data = data;
        ctx.mouse_cursor = mouse_cursor;
        ctx.frame_count += 1;

        let ctx: &'ctx Context = ctx;
        &ctx.draw_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Charset;
    use prism_api::GpuHandle;

    fn context_with_font() -> Context {
        let mut ctx = Context::new(Style::dark());
        ctx.fonts_mut().add_default(16.0, Charset::Default);
        ctx.fonts_mut().build().unwrap();
        ctx.fonts_mut().set_tex_id(GpuHandle(3));
        ctx.io_mut().display_size = [800.0, 600.0];
        ctx
    }

    #[test]
    fn test_empty_frame_renders_nothing() {
        let mut ctx = Context::new(Style::dark());
        let data = ctx.new_frame().render();
        assert!(data.is_empty());
        assert_eq!(ctx.frame_count(), 1);
        assert_eq!(ctx.mouse_cursor(), Some(MouseCursor::Arrow));
    }

    #[test]
    fn test_window_emits_one_command_with_glyphs() {
        let mut ctx = context_with_font();
        let mut frame = ctx.new_frame();
        frame.window("Hi", |ui| ui.text("ab"));
        let data = frame.render();

        assert_eq!(data.commands.len(), 1);
        let cmd = &data.commands[0];
        assert_eq!(cmd.texture, Some(GpuHandle(3)));
        // border + background + title bar + "Hi" + "ab"
        assert_eq!(cmd.elem_count, 6 * 7);
        assert_eq!(data.total_idx_count(), 42);
        assert_eq!(data.total_vtx_count(), 28);
        assert_eq!(data.display_size, [800.0, 600.0]);
    }

    #[test]
    fn test_windows_stack_vertically() {
        let mut ctx = context_with_font();
        let mut frame = ctx.new_frame();
        frame.window("One", |_| {});
        frame.window("Two", |ui| ui.text("first\nsecond"));
        let data = frame.render();

        assert_eq!(data.commands.len(), 2);
        let first = data.commands[0].clip_rect;
        let second = data.commands[1].clip_rect;
        assert!(second[1] > first[3]);
        assert_eq!(data.commands[1].index_offset, data.commands[0].elem_count);
    }

    #[test]
    fn test_without_font_only_shapes_are_drawn() {
        let mut ctx = Context::new(Style::light());
        let mut frame = ctx.new_frame();
        frame.window("Title", |ui| ui.text("body"));
        let data = frame.render();
        assert_eq!(data.commands[0].elem_count, 6 * 3);
        assert_eq!(data.commands[0].texture, None);
    }

    #[test]
    fn test_requested_cursor_is_kept() {
        let mut ctx = Context::new(Style::dark());
        let mut frame = ctx.new_frame();
        frame.set_mouse_cursor(Some(MouseCursor::Hand));
        frame.render();
        assert_eq!(ctx.mouse_cursor(), Some(MouseCursor::Hand));

        let mut frame = ctx.new_frame();
        frame.set_mouse_cursor(None);
        frame.render();
        assert_eq!(ctx.mouse_cursor(), None);
    }

    #[test]
    fn test_window_ui_splits_lines() {
        let mut ui = WindowUi::default();
        ui.text("a\nb");
        ui.text("c");
        assert_eq!(ui.lines(), &["a", "b", "c"]);
    }
}
