use std::path::PathBuf;

use clap::Parser;
use prism_imgui::{Charset, StyleKind};

#[derive(Debug, Clone, Parser)]
#[command(about = "Run a GUI system on the headless platform", long_about = None)]
pub struct Args {
    /// JSON settings for the GUI module
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 3)]
    pub frames: u32,

    /// Extra font file to load next to the builtin one
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Pixel size for `--font`
    #[arg(long, default_value_t = 18.0)]
    pub font_size: f32,

    /// Glyph set for `--font`
    #[arg(long, default_value = "default")]
    pub charset: Charset,

    /// Override the style from the settings file
    #[arg(long)]
    pub style: Option<StyleKind>,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    pub size: (u32, u32),

    /// Print the last frame's draw data as JSON
    #[arg(long)]
    pub dump_frame: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text}"))?;
    let width = width.trim().parse().map_err(|_| format!("bad width in {text}"))?;
    let height = height.trim().parse().map_err(|_| format!("bad height in {text}"))?;
    Ok((width, height))
}
